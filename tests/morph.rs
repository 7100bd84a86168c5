use pagemorph::strategy::{DeterministicMultiples, ExplicitTarget, TargetProfile};
use pagemorph::{AppConfig, MorphError, Morpher, RandomSource};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn put(dir: &Path, rel: &str, content: &[u8]) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A small site: index.html with one image and one stylesheet.
fn site() -> TempDir {
    let dir = tempdir().unwrap();
    put(dir.path(), "img/logo.png", &[0x89; 100]);
    put(dir.path(), "css/site.css", &vec![b'a'; 250]);
    put(
        dir.path(),
        "index.html",
        br#"<html><head><link rel="stylesheet" href="css/site.css"></head>
<body><img src="img/logo.png"></body></html>"#,
    );
    dir
}

fn morpher(cfg: impl FnOnce(&mut AppConfig)) -> Morpher {
    let mut config = AppConfig::default();
    config.morph.seed = Some(1234);
    cfg(&mut config);
    Morpher::new(config)
}

fn size(path: &Path) -> u64 {
    fs::metadata(path).unwrap().len()
}

#[test]
fn explicit_target_writes_every_object_at_target_size() {
    let src = site();
    let out = tempdir().unwrap();
    let mut target = ExplicitTarget::new(TargetProfile {
        html_size: 2000,
        object_sizes: vec![300, 100, 4096, 512],
    });

    let report = morpher(|_| {})
        .morph_file(&src.path().join("index.html"), &mut target, out.path())
        .unwrap();

    assert_eq!(size(&out.path().join("index.html")), 2000);
    assert_eq!(size(&out.path().join("img/logo.png")), 100);
    assert_eq!(size(&out.path().join("css/site.css")), 300);
    assert_eq!(size(&out.path().join("random-objects/rnd-0.png")), 512);
    assert_eq!(size(&out.path().join("random-objects/rnd-1.png")), 4096);

    assert_eq!(report.attempts, 1);
    assert_eq!(report.strategy, "target");
    assert_eq!(report.html_size, size(&src.path().join("index.html")));
    assert_eq!(report.fillers.len(), 2);

    let html = fs::read_to_string(out.path().join("index.html")).unwrap();
    assert!(html.contains(r#"<img src="random-objects/rnd-1.png" style="visibility:hidden"></body>"#));
    let css = fs::read(out.path().join("css/site.css")).unwrap();
    assert!(css.starts_with(&vec![b'a'; 250]));
    assert!(css.ends_with(b"*/"));
}

#[test]
fn original_sources_are_left_untouched() {
    let src = site();
    let out = tempdir().unwrap();
    let mut target = ExplicitTarget::new(TargetProfile {
        html_size: 1000,
        object_sizes: vec![300, 300],
    });
    morpher(|_| {})
        .morph_file(&src.path().join("index.html"), &mut target, out.path())
        .unwrap();
    assert_eq!(size(&src.path().join("img/logo.png")), 100);
    assert_eq!(size(&src.path().join("css/site.css")), 250);
}

#[test]
fn template_page_provides_the_target() {
    let src = site();
    let tpl = tempdir().unwrap();
    put(tpl.path(), "a.png", &[1; 400]);
    put(tpl.path(), "b.png", &[1; 900]);
    put(tpl.path(), "c.png", &[1; 50]);
    let mut body = String::from(r#"<html><body><img src="a.png"><img src="b.png"><img src="c.png">"#);
    body.push_str(&"x".repeat(1500));
    body.push_str("</body></html>");
    put(tpl.path(), "page.html", body.as_bytes());

    let m = morpher(|_| {});
    let template = m.load(&tpl.path().join("page.html")).unwrap();
    let mut target = ExplicitTarget::from_page(&template);
    let out = tempdir().unwrap();
    let report = m
        .morph_file(&src.path().join("index.html"), &mut target, out.path())
        .unwrap();

    assert_eq!(report.target_html_size, template.html_size());
    assert_eq!(size(&out.path().join("index.html")), template.html_size());
    assert_eq!(size(&out.path().join("img/logo.png")), 400);
    assert_eq!(size(&out.path().join("css/site.css")), 900);
    assert_eq!(size(&out.path().join("random-objects/rnd-0.png")), 50);
}

#[test]
fn infeasible_explicit_target_is_fatal() {
    let src = site();
    let out = tempdir().unwrap();
    let mut target = ExplicitTarget::new(TargetProfile {
        html_size: 5000,
        object_sizes: vec![200, 200],
    });
    let err = morpher(|_| {})
        .morph_file(&src.path().join("index.html"), &mut target, out.path())
        .unwrap_err();
    assert!(matches!(err, MorphError::InfeasibleTarget { .. }));
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn missing_body_close_writes_nothing() {
    let dir = tempdir().unwrap();
    put(dir.path(), "a.png", &[0; 10]);
    put(dir.path(), "broken.html", br#"<html><img src="a.png"></html>"#);
    let out = tempdir().unwrap();
    let mut target = ExplicitTarget::new(TargetProfile {
        html_size: 1000,
        object_sizes: vec![10, 20],
    });
    let err = morpher(|_| {})
        .morph_file(&dir.path().join("broken.html"), &mut target, out.path())
        .unwrap_err();
    assert!(matches!(err, MorphError::MalformedDocument { .. }));
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn missing_object_is_reported_with_its_path() {
    let dir = tempdir().unwrap();
    put(dir.path(), "index.html", br#"<body><img src="gone.png"></body>"#);
    let out = tempdir().unwrap();
    let mut target = ExplicitTarget::new(TargetProfile {
        html_size: 1000,
        object_sizes: vec![10],
    });
    let err = morpher(|_| {})
        .morph_file(&dir.path().join("index.html"), &mut target, out.path())
        .unwrap_err();
    match err {
        MorphError::Resolution { reference, path, .. } => {
            assert_eq!(reference, "gone.png");
            assert!(path.ends_with("gone.png"));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn structured_formats_abort_the_morph() {
    let dir = tempdir().unwrap();
    put(dir.path(), "doc.pdf", b"%PDF-1.4");
    put(dir.path(), "index.html", br#"<body><img src="doc.pdf"></body>"#);
    let out = tempdir().unwrap();
    let mut target = ExplicitTarget::new(TargetProfile {
        html_size: 1000,
        object_sizes: vec![100],
    });
    let err = morpher(|_| {})
        .morph_file(&dir.path().join("index.html"), &mut target, out.path())
        .unwrap_err();
    assert!(matches!(err, MorphError::UnsupportedCategory { .. }));
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn references_can_be_annotated() {
    let src = site();
    let out = tempdir().unwrap();
    let mut target = ExplicitTarget::new(TargetProfile {
        html_size: 1000,
        object_sizes: vec![300, 120],
    });
    morpher(|c| c.morph.annotate_references = true)
        .morph_file(&src.path().join("index.html"), &mut target, out.path())
        .unwrap();
    let html = fs::read_to_string(out.path().join("index.html")).unwrap();
    assert!(html.contains(r#"src="img/logo.png?type=png&size=120""#));
    assert!(html.contains(r#"href="css/site.css?type=css&size=300""#));
    assert_eq!(html.len(), 1000);
}

#[test]
fn deterministic_rounds_html_and_objects() {
    let dir = tempdir().unwrap();
    put(dir.path(), "a.gif", &[7; 1500]);
    let mut html = String::from(r#"<html><body><img src="a.gif">"#);
    let tail = "</body></html>";
    html.push_str(&"y".repeat(950 - html.len() - tail.len()));
    html.push_str(tail);
    assert_eq!(html.len(), 950);
    put(dir.path(), "index.html", html.as_bytes());

    let out = tempdir().unwrap();
    let mut strategy = DeterministicMultiples::new(1000, 1, 3000, RandomSource::Seeded(2)).unwrap();
    let report = morpher(|_| {})
        .morph_file(&dir.path().join("index.html"), &mut strategy, out.path())
        .unwrap();
    assert_eq!(report.target_html_size, 1000);
    assert_eq!(size(&out.path().join("index.html")), 1000);
    assert_eq!(size(&out.path().join("a.gif")), 2000);
    assert!(report.fillers.is_empty());
}

#[test]
fn deterministic_escalates_html_once_when_fillers_overflow() {
    let dir = tempdir().unwrap();
    put(dir.path(), "index.html", b"<html><body></body></html>");
    let out = tempdir().unwrap();
    // 20 filler tags take well over 1000 bytes but under 2000.
    let mut strategy = DeterministicMultiples::new(1000, 20, 1000, RandomSource::Seeded(2)).unwrap();
    let report = morpher(|_| {})
        .morph_file(&dir.path().join("index.html"), &mut strategy, out.path())
        .unwrap();
    assert_eq!(report.target_html_size, 2000);
    assert_eq!(size(&out.path().join("index.html")), 2000);
    assert_eq!(report.fillers.len(), 20);
    for filler in &report.fillers {
        assert_eq!(size(&out.path().join(&filler.output)), 1000);
    }
}

#[test]
fn deterministic_escalation_happens_only_once() {
    let dir = tempdir().unwrap();
    put(dir.path(), "index.html", b"<html><body></body></html>");
    let out = tempdir().unwrap();
    let mut strategy = DeterministicMultiples::new(1000, 40, 1000, RandomSource::Seeded(2)).unwrap();
    let err = morpher(|_| {})
        .morph_file(&dir.path().join("index.html"), &mut strategy, out.path())
        .unwrap_err();
    assert!(matches!(err, MorphError::HtmlOverflow { target: 2000, .. }));
}

#[test]
fn sequential_and_parallel_morphs_agree_on_sizes() {
    let src = site();
    let profile = TargetProfile {
        html_size: 1500,
        object_sizes: vec![700, 300, 900],
    };
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let ra = morpher(|c| c.morph.parallel = true)
        .morph_file(&src.path().join("index.html"), &mut ExplicitTarget::new(profile.clone()), a.path())
        .unwrap();
    let rb = morpher(|c| c.morph.parallel = false)
        .morph_file(&src.path().join("index.html"), &mut ExplicitTarget::new(profile), b.path())
        .unwrap();
    assert_eq!(ra.objects, rb.objects);
    assert_eq!(ra.fillers, rb.fillers);
}

#[test]
fn two_spellings_of_one_object_are_padded_once() {
    let dir = tempdir().unwrap();
    put(dir.path(), "a.png", &[7; 50]);
    put(
        dir.path(),
        "index.html",
        br#"<html><body><img src="a.png"><img src="./a.png"><img src="/a.png"></body></html>"#,
    );
    let out = tempdir().unwrap();
    let mut target = ExplicitTarget::new(TargetProfile {
        html_size: 1000,
        object_sizes: vec![100, 300],
    });
    let report = morpher(|c| c.morph.parallel = false)
        .morph_file(&dir.path().join("index.html"), &mut target, out.path())
        .unwrap();

    assert_eq!(report.objects.len(), 1);
    assert_eq!(report.objects[0].target_size, 100);
    assert_eq!(size(&out.path().join("a.png")), 100);
    assert_eq!(report.fillers.len(), 1);
    assert_eq!(size(&out.path().join("random-objects/rnd-0.png")), 300);
}

#[test]
fn remorphing_keeps_fillers_apart_from_existing_objects() {
    let dir = tempdir().unwrap();
    put(dir.path(), "random-objects/rnd-0.png", &[1; 80]);
    put(
        dir.path(),
        "index.html",
        br#"<html><body><img src="random-objects/rnd-0.png?type=png&amp;size=80"></body></html>"#,
    );
    let out = tempdir().unwrap();
    let mut target = ExplicitTarget::new(TargetProfile {
        html_size: 1000,
        object_sizes: vec![100, 700],
    });
    let report = morpher(|_| {})
        .morph_file(&dir.path().join("index.html"), &mut target, out.path())
        .unwrap();

    assert_eq!(report.objects[0].output, Path::new("random-objects/rnd-0.png"));
    assert_eq!(report.fillers[0].output, Path::new("random-objects/rnd-1.png"));
    assert_eq!(size(&out.path().join("random-objects/rnd-0.png")), 100);
    assert_eq!(size(&out.path().join("random-objects/rnd-1.png")), 700);
    let html = fs::read_to_string(out.path().join("index.html")).unwrap();
    assert!(html.contains(r#"<img src="random-objects/rnd-1.png" style="visibility:hidden">"#));
}
