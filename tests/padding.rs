use pagemorph::padding::{PaddingGenerator, RandomSource};
use pagemorph::{ContentCategory, MorphError};
use proptest::prelude::*;

fn category() -> impl Strategy<Value = ContentCategory> {
    prop_oneof![
        Just(ContentCategory::Html),
        Just(ContentCategory::Css),
        Just(ContentCategory::Js),
        Just(ContentCategory::Svg),
        Just(ContentCategory::Png),
        Just(ContentCategory::Jpeg),
        Just(ContentCategory::Gif),
        Just(ContentCategory::Bmp),
        Just(ContentCategory::Unknown("woff2".into())),
    ]
}

#[test]
fn css_scenario_pads_to_exact_size() {
    let g = PaddingGenerator::new(RandomSource::Entropy);
    let out = g.pad(&ContentCategory::Css, b"body{}\n", 20, 0).unwrap();
    assert_eq!(out.len(), 20);
    assert_eq!(&out[..9], b"body{}\n/*");
    assert_eq!(&out[18..], b"*/");
}

#[test]
fn same_inputs_give_same_size_but_fresh_bytes() {
    let g = PaddingGenerator::new(RandomSource::Entropy);
    let a = g.pad(&ContentCategory::Png, b"\x89PNG\r\n", 2048, 0).unwrap();
    let b = g.pad(&ContentCategory::Png, b"\x89PNG\r\n", 2048, 0).unwrap();
    assert_eq!(a.len(), b.len());
    assert_ne!(a, b);
}

#[test]
fn seeded_generator_is_reproducible() {
    let a = PaddingGenerator::new(RandomSource::Seeded(17));
    let b = PaddingGenerator::new(RandomSource::Seeded(17));
    assert_eq!(
        a.pad(&ContentCategory::Css, b"a{}", 64, 3).unwrap(),
        b.pad(&ContentCategory::Css, b"a{}", 64, 3).unwrap()
    );
}

#[test]
fn filler_bytes_do_not_compress_to_a_pattern() {
    let g = PaddingGenerator::new(RandomSource::Seeded(5));
    let filler = g.fabricate(4096, 0);
    let mut counts = [0usize; 256];
    for &b in &filler {
        counts[b as usize] += 1;
    }
    // 4096 uniform bytes average 16 per value.
    assert!(counts.iter().all(|&c| c < 64));
    assert!(counts.iter().filter(|&&c| c > 0).count() > 200);
}

proptest! {
    #[test]
    fn output_has_exact_target_length(
        cat in category(),
        content in prop::collection::vec(any::<u8>(), 0..256),
        extra in 0u64..2048,
    ) {
        let g = PaddingGenerator::new(RandomSource::Seeded(1));
        let target = content.len() as u64 + g.min_overhead(&cat) + extra;
        let out = g.pad(&cat, &content, target, 0).unwrap();
        prop_assert_eq!(out.len() as u64, target);
        prop_assert_eq!(&out[..content.len()], &content[..]);
    }

    #[test]
    fn too_small_targets_are_rejected(
        cat in category(),
        content in prop::collection::vec(any::<u8>(), 1..256),
        shortfall in 1u64..16,
    ) {
        let g = PaddingGenerator::new(RandomSource::Seeded(1));
        let current = content.len() as u64;
        let floor = current + g.min_overhead(&cat);
        let target = floor.saturating_sub(shortfall);
        prop_assume!(target != current);
        let result = g.pad(&cat, &content, target, 0);
        let is_too_small = matches!(result, Err(MorphError::PaddingTooSmall { .. }));
        prop_assert!(is_too_small);
    }
}
