use criterion::{criterion_group, criterion_main, Criterion};
use pagemorph::padding::{PaddingGenerator, RandomSource};
use pagemorph::{match_sizes, ContentCategory};

fn bench_match_sizes(c: &mut Criterion) {
    let original: Vec<u64> = (0..200).map(|i| (i * 7919) % 50_000).collect();
    let targets: Vec<u64> = (0..260).map(|i| (i * 104_729) % 60_000 + 10_000).collect();
    c.bench_function("match_sizes 200 objects", |b| {
        b.iter(|| match_sizes(&original, &targets))
    });
}

fn bench_binary_padding(c: &mut Criterion) {
    let padding = PaddingGenerator::new(RandomSource::Seeded(1));
    let content = vec![0u8; 16 * 1024];
    c.bench_function("pad png 16KiB -> 256KiB", |b| {
        b.iter(|| padding.pad(&ContentCategory::Png, &content, 256 * 1024, 0))
    });
}

criterion_group!(benches, bench_match_sizes, bench_binary_padding);
criterion_main!(benches);
