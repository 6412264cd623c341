use canonical::{canonicalize, CanonicalizeConfig};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

const ESSAY: &str = "Photosynthesis converts light energy, usually from the Sun, into chemical \
energy stored in glucose. Chlorophyll absorbs red and blue wavelengths; green is reflected. ";

fn bench_canonicalize(c: &mut Criterion) {
    let config = CanonicalizeConfig::default();
    let mut group = c.benchmark_group("canonicalize");

    for repeats in [1usize, 16, 128, 1024] {
        let text = ESSAY.repeat(repeats);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_function(format!("bytes_{}", text.len()), |b| {
            b.iter(|| {
                canonicalize(black_box("sub-1"), black_box(&text), black_box(&config))
                    .expect("canonicalize")
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_canonicalize);
criterion_main!(benches);
