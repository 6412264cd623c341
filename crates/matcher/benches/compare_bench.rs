use canonical::{canonicalize, CanonicalizeConfig};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use fingerprint::{fingerprint_document, FingerprintConfig, FingerprintSet};
use matcher::{compare, Comparator, MatchConfig};

fn fingerprints(seed: usize, words: usize) -> FingerprintSet {
    let text = (0..words)
        .map(|i| format!("term{}", (i * 7919 + seed) % 2053))
        .collect::<Vec<_>>()
        .join(" ");
    let doc = canonicalize("bench", &text, &CanonicalizeConfig::default()).expect("canonicalize");
    fingerprint_document(&doc, &FingerprintConfig::default()).expect("fingerprint")
}

fn bench_compare(c: &mut Criterion) {
    let target = fingerprints(0, 3_000);
    let candidates: Vec<FingerprintSet> = (0..50).map(|i| fingerprints(i * 13, 3_000)).collect();
    let refs: Vec<&FingerprintSet> = candidates.iter().collect();

    let mut group = c.benchmark_group("compare");
    group.bench_function("pair_3000_words", |b| {
        b.iter(|| compare(black_box(&target), black_box(&candidates[1])).expect("compare"))
    });

    group.throughput(Throughput::Elements(refs.len() as u64));
    for parallel in [false, true] {
        let comparator =
            Comparator::new(MatchConfig::default().with_parallel(parallel)).expect("config");
        group.bench_function(format!("batch_50_parallel_{parallel}"), |b| {
            b.iter(|| comparator.compare_all(black_box(&target), black_box(&refs)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compare);
criterion_main!(benches);
