//! Performance benchmarks for item index codecs and set algebra
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use itemidx::index::codec::{decode_block, encode_block};
use itemidx::index::{FactoryConfig, IndexType, ItemIndex, ItemIndexFactory};

const CODECS: [IndexType; 4] = [
    IndexType::Native,
    IndexType::BoundedCompactUintArray,
    IndexType::RegLine,
    IndexType::FoR,
];

/// Ascending ids with irregular gaps, deterministic
fn postings(len: u32, seed: u32) -> Vec<u32> {
    let mut value = seed;
    (0..len)
        .map(|i| {
            value += 1 + (i.wrapping_mul(2_654_435_761) ^ seed) % 23;
            value
        })
        .collect()
}

fn bench_encode(c: &mut Criterion) {
    let values = postings(100_000, 7);
    let mut group = c.benchmark_group("encode");
    for ty in CODECS {
        group.bench_with_input(BenchmarkId::from_parameter(ty), &values, |b, values| {
            b.iter(|| ItemIndex::encode(black_box(values), ty))
        });
    }
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let values = postings(100_000, 7);
    let mut group = c.benchmark_group("scan");
    for ty in CODECS {
        let index = ItemIndex::encode(&values, ty).expect("encode");
        group.bench_with_input(BenchmarkId::from_parameter(ty), &index, |b, index| {
            b.iter(|| index.iter().fold(0u64, |acc, v| acc + v as u64))
        });
    }
    group.finish();
}

fn bench_random_access(c: &mut Criterion) {
    let values = postings(100_000, 7);
    let mut group = c.benchmark_group("random_access");
    for ty in CODECS {
        let index = ItemIndex::encode(&values, ty).expect("encode");
        group.bench_with_input(BenchmarkId::from_parameter(ty), &index, |b, index| {
            b.iter(|| {
                (0..1_000u32)
                    .map(|i| index.at(i.wrapping_mul(97) % index.size()).unwrap_or(0) as u64)
                    .sum::<u64>()
            })
        });
    }
    group.finish();
}

fn bench_set_ops(c: &mut Criterion) {
    let a = postings(200_000, 3);
    let b = postings(150_000, 11);
    let mut group = c.benchmark_group("intersection");
    for ty in CODECS {
        let ia = ItemIndex::encode(&a, ty).expect("encode");
        let ib = ItemIndex::encode(&b, ty).expect("encode");
        group.bench_function(BenchmarkId::from_parameter(ty), |bench| {
            bench.iter(|| black_box(&ia) & black_box(&ib))
        });
    }
    group.finish();

    let sets: Vec<ItemIndex> = (0..32)
        .map(|seed| ItemIndex::encode(&postings(20_000, seed), IndexType::FoR).expect("encode"))
        .collect();
    c.bench_function("unite_all_32", |b| b.iter(|| ItemIndex::unite_all(black_box(&sets))));
}

fn bench_for_block(c: &mut Criterion) {
    let deltas: Vec<u32> = (0..128u32).map(|i| (i * 7) % 61).collect();
    let mut encoded = Vec::new();
    encode_block(&deltas, 6, &mut encoded);

    let mut group = c.benchmark_group("for_block");
    group.bench_function("encode_128x6", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(96);
            encode_block(black_box(&deltas), 6, &mut out);
            out
        })
    });
    group.bench_function("decode_128x6", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(128);
            decode_block(black_box(&encoded), 0, 128, 6, &mut out);
            out
        })
    });
    group.finish();
}

fn bench_factory(c: &mut Criterion) {
    let sets: Vec<Vec<u32>> = (0..500).map(|seed| postings(500, seed % 100)).collect();
    c.bench_function("factory_add_500", |b| {
        b.iter(|| {
            let factory = ItemIndexFactory::new(FactoryConfig::default()).expect("factory");
            for set in &sets {
                factory.add_sorted(set).expect("insert");
            }
            factory.hit_count()
        })
    });
}

criterion_group!(
    benches,
    bench_encode,
    bench_scan,
    bench_random_access,
    bench_set_ops,
    bench_for_block,
    bench_factory
);

criterion_main!(benches);
