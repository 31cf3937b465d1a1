//! Benchmark for content collection resolution
//!
//! Exact hits are a map lookup; wildcard resolution scans every pattern.

use content_resolver::{ContentCollection, ContentRecord, PathKey};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn collection_with(size: usize) -> ContentCollection {
    let mut collection = ContentCollection::new();
    for i in 0..size {
        let url = if i % 10 == 0 {
            format!("https://x.com/catalog/{}/*", i)
        } else {
            format!("https://x.com/catalog/{}/item", i)
        };
        let record = ContentRecord::new(&url, "https://cdn.x.com/v.mp4", "https://cdn.x.com/t.jpg")
            .expect("valid record");
        collection.insert(record);
    }
    collection
}

fn bench_exact_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    group.throughput(Throughput::Elements(1));

    for size in [10, 100, 1_000] {
        let collection = collection_with(size);
        let request = PathKey::normalize("/catalog/1/item", true);

        group.bench_with_input(BenchmarkId::new("exact", size), &size, |b, _| {
            b.iter(|| collection.resolve(black_box(&request)));
        });
    }

    group.finish();
}

fn bench_wildcard_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    group.throughput(Throughput::Elements(1));

    for size in [10, 100, 1_000] {
        let collection = collection_with(size);
        let request = PathKey::normalize("/catalog/0/shoes/red", true);

        group.bench_with_input(BenchmarkId::new("wildcard", size), &size, |b, _| {
            b.iter(|| collection.resolve(black_box(&request)));
        });
    }

    group.finish();
}

fn bench_miss(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    let collection = collection_with(1_000);
    let request = PathKey::normalize("/elsewhere/entirely", true);

    group.bench_function("miss_1000", |b| {
        b.iter(|| collection.resolve(black_box(&request)));
    });

    group.finish();
}

criterion_group!(benches, bench_exact_match, bench_wildcard_match, bench_miss);
criterion_main!(benches);
