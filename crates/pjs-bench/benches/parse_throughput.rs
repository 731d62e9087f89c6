//! Parsing throughput per memory resource, against serde_json as a baseline

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use pjson_rs_storage::{
    MonotonicResource, StaticResource, StorageHandle, make_counted_resource, parse,
};
use pjson_rs_storage_bench::fixtures;
use std::hint::black_box;
use std::time::{Duration, Instant};

fn benchmark_resources(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_by_resource");

    for (name, document) in fixtures() {
        group.throughput(Throughput::Bytes(document.len() as u64));

        group.bench_with_input(BenchmarkId::new("serde_json", name), &document, |b, doc| {
            b.iter(|| {
                let _: serde_json::Value = serde_json::from_str(black_box(doc)).unwrap();
            })
        });

        group.bench_with_input(BenchmarkId::new("default", name), &document, |b, doc| {
            b.iter(|| parse(black_box(doc), StorageHandle::default()).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("monotonic", name), &document, |b, doc| {
            b.iter(|| {
                let arena = MonotonicResource::with_capacity(doc.len() * 2);
                let value = parse(black_box(doc), StorageHandle::borrowed(&arena)).unwrap();
                black_box(&value);
            })
        });

        group.bench_with_input(BenchmarkId::new("monotonic_shared", name), &document, |b, doc| {
            b.iter(|| {
                let storage = make_counted_resource(MonotonicResource::new());
                parse(black_box(doc), storage).unwrap()
            })
        });

        let mut buffer = vec![0u8; document.len() * 16];
        group.bench_with_input(BenchmarkId::new("static", name), &document, |b, doc| {
            b.iter(|| {
                let fixed = StaticResource::new(&mut buffer);
                let value = parse(black_box(doc), StorageHandle::borrowed(&fixed)).unwrap();
                black_box(&value);
            })
        });
    }

    group.finish();
}

fn benchmark_teardown(c: &mut Criterion) {
    let mut group = c.benchmark_group("teardown");
    let document = pjson_rs_storage_bench::catalogue_json(1000);

    group.bench_function("default", |b| {
        b.iter_batched(
            || parse(&document, StorageHandle::default()).unwrap(),
            drop,
            criterion::BatchSize::LargeInput,
        )
    });

    group.bench_function("monotonic", |b| {
        b.iter_custom(|iters| {
            let mut elapsed = Duration::ZERO;
            for _ in 0..iters {
                let arena = MonotonicResource::with_capacity(document.len() * 4);
                let value = parse(&document, StorageHandle::borrowed(&arena)).unwrap();
                let started = Instant::now();
                drop(black_box(value));
                elapsed += started.elapsed();
            }
            elapsed
        })
    });

    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .sample_size(50);
    targets = benchmark_resources, benchmark_teardown
);
criterion_main!(benches);
