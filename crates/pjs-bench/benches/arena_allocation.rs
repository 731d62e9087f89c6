//! Raw allocation cost of each resource, with bumpalo as the arena baseline

use bumpalo::Bump;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use pjson_rs_storage::{
    Array, MemoryResource, MonotonicResource, StaticResource, StorageHandle, Value,
    default_resource,
};
use std::alloc::Layout;
use std::hint::black_box;

const SIZES: [usize; 3] = [16, 64, 256];
const REQUESTS: usize = 1024;

fn benchmark_small_allocations(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_1024");
    group.throughput(Throughput::Elements(REQUESTS as u64));

    for size in SIZES {
        let layout = Layout::from_size_align(size, 8).unwrap();

        group.bench_with_input(BenchmarkId::new("bumpalo", size), &layout, |b, &layout| {
            b.iter(|| {
                let bump = Bump::with_capacity(REQUESTS * size);
                for _ in 0..REQUESTS {
                    black_box(bump.alloc_layout(layout));
                }
            })
        });

        group.bench_with_input(BenchmarkId::new("monotonic", size), &layout, |b, &layout| {
            b.iter(|| {
                let arena = MonotonicResource::with_capacity(REQUESTS * size);
                for _ in 0..REQUESTS {
                    black_box(arena.allocate(layout).unwrap());
                }
            })
        });

        let mut buffer = vec![0u8; REQUESTS * size + 8];
        group.bench_with_input(BenchmarkId::new("static", size), &layout, |b, &layout| {
            b.iter(|| {
                let fixed = StaticResource::new(&mut buffer);
                for _ in 0..REQUESTS {
                    black_box(fixed.allocate(layout).unwrap());
                }
            })
        });

        group.bench_with_input(BenchmarkId::new("default", size), &layout, |b, &layout| {
            let resource = default_resource();
            let mut blocks = Vec::with_capacity(REQUESTS);
            b.iter(|| {
                for _ in 0..REQUESTS {
                    blocks.push(resource.allocate(layout).unwrap());
                }
                for block in blocks.drain(..) {
                    // SAFETY: allocated above with the same layout
                    unsafe { resource.deallocate(block, layout) };
                }
            })
        });
    }

    group.finish();
}

fn benchmark_array_building(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_push_1024");
    group.throughput(Throughput::Elements(REQUESTS as u64));

    group.bench_function("default", |b| {
        b.iter(|| {
            let storage = StorageHandle::default();
            let mut array = Array::with_capacity_in(REQUESTS, storage.clone()).unwrap();
            for i in 0..REQUESTS as i64 {
                array.push(Value::from_i64(i, storage.clone())).unwrap();
            }
            black_box(array)
        })
    });

    group.bench_function("monotonic", |b| {
        b.iter(|| {
            let arena = MonotonicResource::new();
            let storage = StorageHandle::borrowed(&arena);
            let mut array = Array::new_in(storage.clone());
            for i in 0..REQUESTS as i64 {
                array.push(Value::from_i64(i, storage.clone())).unwrap();
            }
            black_box(array.len())
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_small_allocations, benchmark_array_building);
criterion_main!(benches);
