//! Benchmarks for the built-in LRU backends.
//!
//! Run with: `cargo bench --bench lru`

use std::hint::black_box;
use std::sync::Arc;

use carbonite::policy::memory::MemoryLruCache;
use carbonite::policy::storage::{StorageLruCache, StorageOptions};
use carbonite::serialization::SerializationFormat;
use carbonite::traits::Cache;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};

// ============================================================================
// Memory backend
// ============================================================================

fn bench_memory_insert_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_lru");
    group.throughput(Throughput::Elements(1024 * 2));

    group.bench_function("insert_get", |b| {
        b.iter_batched(
            || {
                let cache = MemoryLruCache::new(1024);
                for i in 0..1024u64 {
                    cache.put(i, Arc::new(i)).unwrap();
                }
                cache
            },
            |cache| {
                for i in 0..1024u64 {
                    cache.put(black_box(i + 10_000), Arc::new(i)).unwrap();
                    let _ = black_box(cache.get(&black_box(i)));
                }
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("hit_refresh", |b| {
        let cache = MemoryLruCache::new(1024);
        for i in 0..1024u64 {
            cache.put(i, i).unwrap();
        }
        let mut i = 0u64;
        b.iter(|| {
            i = (i + 7) % 1024;
            black_box(cache.get(&i).unwrap())
        })
    });

    group.finish();
}

// ============================================================================
// Storage backend
// ============================================================================

fn bench_storage_put_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("storage_lru");
    group.throughput(Throughput::Elements(64));

    for format in [SerializationFormat::Bincode, SerializationFormat::Json] {
        group.bench_function(format!("put_get_{format}"), |b| {
            b.iter_batched(
                || {
                    let dir = tempfile::tempdir().unwrap();
                    let options =
                        StorageOptions::new(dir.path(), 32, format.serializer_for::<Vec<u32>>());
                    let cache = StorageLruCache::open(options).unwrap();
                    (dir, cache)
                },
                |(_dir, cache)| {
                    for i in 0..32u32 {
                        cache.put(format!("k{i}"), vec![i; 16]).unwrap();
                        black_box(cache.get(&format!("k{}", i / 2)).unwrap());
                    }
                },
                BatchSize::PerIteration,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_memory_insert_get, bench_storage_put_get);
criterion_main!(benches);
