//! Cache-aside hot path benchmarks
//!
//! Run with: cargo bench --bench cache_aside

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use inventory_cache::cache::keys::{filter_hash, product_key, search_key};
use inventory_cache::{CacheAside, CacheError, FixedWindowRateLimiter, MemoryStore, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

fn create_runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn bench_keys(c: &mut Criterion) {
    let mut group = c.benchmark_group("keys");

    for len in [16usize, 256, 4096] {
        let query = "torque wrench ".repeat(len / 14 + 1);
        group.bench_with_input(BenchmarkId::new("search_key", len), &query, |b, query| {
            b.iter(|| black_box(search_key(query, 1)));
        });
    }

    group.bench_function("filter_hash", |b| {
        b.iter(|| black_box(filter_hash("category=tools&sort=name&in_stock=true")));
    });

    group.finish();
}

fn bench_get_or_set(c: &mut Criterion) {
    let rt = create_runtime();
    let store = Arc::new(MemoryStore::new(Arc::new(SystemClock)));
    let cache = CacheAside::new(store);
    let key = product_key("SKU-001");

    rt.block_on(async {
        let _: Option<String> = cache
            .get_or_set(&key, Duration::from_secs(3600), || async {
                Ok::<_, CacheError>(Some("Torque wrench".to_string()))
            })
            .await
            .unwrap();
    });

    c.bench_function("get_or_set_hit", |b| {
        b.iter(|| {
            rt.block_on(async {
                let value: Option<String> = cache
                    .get_or_set(&key, Duration::from_secs(3600), || async {
                        Ok::<_, CacheError>(None)
                    })
                    .await
                    .unwrap();
                black_box(value);
            });
        });
    });

    c.bench_function("get_or_set_empty_miss", |b| {
        b.iter(|| {
            rt.block_on(async {
                let value: Option<String> = cache
                    .get_or_set("product:none", Duration::from_secs(3600), || async {
                        Ok::<_, CacheError>(None)
                    })
                    .await
                    .unwrap();
                black_box(value);
            });
        });
    });
}

fn bench_rate_limit(c: &mut Criterion) {
    let rt = create_runtime();
    let store = Arc::new(MemoryStore::new(Arc::new(SystemClock)));
    let limiter = FixedWindowRateLimiter::new(store, Arc::new(SystemClock));

    c.bench_function("rate_limit_allow", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(
                    limiter
                        .allow("203.0.113.7", u64::MAX, Duration::from_secs(60))
                        .await
                        .unwrap(),
                );
            });
        });
    });
}

criterion_group!(benches, bench_keys, bench_get_or_set, bench_rate_limit);
criterion_main!(benches);
