//! Hot-path benchmarks: slot writes, slot reads, get-or-set hits, and
//! host churn with automatic sweeping.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use remora_store::AttachmentStore;

fn bench_set(c: &mut Criterion) {
    let store = AttachmentStore::new();
    let host = Arc::new("bench host".to_string());
    c.bench_function("set_value/overwrite", |b| {
        b.iter(|| store.set_value(&host, "bench.slot", black_box(42u64)).unwrap());
    });
}

fn bench_get(c: &mut Criterion) {
    let store = AttachmentStore::new();
    let host = Arc::new("bench host".to_string());
    store.set_value(&host, "bench.slot", 42u64).unwrap();
    c.bench_function("get_value/hit", |b| {
        b.iter(|| {
            let value = store
                .get_value::<_, u64>(&host, black_box("bench.slot"))
                .unwrap()
                .unwrap();
            black_box(*value)
        });
    });
}

fn bench_get_or_set_hit(c: &mut Criterion) {
    let store = AttachmentStore::new();
    let host = Arc::new("bench host".to_string());
    store.set_value(&host, "bench.slot", 42u64).unwrap();
    c.bench_function("get_or_set_value/hit", |b| {
        b.iter(|| {
            let resolved = store
                .get_or_set_value(&host, "bench.slot", || 0u64)
                .unwrap();
            black_box(resolved.found())
        });
    });
}

fn bench_host_churn(c: &mut Criterion) {
    let store = AttachmentStore::new();
    c.bench_function("host_churn/create_attach_drop", |b| {
        b.iter(|| {
            let host = Arc::new(black_box(7u32));
            store.set_value(&host, "bench.slot", 1u8).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_get_or_set_hit,
    bench_host_churn
);
criterion_main!(benches);
