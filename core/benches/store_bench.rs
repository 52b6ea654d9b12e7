use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mvkv::blob::{djb2_hash, Blob, Key};
use mvkv::store::Store;
use mvkv::transaction::TransactionManager;
use rand::Rng;

/// Benchmarks for the hash function, the put/get hot paths, and the
/// garbage-collection sweep that runs on every access.

fn generate_key_bytes(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

fn bench_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("djb2_hash");
    for size in [8, 64, 256, 1024] {
        let data = generate_key_bytes(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("hash", size), &data, |b, data| {
            b.iter(|| djb2_hash(black_box(data)));
        });
    }
    group.finish();
}

fn bench_put_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_put_uncontended");
    for n_keys in [10, 100, 1000] {
        group.throughput(Throughput::Elements(n_keys as u64));
        group.bench_with_input(BenchmarkId::new("distinct_keys", n_keys), &n_keys, |b, &n_keys| {
            b.iter(|| {
                let txns = TransactionManager::new();
                let store = Store::new();
                for i in 0..n_keys {
                    let t = txns.begin();
                    let key = Key::new(Blob::new(format!("key-{i}").into_bytes()));
                    store.put(&t, key, Blob::new(format!("value-{i}").into_bytes()));
                    t.commit();
                }
            });
        });
    }
    group.finish();
}

fn bench_get_after_many_versions(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_get_with_version_chain");
    for n_writers in [1, 2, 10] {
        group.bench_with_input(
            BenchmarkId::new("committed_writers", n_writers),
            &n_writers,
            |b, &n_writers| {
                let txns = TransactionManager::new();
                let store = Store::new();
                let key = Key::new(Blob::new(*b"hot-key"));
                for i in 0..n_writers {
                    let t = txns.begin();
                    store.put(&t, key.clone(), Blob::new(format!("v{i}").into_bytes()));
                    t.commit();
                }
                b.iter(|| {
                    let t = txns.begin();
                    black_box(store.get(&t, key.clone()));
                });
            },
        );
    }
    group.finish();
}

criterion_group!(store_benches, bench_hash, bench_put_uncontended, bench_get_after_many_versions);
criterion_main!(store_benches);
