use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::collections::BTreeSet;
use wabi_pma::PackedMemoryArray;

const N: usize = 10_000;

// ─── Helper functions to generate key sequences ─────────────────────────────

fn ordered_keys(n: usize) -> Vec<i64> {
    (0..n as i64).collect()
}

fn reverse_ordered_keys(n: usize) -> Vec<i64> {
    (0..n as i64).rev().collect()
}

fn random_keys(n: usize) -> Vec<i64> {
    // Use a simple LCG for deterministic pseudo-random sequence
    let mut keys = Vec::with_capacity(n);
    let mut x: u64 = 12345;
    for _ in 0..n {
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
        keys.push((x >> 33) as i64);
    }
    keys
}

// ─── Insertion benchmarks ───────────────────────────────────────────────────

fn bench_insert(c: &mut Criterion) {
    for (name, keys) in [
        ("insert_ordered", ordered_keys(N)),
        ("insert_reverse", reverse_ordered_keys(N)),
        ("insert_random", random_keys(N)),
    ] {
        let mut group = c.benchmark_group(name);

        group.bench_function(BenchmarkId::new("PackedMemoryArray", N), |b| {
            b.iter(|| {
                let mut pma = PackedMemoryArray::new();
                for &k in &keys {
                    pma.insert(k);
                }
                pma
            });
        });

        group.bench_function(BenchmarkId::new("BTreeSet", N), |b| {
            b.iter(|| {
                let mut set = BTreeSet::new();
                for &k in &keys {
                    set.insert(k);
                }
                set
            });
        });

        group.finish();
    }
}

// ─── Scan benchmarks ────────────────────────────────────────────────────────

fn bench_scan(c: &mut Criterion) {
    let keys = random_keys(N);
    let pma: PackedMemoryArray<i64> = keys.iter().copied().collect();
    let set: BTreeSet<i64> = keys.iter().copied().collect();

    let mut group = c.benchmark_group("scan_all");

    group.bench_function(BenchmarkId::new("PackedMemoryArray", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            pma.scan(i64::MIN, i64::MAX, |k| sum = sum.wrapping_add(k));
            sum
        });
    });

    group.bench_function(BenchmarkId::new("BTreeSet", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for &k in &set {
                sum = sum.wrapping_add(k);
            }
            sum
        });
    });

    group.finish();
}

// ─── Erase benchmarks ───────────────────────────────────────────────────────

fn bench_erase(c: &mut Criterion) {
    let keys = random_keys(N);

    let mut group = c.benchmark_group("erase_random");

    group.bench_function(BenchmarkId::new("PackedMemoryArray", N), |b| {
        b.iter_batched(
            || keys.iter().copied().collect::<PackedMemoryArray<i64>>(),
            |mut pma| {
                for &k in &keys {
                    pma.erase(k);
                }
                pma
            },
            criterion::BatchSize::LargeInput,
        );
    });

    group.bench_function(BenchmarkId::new("BTreeSet", N), |b| {
        b.iter_batched(
            || keys.iter().copied().collect::<BTreeSet<i64>>(),
            |mut set| {
                for &k in &keys {
                    set.remove(&k);
                }
                set
            },
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_scan, bench_erase);
criterion_main!(benches);
