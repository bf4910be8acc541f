//! Benchmark for PersistentTreeSet vs standard BTreeSet.
//!
//! Compares verset's PersistentTreeSet against Rust's standard BTreeSet for
//! common operations. The comparison is indicative only: BTreeSet mutates in
//! place, while PersistentTreeSet pays for path copying to keep every
//! previous version alive.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::collections::BTreeSet;
use verset::PersistentTreeSet;

/// Pseudo-random key stream (Knuth multiplicative hash) so insertion order
/// keeps the unbalanced tree's depth logarithmic.
fn scrambled_keys(size: i64) -> impl Iterator<Item = i64> {
    (0..size).map(move |index| index * 2_654_435_761 % size)
}

// =============================================================================
// insert Benchmark
// =============================================================================

fn benchmark_insert(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("insert");

    for size in [100_i64, 1000, 10000] {
        group.bench_with_input(
            BenchmarkId::new("PersistentTreeSet", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut set = PersistentTreeSet::new();
                    for key in scrambled_keys(size) {
                        set.insert(black_box(key));
                    }
                    black_box(set)
                });
            },
        );

        // Standard BTreeSet insert
        group.bench_with_input(
            BenchmarkId::new("BTreeSet", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut set = BTreeSet::new();
                    for key in scrambled_keys(size) {
                        set.insert(black_box(key));
                    }
                    black_box(set)
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// find Benchmark
// =============================================================================

fn benchmark_find(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("find");

    for size in [100_i64, 1000, 10000] {
        let persistent: PersistentTreeSet<i64> = scrambled_keys(size).collect();
        let standard: BTreeSet<i64> = scrambled_keys(size).collect();

        group.bench_with_input(
            BenchmarkId::new("PersistentTreeSet", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    for index in 0..size {
                        black_box(persistent.contains(black_box(&index)));
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("BTreeSet", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    for index in 0..size {
                        black_box(standard.contains(black_box(&index)));
                    }
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// clone + insert (versioning) Benchmark
// =============================================================================

fn benchmark_versioned_insert(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("versioned_insert");

    for size in [100_i64, 1000] {
        let base: PersistentTreeSet<i64> = scrambled_keys(size).collect();

        // O(1) clone followed by one path-copying insert
        group.bench_with_input(
            BenchmarkId::new("PersistentTreeSet", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut version = base.clone();
                    version.insert(black_box(size + 1));
                    black_box(version)
                });
            },
        );

        let standard: BTreeSet<i64> = scrambled_keys(size).collect();

        // Full copy followed by one insert
        group.bench_with_input(
            BenchmarkId::new("BTreeSet", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut version = standard.clone();
                    version.insert(black_box(size + 1));
                    black_box(version)
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// iter Benchmark
// =============================================================================

fn benchmark_iter(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("iter");

    for size in [100_i64, 1000, 10000] {
        let persistent: PersistentTreeSet<i64> = scrambled_keys(size).collect();
        let standard: BTreeSet<i64> = scrambled_keys(size).collect();

        group.bench_with_input(
            BenchmarkId::new("PersistentTreeSet", size),
            &size,
            |bencher, _| {
                bencher.iter(|| {
                    let sum: i64 = persistent.iter().sum();
                    black_box(sum)
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("BTreeSet", size), &size, |bencher, _| {
            bencher.iter(|| {
                let sum: i64 = standard.iter().sum();
                black_box(sum)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_insert,
    benchmark_find,
    benchmark_versioned_insert,
    benchmark_iter
);
criterion_main!(benches);
