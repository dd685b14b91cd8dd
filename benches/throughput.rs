//! Throughput benchmarks: Classic vs Compact vs Concurrent counters, plus
//! the smoothing factories.
//!
//! Each group runs the same workload against every backend so criterion
//! can generate side-by-side HTML reports.
//!
//! Run with:
//!     cargo bench --bench throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tally::{smoothing, ClassicCounter, CompactCounter, ConcurrentCounter, Counter};

/// Distinct keys in the working set.
const KEYS: u64 = 10_000;

/// Operations executed per criterion iteration (hot-loop size).
const OPS: u64 = 1_000;

fn filled<C: Counter<u64>>(mut c: C) -> C {
    for i in 0..KEYS {
        c.set_count(i, (i % 17) as f64);
    }
    c
}

// ---------------------------------------------------------------------------
// Group 1: get_count
// ---------------------------------------------------------------------------
// Every key is present → pure lookup throughput.

fn bench_get_count(c: &mut Criterion) {
    let classic = filled(ClassicCounter::new());
    let compact = filled(CompactCounter::new());
    let concurrent = filled(ConcurrentCounter::new(16));

    let mut group = c.benchmark_group("get_count");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function("classic", |b| {
        b.iter(|| {
            for i in 0..OPS {
                black_box(classic.get_count(black_box(&(i * 7 % KEYS))));
            }
        })
    });

    group.bench_function("compact", |b| {
        b.iter(|| {
            for i in 0..OPS {
                black_box(compact.get_count(black_box(&(i * 7 % KEYS))));
            }
        })
    });

    group.bench_function("concurrent", |b| {
        b.iter(|| {
            for i in 0..OPS {
                black_box(concurrent.get_count(black_box(&(i * 7 % KEYS))));
            }
        })
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Group 2: increment, 50 % hits and 50 % new keys
// ---------------------------------------------------------------------------

fn bench_increment(c: &mut Criterion) {
    let mut group = c.benchmark_group("increment");
    group.throughput(Throughput::Elements(OPS));

    let mut classic = filled(ClassicCounter::new());
    group.bench_function("classic", |b| {
        b.iter(|| {
            for i in 0..OPS {
                black_box(classic.increment_count(black_box(i * 2), 1.0));
            }
        })
    });

    let mut compact = filled(CompactCounter::new());
    group.bench_function("compact", |b| {
        b.iter(|| {
            for i in 0..OPS {
                black_box(compact.increment_count(black_box(i * 2), 1.0));
            }
        })
    });

    let concurrent = filled(ConcurrentCounter::new(16));
    group.bench_function("concurrent", |b| {
        b.iter(|| {
            for i in 0..OPS {
                black_box(concurrent.increment_count(black_box(i * 2), 1.0));
            }
        })
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Group 3: concurrent increments, 8 threads on one shared counter
// ---------------------------------------------------------------------------

fn bench_concurrent_increment(c: &mut Criterion) {
    use std::sync::{Arc, Barrier};
    use std::time::{Duration, Instant};

    const THREADS: usize = 8;
    const OPS_PER_THREAD: u64 = 2_000;

    let mut group = c.benchmark_group("concurrent_8t_increment");
    group.throughput(Throughput::Elements(THREADS as u64 * OPS_PER_THREAD));

    for shards in [1usize, 16, 64] {
        let counter = Arc::new(filled(ConcurrentCounter::new(shards)));
        group.bench_with_input(BenchmarkId::new("shards", shards), &shards, |b, _| {
            b.iter_custom(|iters| {
                let mut total = Duration::ZERO;
                for _ in 0..iters {
                    let barrier = Arc::new(Barrier::new(THREADS + 1));
                    let handles: Vec<_> = (0..THREADS)
                        .map(|t| {
                            let c = Arc::clone(&counter);
                            let bar = Arc::clone(&barrier);
                            std::thread::spawn(move || {
                                bar.wait();
                                let start = Instant::now();
                                let base = t as u64 * OPS_PER_THREAD;
                                for j in 0..OPS_PER_THREAD {
                                    let k = base.wrapping_add(j * 7_919) % KEYS;
                                    black_box(c.increment_count(black_box(k), 1.0));
                                }
                                start.elapsed()
                            })
                        })
                        .collect();
                    barrier.wait();
                    let elapsed = handles
                        .into_iter()
                        .map(|h| h.join().unwrap())
                        .max()
                        .unwrap_or_default();
                    total += elapsed;
                }
                total
            })
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Group 4: smoothing over a Zipf-ish counter
// ---------------------------------------------------------------------------

fn bench_smoothing(c: &mut Criterion) {
    let mut counts = ClassicCounter::new();
    for i in 1..=KEYS {
        counts.set_count(i, (KEYS as f64 / i as f64).floor());
    }
    let universe = (KEYS * 2) as usize;

    let mut group = c.benchmark_group("smoothing");
    group.throughput(Throughput::Elements(KEYS));
    group.bench_function("laplace", |b| {
        b.iter(|| black_box(smoothing::laplace(&counts, universe)))
    });
    group.bench_function("good_turing", |b| {
        b.iter(|| black_box(smoothing::good_turing(&counts, universe)))
    });
    group.bench_function("simple_good_turing", |b| {
        b.iter(|| black_box(smoothing::simple_good_turing(&counts, universe)))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_get_count,
    bench_increment,
    bench_concurrent_increment,
    bench_smoothing,
);
criterion_main!(benches);
