//! Benchmark for the capacity gate.
//!
//! TARGET: acquire + release well under 100ns uncontended
//!
//! Run with: cargo bench --package molegrid_core --bench gate_benchmark

use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use molegrid_core::CapacityGate;

fn benchmark_uncontended(c: &mut Criterion) {
    let gate = CapacityGate::new(3).unwrap();

    let mut group = c.benchmark_group("gate_uncontended");
    group.throughput(Throughput::Elements(1));

    group.bench_function("acquire_release", |b| {
        b.iter(|| {
            let permit = gate.try_acquire();
            black_box(&permit);
        });
    });

    let _held: Vec<_> = (0..3).map(|_| gate.try_acquire()).collect();
    group.bench_function("acquire_exhausted", |b| {
        b.iter(|| black_box(gate.try_acquire().is_none()));
    });

    group.finish();
}

fn benchmark_contended(c: &mut Criterion) {
    // Eight busy cells fighting over the default three permits.
    const THREADS: usize = 8;
    const ATTEMPTS: usize = 10_000;

    let mut group = c.benchmark_group("gate_contended");
    group.throughput(Throughput::Elements((THREADS * ATTEMPTS) as u64));
    group.sample_size(20);

    group.bench_function("8_threads_3_permits", |b| {
        b.iter(|| {
            let gate = Arc::new(CapacityGate::new(3).unwrap());
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let gate = Arc::clone(&gate);
                    thread::spawn(move || {
                        let mut won = 0usize;
                        for _ in 0..ATTEMPTS {
                            if let Some(permit) = gate.try_acquire() {
                                won += 1;
                                drop(permit);
                            }
                        }
                        won
                    })
                })
                .collect();

            let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
            black_box(total)
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_uncontended, benchmark_contended);
criterion_main!(benches);
