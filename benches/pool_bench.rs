use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use criterion::{criterion_group, criterion_main, Criterion};
use workpool::WorkerPool;

fn throughput_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("enqueue_wait");

    for workers in [1usize, 4, 8] {
        group.bench_function(format!("pool-{workers}"), |b| {
            b.iter_batched(
                || WorkerPool::new(workers).unwrap(),
                |pool| {
                    let counter = Arc::new(AtomicUsize::new(0));
                    for _ in 0..100 {
                        let counter = counter.clone();
                        pool.enqueue(move || {
                            counter.fetch_add(1, Ordering::Relaxed);
                        });
                    }
                    pool.wait_all();
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.bench_function("spawn-per-job", |b| {
        b.iter(|| {
            let counter = Arc::new(AtomicUsize::new(0));
            let handles: Vec<_> = (0..100)
                .map(|_| {
                    let counter = counter.clone();
                    thread::spawn(move || {
                        counter.fetch_add(1, Ordering::Relaxed);
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        });
    });

    group.finish();
}

fn cancel_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("cancel_pending");

    group.bench_function("100-queued", |b| {
        b.iter_batched(
            || {
                let pool = WorkerPool::new(0).unwrap();
                for _ in 0..100 {
                    pool.enqueue(|| {});
                }
                pool
            },
            |pool| {
                assert_eq!(pool.cancel_pending(), 100);
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, throughput_bench, cancel_bench);
criterion_main!(benches);
