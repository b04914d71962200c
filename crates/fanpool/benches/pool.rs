//! Pool and queue benchmarks
//!
//! Run with: cargo bench -p fanpool

use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fanpool::{BoundedQueue, Pool, PoolConfig};

const JOBS: u64 = 100;

/// Full pool lifecycle over a fixed batch with varying worker counts
fn pool_workers(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_workers");
    group.throughput(Throughput::Elements(JOBS));

    for workers in [1usize, 4, 10] {
        group.bench_with_input(BenchmarkId::new("workers", workers), &workers, |b, &n| {
            b.iter(|| {
                let config = PoolConfig::new().num_workers(n).capacities(16, 16);
                let pool = Pool::run(config, |x: u64| black_box(x * 2)).unwrap();
                for x in 0..JOBS {
                    pool.submit(x).unwrap();
                }
                pool.close_intake().unwrap();
                pool.wait().unwrap();
                black_box(pool.collect().unwrap().len())
            })
        });
    }
    group.finish();
}

/// Intake capacity sweep: handoff, small and large buffers
fn pool_capacity(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_capacity");
    group.throughput(Throughput::Elements(JOBS));

    for cap in [0usize, 10, 100] {
        group.bench_with_input(BenchmarkId::new("capacity", cap), &cap, |b, &cap| {
            b.iter(|| {
                let config = PoolConfig::new().num_workers(4).capacities(cap, cap);
                let pool = Pool::run(config, |x: u64| x).unwrap();
                let source = pool.feed(0..JOBS).unwrap();
                let n = pool.collect().unwrap().len();
                source.join().unwrap();
                black_box(n)
            })
        });
    }
    group.finish();
}

/// Raw queue throughput: one producer, one consumer
fn queue_spsc(c: &mut Criterion) {
    const ITEMS: u64 = 10_000;
    let mut group = c.benchmark_group("queue_spsc");
    group.throughput(Throughput::Elements(ITEMS));

    for cap in [1usize, 64, 1024] {
        group.bench_with_input(BenchmarkId::new("capacity", cap), &cap, |b, &cap| {
            b.iter(|| {
                let queue = Arc::new(BoundedQueue::new(cap));
                let producer = {
                    let queue = Arc::clone(&queue);
                    thread::spawn(move || {
                        for i in 0..ITEMS {
                            queue.send(i).unwrap();
                        }
                        queue.close();
                    })
                };

                let mut sum = 0u64;
                while let Ok(v) = queue.recv() {
                    sum += v;
                }
                producer.join().unwrap();
                black_box(sum)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, pool_workers, pool_capacity, queue_spsc);
criterion_main!(benches);
