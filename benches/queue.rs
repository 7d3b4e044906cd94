use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use crossbeam_queue::SegQueue;
use std::hint::black_box;
use std::sync::Arc;
use std::thread;
use sync_fifo::{MpmcBlockQueue, MpmcListQueue, MpscListQueue};

const COUNT: usize = 10_000;
const CONCURRENCY: usize = 4;

// cargo bench --package sync-fifo --bench queue

fn spsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc");
    let _ = group.throughput(Throughput::Elements(COUNT as u64));

    let _ = group.bench_function("block_queue", |b| {
        let queue: MpmcBlockQueue<usize> = MpmcBlockQueue::new();
        b.iter(|| {
            for i in 0..COUNT {
                queue.enqueue(black_box(i));
            }
            for _ in 0..COUNT {
                let _ = black_box(queue.try_dequeue());
            }
        });
    });

    let _ = group.bench_function("list_queue", |b| {
        let queue: MpmcListQueue<usize> = MpmcListQueue::new();
        b.iter(|| {
            for i in 0..COUNT {
                queue.enqueue(black_box(i));
            }
            for _ in 0..COUNT {
                let _ = black_box(queue.try_dequeue());
            }
        });
    });

    let _ = group.bench_function("crossbeam_seg_queue", |b| {
        let queue: SegQueue<usize> = SegQueue::new();
        b.iter(|| {
            for i in 0..COUNT {
                queue.push(black_box(i));
            }
            for _ in 0..COUNT {
                let _ = black_box(queue.pop());
            }
        });
    });

    group.finish();
}

fn mpsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpsc");
    let _ = group.throughput(Throughput::Elements((COUNT * CONCURRENCY) as u64));

    let _ = group.bench_function("mpsc_list_queue", |b| {
        b.iter(|| {
            let queue: MpscListQueue<usize> = MpscListQueue::new();

            let producers: Vec<_> = (0..CONCURRENCY)
                .map(|_| {
                    let q = queue.clone();
                    thread::spawn(move || {
                        for i in 0..COUNT {
                            q.enqueue(black_box(i));
                        }
                    })
                })
                .collect();

            let mut received = 0;
            while received < COUNT * CONCURRENCY {
                if queue.try_dequeue().is_some() {
                    received += 1;
                } else {
                    thread::yield_now();
                }
            }

            for producer in producers {
                producer.join().unwrap();
            }
        });
    });

    let _ = group.bench_function("crossbeam_seg_queue", |b| {
        b.iter(|| {
            let queue: Arc<SegQueue<usize>> = Arc::new(SegQueue::new());

            let producers: Vec<_> = (0..CONCURRENCY)
                .map(|_| {
                    let q = Arc::clone(&queue);
                    thread::spawn(move || {
                        for i in 0..COUNT {
                            q.push(black_box(i));
                        }
                    })
                })
                .collect();

            let mut received = 0;
            while received < COUNT * CONCURRENCY {
                if queue.pop().is_some() {
                    received += 1;
                } else {
                    thread::yield_now();
                }
            }

            for producer in producers {
                producer.join().unwrap();
            }
        });
    });

    group.finish();
}

fn mpmc(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpmc");
    let _ = group.throughput(Throughput::Elements((COUNT * CONCURRENCY) as u64));

    let _ = group.bench_function("block_queue", |b| {
        b.iter(|| {
            let queue: MpmcBlockQueue<usize> = MpmcBlockQueue::new();

            let consumers: Vec<_> = (0..CONCURRENCY)
                .map(|_| {
                    let q = queue.clone();
                    thread::spawn(move || {
                        for _ in 0..COUNT {
                            loop {
                                if q.try_dequeue().is_some() {
                                    break;
                                }
                                thread::yield_now();
                            }
                        }
                    })
                })
                .collect();

            let producers: Vec<_> = (0..CONCURRENCY)
                .map(|_| {
                    let q = queue.clone();
                    thread::spawn(move || {
                        for i in 0..COUNT {
                            q.enqueue(black_box(i));
                        }
                    })
                })
                .collect();

            for th in producers.into_iter().chain(consumers) {
                th.join().unwrap();
            }
        });
    });

    let _ = group.bench_function("list_queue", |b| {
        b.iter(|| {
            let queue: MpmcListQueue<usize> = MpmcListQueue::new();

            let consumers: Vec<_> = (0..CONCURRENCY)
                .map(|_| {
                    let q = queue.clone();
                    thread::spawn(move || {
                        for _ in 0..COUNT {
                            loop {
                                if q.try_dequeue().is_some() {
                                    break;
                                }
                                thread::yield_now();
                            }
                        }
                    })
                })
                .collect();

            let producers: Vec<_> = (0..CONCURRENCY)
                .map(|_| {
                    let q = queue.clone();
                    thread::spawn(move || {
                        for i in 0..COUNT {
                            q.enqueue(black_box(i));
                        }
                    })
                })
                .collect();

            for th in producers.into_iter().chain(consumers) {
                th.join().unwrap();
            }
        });
    });

    let _ = group.bench_function("crossbeam_seg_queue", |b| {
        b.iter(|| {
            let queue: Arc<SegQueue<usize>> = Arc::new(SegQueue::new());

            let consumers: Vec<_> = (0..CONCURRENCY)
                .map(|_| {
                    let q = Arc::clone(&queue);
                    thread::spawn(move || {
                        for _ in 0..COUNT {
                            loop {
                                if q.pop().is_some() {
                                    break;
                                }
                                thread::yield_now();
                            }
                        }
                    })
                })
                .collect();

            let producers: Vec<_> = (0..CONCURRENCY)
                .map(|_| {
                    let q = Arc::clone(&queue);
                    thread::spawn(move || {
                        for i in 0..COUNT {
                            q.push(black_box(i));
                        }
                    })
                })
                .collect();

            for th in producers.into_iter().chain(consumers) {
                th.join().unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(benches, spsc, mpsc, mpmc);
criterion_main!(benches);
