use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use sync_fifo::MpmcBlockQueue;

// cargo test --package sync-fifo --test block_queue -- test_single_thread_order --exact --nocapture
#[test]
fn test_single_thread_order() {
    let queue: MpmcBlockQueue<i32> = MpmcBlockQueue::new();

    queue.enqueue(1);
    queue.enqueue(2);
    queue.enqueue(3);

    assert_eq!(queue.try_dequeue(), Some(1));
    assert_eq!(queue.try_dequeue(), Some(2));
    assert_eq!(queue.try_dequeue(), Some(3));
    assert_eq!(queue.try_dequeue(), None);
}

// One lap of the queue is 64 index positions backed by 63 slots, so 64 items
// force the producer side to install a second block and the consumer side to
// follow it across the boundary.
#[test]
fn test_block_boundary() {
    const COUNT: usize = 64;
    let queue: MpmcBlockQueue<usize> = MpmcBlockQueue::new();

    for i in 0..COUNT {
        queue.enqueue(i);
    }

    for i in 0..COUNT {
        assert_eq!(queue.try_dequeue(), Some(i));
    }

    assert_eq!(queue.try_dequeue(), None);
}

// Push enough to run through many blocks in a single thread, exercising the
// install/follow/teardown cycle repeatedly.
#[test]
fn test_many_laps() {
    const COUNT: usize = 10_000;
    let queue: MpmcBlockQueue<usize> = MpmcBlockQueue::new();

    for i in 0..COUNT {
        queue.enqueue(i);
    }

    for i in 0..COUNT {
        assert_eq!(queue.try_dequeue(), Some(i));
    }

    assert_eq!(queue.try_dequeue(), None);
}

#[test]
fn test_clear_then_reuse() {
    let queue: MpmcBlockQueue<usize> = MpmcBlockQueue::new();

    for i in 0..100 {
        queue.enqueue(i);
    }
    queue.clear();
    assert_eq!(queue.try_dequeue(), None);

    queue.enqueue(7);
    assert_eq!(queue.try_dequeue(), Some(7));
    assert_eq!(queue.try_dequeue(), None);
}

#[test]
fn test_is_lock_free() {
    let queue: MpmcBlockQueue<usize> = MpmcBlockQueue::new();
    assert!(queue.is_lock_free());
}

// Every value is delivered exactly once, and the values of one producer are
// seen in order by whichever consumer receives them. `try_dequeue` may return
// `None` when losing a dequeue race, so consumers loop on a shared count
// rather than on an empty answer.
//
// cargo test --package sync-fifo --test block_queue -- test_mpmc_stress --exact --nocapture
#[test]
fn test_mpmc_stress() {
    const COUNT: usize = 100_000;
    const PRODUCERS: usize = 4;
    const CONSUMERS: usize = 2;
    const STRIDE: usize = 10_000_000;

    let queue: MpmcBlockQueue<usize> = MpmcBlockQueue::new();
    let taken = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|pid| {
            let q = queue.clone();
            thread::spawn(move || {
                for seq in 0..COUNT {
                    q.enqueue(pid * STRIDE + seq);
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let q = queue.clone();
            let taken = Arc::clone(&taken);
            thread::spawn(move || {
                let mut received = Vec::new();
                while taken.load(Ordering::Relaxed) < PRODUCERS * COUNT {
                    if let Some(value) = q.try_dequeue() {
                        let _ = taken.fetch_add(1, Ordering::Relaxed);
                        received.push(value);
                    } else {
                        thread::yield_now();
                    }
                }
                received
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }

    let mut all = HashSet::new();
    for consumer in consumers {
        let received = consumer.join().unwrap();

        // Values of one producer arrive at this consumer in enqueue order.
        let mut last_seq = vec![None; PRODUCERS];
        for value in &received {
            let (pid, seq) = (value / STRIDE, value % STRIDE);
            assert!(last_seq[pid] < Some(seq));
            last_seq[pid] = Some(seq);
        }

        for value in received {
            assert!(all.insert(value), "value {value} delivered twice");
        }
    }

    assert_eq!(all.len(), PRODUCERS * COUNT);
    assert_eq!(queue.try_dequeue(), None);
}

// Dropping a non-empty queue drains the remaining values, running their
// destructors exactly once.
#[test]
fn test_drop_drains_values() {
    static DROPS: AtomicUsize = AtomicUsize::new(0);

    struct Tracked;

    impl Drop for Tracked {
        fn drop(&mut self) {
            let _ = DROPS.fetch_add(1, Ordering::Relaxed);
        }
    }

    let queue: MpmcBlockQueue<Tracked> = MpmcBlockQueue::new();
    for _ in 0..100 {
        queue.enqueue(Tracked);
    }

    drop(queue);
    assert_eq!(DROPS.load(Ordering::Relaxed), 100);
}
