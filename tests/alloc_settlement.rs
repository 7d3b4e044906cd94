//! Memory settlement: after a queue is dropped, every node, block and cached
//! pool entry has been returned to the allocator.
//!
//! The counting allocator tracks live allocations for the whole test binary,
//! so this file holds a single test function and runs its scenarios
//! sequentially on one thread.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicIsize, Ordering};
use sync_fifo::{BlockingQueue, MpmcBlockQueue, MpmcListQueue, MpscListQueue};

static LIVE: AtomicIsize = AtomicIsize::new(0);

struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let _ = LIVE.fetch_add(1, Ordering::SeqCst);
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let _ = LIVE.fetch_sub(1, Ordering::SeqCst);
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static ALLOCATOR: CountingAllocator = CountingAllocator;

fn settled<F: FnOnce()>(scenario: &str, f: F) {
    let before = LIVE.load(Ordering::SeqCst);
    f();
    let after = LIVE.load(Ordering::SeqCst);
    assert_eq!(before, after, "{scenario} leaked allocations");
}

#[test]
fn test_every_queue_settles() {
    settled("mpmc list queue, dropped full", || {
        let queue: MpmcListQueue<usize> = MpmcListQueue::new();
        for i in 0..100 {
            queue.enqueue(i);
        }
    });

    settled("mpmc list queue, pooled traffic", || {
        let queue: MpmcListQueue<Box<usize>, 2> = MpmcListQueue::new();
        for i in 0..1_000 {
            queue.enqueue(Box::new(i));
            assert_eq!(queue.try_dequeue().as_deref(), Some(&i));
        }
    });

    settled("mpsc list queue, dropped half-drained", || {
        let queue: MpscListQueue<usize> = MpscListQueue::new();
        for i in 0..100 {
            queue.enqueue(i);
        }
        for _ in 0..50 {
            assert!(queue.try_dequeue().is_some());
        }
    });

    settled("block queue, dropped across block boundaries", || {
        let queue: MpmcBlockQueue<usize> = MpmcBlockQueue::new();
        for i in 0..200 {
            queue.enqueue(i);
        }
    });

    settled("block queue, fully drained", || {
        let queue: MpmcBlockQueue<Box<usize>> = MpmcBlockQueue::new();
        for i in 0..200 {
            queue.enqueue(Box::new(i));
        }
        for i in 0..200 {
            assert_eq!(queue.try_dequeue().as_deref(), Some(&i));
        }
    });

    settled("blocking adapter over list queue", || {
        let queue = BlockingQueue::new(MpmcListQueue::<String>::new());
        queue.enqueue("left behind");
        queue.enqueue(String::from("also left behind"));
    });
}
