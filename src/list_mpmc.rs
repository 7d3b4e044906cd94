//! A lock-free multi-producer multi-consumer unbounded linked-list queue.

use crate::backoff::Backoff;
use crate::cache_pad::CachePad;
use crate::fifo::FifoQueue;
use crate::node::Node;
use crate::pool::ObjectPool;
use crate::variant::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
use crate::variant::sync::Arc;

use std::fmt;
use std::ptr;

/// The lock tag in bit 0 of the head word: set while a dequeue is in progress.
const TAG: usize = 1;

/// A lock-free multi-producer multi-consumer unbounded linked-list queue.
///
/// Values live in individually allocated nodes chained through atomic `next`
/// pointers. Producers contend on a single compare-and-swap of the tail;
/// consumers serialize through a one-bit lock carried in the head pointer
/// itself, so a dequeue is exclusive among dequeuers but never blocks an
/// enqueue.
///
/// `POOL_SIZE` selects how many freed nodes the queue caches instead of
/// returning them to the allocator. The default of 0 is a pure allocator
/// pass-through.
///
/// Handles are cheap clones sharing one queue; the queue tears down when the
/// last handle drops.
///
/// # Examples
///
/// ```
/// use sync_fifo::MpmcListQueue;
///
/// let queue: MpmcListQueue<u32> = MpmcListQueue::new();
///
/// queue.enqueue(1);
/// queue.enqueue(2);
///
/// assert_eq!(queue.try_dequeue(), Some(1));
/// assert_eq!(queue.try_dequeue(), Some(2));
/// assert_eq!(queue.try_dequeue(), None);
/// ```
pub struct MpmcListQueue<T, const POOL_SIZE: usize = 0> {
    inner: Arc<Inner<T, POOL_SIZE>>,
}

impl<T, const POOL_SIZE: usize> MpmcListQueue<T, POOL_SIZE> {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new()),
        }
    }

    /// Appends `value` at the tail of the queue.
    pub fn enqueue(&self, value: T) {
        self.inner.enqueue(value);
    }

    /// Removes and returns the oldest value, or `None` if the queue is empty.
    pub fn try_dequeue(&self) -> Option<T> {
        self.inner.try_dequeue()
    }

    /// Dequeues until the queue is observably empty.
    pub fn clear(&self) {
        while self.inner.try_dequeue().is_some() {}
    }

    /// Reports whether the atomics backing this queue are lock-free on the
    /// current platform.
    pub fn is_lock_free(&self) -> bool {
        cfg!(target_has_atomic = "ptr")
    }
}

impl<T, const POOL_SIZE: usize> Default for MpmcListQueue<T, POOL_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const POOL_SIZE: usize> Clone for MpmcListQueue<T, POOL_SIZE> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, const POOL_SIZE: usize> fmt::Debug for MpmcListQueue<T, POOL_SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpmcListQueue").finish_non_exhaustive()
    }
}

impl<T, const POOL_SIZE: usize> FifoQueue for MpmcListQueue<T, POOL_SIZE> {
    type Item = T;

    fn enqueue(&self, item: T) {
        MpmcListQueue::enqueue(self, item);
    }

    fn try_dequeue(&self) -> Option<T> {
        MpmcListQueue::try_dequeue(self)
    }

    fn is_lock_free(&self) -> bool {
        MpmcListQueue::is_lock_free(self)
    }
}

struct Inner<T, const POOL_SIZE: usize> {
    /// The sentinel node address, with the dequeue lock in bit 0.
    head: CachePad<AtomicUsize>,

    /// The most recently linked node; null once the queue started tearing down.
    tail: CachePad<AtomicPtr<Node<T>>>,

    pool: ObjectPool<Node<T>, POOL_SIZE>,
}

unsafe impl<T: Send, const POOL_SIZE: usize> Send for Inner<T, POOL_SIZE> {}
unsafe impl<T: Send, const POOL_SIZE: usize> Sync for Inner<T, POOL_SIZE> {}

impl<T, const POOL_SIZE: usize> Inner<T, POOL_SIZE> {
    fn new() -> Self {
        let pool = ObjectPool::new();
        let sentinel = pool.alloc(Node::sentinel());

        Self {
            head: CachePad::new(AtomicUsize::new(sentinel as usize)),
            tail: CachePad::new(AtomicPtr::new(sentinel)),
            pool,
        }
    }

    fn enqueue(&self, value: T) {
        let node = self.pool.alloc(Node::with_value(value));
        debug_assert_eq!(node as usize & TAG, 0);

        let backoff = Backoff::new();
        let mut tail = self.tail.load(Ordering::Acquire);

        loop {
            // A null tail means the queue is tearing down and will never
            // accept another node.
            if tail.is_null() {
                unsafe { self.pool.dealloc(node) };
                return;
            }

            match self
                .tail
                .compare_exchange_weak(tail, node, Ordering::AcqRel, Ordering::Acquire)
            {
                // The tail now points to our node, and `prev` is the node it
                // pointed to before.
                //
                // Memory safety: until `prev.next` is set below, `prev` cannot
                // be freed. The head never advances past a node whose `next`
                // is null, and the queue itself is only destroyed once head
                // and tail meet.
                //
                // ABA safety: only the pointer identity of `prev` matters. Any
                // enqueue that moved the tail in between must have published
                // its predecessor's `next` first, which is impossible for
                // `prev` while its `next` is still null, so a matching pointer
                // value really is the same live tail node.
                Ok(prev) => unsafe {
                    (*prev).next.store(node, Ordering::Release);
                    return;
                },
                Err(current) => {
                    tail = current;
                    backoff.spin();
                }
            }
        }
    }

    fn try_dequeue(&self) -> Option<T> {
        let backoff = Backoff::new();
        let mut ptr = self.head.load(Ordering::Acquire) & !TAG;

        // Acquire the dequeue lock: flip bit 0 of the head word from 0 to 1
        // while keeping the pointer half unchanged. Holding the tag is the
        // exclusive right to advance the head, which is also what makes it
        // safe to free the old sentinel afterwards.
        while let Err(current) =
            self.head
                .compare_exchange_weak(ptr, ptr | TAG, Ordering::AcqRel, Ordering::Acquire)
        {
            ptr = current & !TAG;
            backoff.snooze();
        }

        let sentinel = ptr as *mut Node<T>;

        unsafe {
            let next = (*sentinel).next.load(Ordering::Acquire);

            if next.is_null() {
                // Nothing to take: put the untagged pointer back to release
                // the lock.
                self.head.store(ptr, Ordering::Release);
                return None;
            }

            // Take the value before publishing the new head, so no later
            // dequeuer can free `next` while we still read from it.
            let value = (*next).value.take();

            self.head.store(next as usize, Ordering::Release);
            self.pool.dealloc(sentinel);

            value
        }
    }
}

impl<T, const POOL_SIZE: usize> Drop for Inner<T, POOL_SIZE> {
    fn drop(&mut self) {
        // Steal the tail. Enqueues racing with teardown observe the null and
        // release their freshly allocated node instead of linking it.
        let mut tail = self.tail.load(Ordering::Acquire);
        while let Err(current) = self.tail.compare_exchange_weak(
            tail,
            ptr::null_mut(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            tail = current;
        }

        // Drain every remaining value. The stolen tail node ends up as the
        // final sentinel.
        while self.head.load(Ordering::Acquire) & !TAG != tail as usize {
            while self.try_dequeue().is_some() {}
        }

        unsafe { self.pool.dealloc(tail) };
    }
}
