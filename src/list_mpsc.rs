//! A lock-free multi-producer single-consumer unbounded linked-list queue.

use crate::backoff::Backoff;
use crate::cache_pad::CachePad;
use crate::fifo::FifoQueue;
use crate::node::Node;
use crate::pool::ObjectPool;
use crate::variant::sync::atomic::{AtomicPtr, Ordering};
use crate::variant::sync::Arc;

use std::fmt;
use std::ptr;

/// A lock-free multi-producer single-consumer unbounded linked-list queue.
///
/// The producer side is identical to [`MpmcListQueue`]: any number of threads
/// may enqueue concurrently. The head, however, is a plain pointer owned by
/// the one consumer, so dequeues skip the lock tag entirely.
///
/// # The single-consumer contract
///
/// At most one thread may call [`try_dequeue`] at a time, even if the calls
/// never overlap observable state. Concurrent dequeues on this type are a
/// contract violation with undefined results. Use [`MpmcListQueue`] when
/// consumers cannot be serialized.
///
/// [`MpmcListQueue`]: crate::MpmcListQueue
/// [`try_dequeue`]: MpscListQueue::try_dequeue
///
/// # Examples
///
/// ```
/// use std::thread;
/// use sync_fifo::MpscListQueue;
///
/// let queue: MpscListQueue<usize> = MpscListQueue::new();
///
/// let producers: Vec<_> = (0..4)
///     .map(|_| {
///         let q = queue.clone();
///         thread::spawn(move || {
///             for i in 0..100 {
///                 q.enqueue(i);
///             }
///         })
///     })
///     .collect();
///
/// for producer in producers {
///     producer.join().unwrap();
/// }
///
/// let mut drained = 0;
/// while queue.try_dequeue().is_some() {
///     drained += 1;
/// }
/// assert_eq!(drained, 400);
/// ```
pub struct MpscListQueue<T, const POOL_SIZE: usize = 0> {
    inner: Arc<Inner<T, POOL_SIZE>>,
}

impl<T, const POOL_SIZE: usize> MpscListQueue<T, POOL_SIZE> {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new()),
        }
    }

    /// Appends `value` at the tail of the queue. Safe from any thread.
    pub fn enqueue(&self, value: T) {
        self.inner.enqueue(value);
    }

    /// Removes and returns the oldest value, or `None` if the queue is empty.
    ///
    /// Must only be called by the single consumer; see the type-level
    /// contract.
    pub fn try_dequeue(&self) -> Option<T> {
        self.inner.try_dequeue()
    }

    /// Dequeues until the queue is observably empty. Consumer-only, like
    /// [`try_dequeue`](MpscListQueue::try_dequeue).
    pub fn clear(&self) {
        while self.inner.try_dequeue().is_some() {}
    }

    /// Reports whether the atomics backing this queue are lock-free on the
    /// current platform.
    pub fn is_lock_free(&self) -> bool {
        cfg!(target_has_atomic = "ptr")
    }
}

impl<T, const POOL_SIZE: usize> Default for MpscListQueue<T, POOL_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const POOL_SIZE: usize> Clone for MpscListQueue<T, POOL_SIZE> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, const POOL_SIZE: usize> fmt::Debug for MpscListQueue<T, POOL_SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpscListQueue").finish_non_exhaustive()
    }
}

impl<T, const POOL_SIZE: usize> FifoQueue for MpscListQueue<T, POOL_SIZE> {
    type Item = T;

    fn enqueue(&self, item: T) {
        MpscListQueue::enqueue(self, item);
    }

    fn try_dequeue(&self) -> Option<T> {
        MpscListQueue::try_dequeue(self)
    }

    fn is_lock_free(&self) -> bool {
        MpscListQueue::is_lock_free(self)
    }
}

struct Inner<T, const POOL_SIZE: usize> {
    /// The most recently linked node; null once the queue started tearing down.
    tail: CachePad<AtomicPtr<Node<T>>>,

    /// The sentinel node. Only the consumer moves this, so it carries no tag.
    head: CachePad<AtomicPtr<Node<T>>>,

    pool: ObjectPool<Node<T>, POOL_SIZE>,
}

unsafe impl<T: Send, const POOL_SIZE: usize> Send for Inner<T, POOL_SIZE> {}
unsafe impl<T: Send, const POOL_SIZE: usize> Sync for Inner<T, POOL_SIZE> {}

impl<T, const POOL_SIZE: usize> Inner<T, POOL_SIZE> {
    fn new() -> Self {
        let pool = ObjectPool::new();
        let sentinel = pool.alloc(Node::sentinel());

        Self {
            tail: CachePad::new(AtomicPtr::new(sentinel)),
            head: CachePad::new(AtomicPtr::new(sentinel)),
            pool,
        }
    }

    fn enqueue(&self, value: T) {
        let node = self.pool.alloc(Node::with_value(value));

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
                // Same publication protocol as the MPMC variant: `prev` stays
                // alive until its `next` is set because the head never moves
                // past a node with a null `next`, and the pointer identity of
                // a null-`next` node cannot be recycled in between.
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
        // Only the consumer reads or writes `head`, so the accesses need no
        // ordering beyond the Acquire on `next` that pairs with the
        // producer's Release publication.
        let sentinel = self.head.load(Ordering::Relaxed);

        unsafe {
            let next = (*sentinel).next.load(Ordering::Acquire);

            if next.is_null() {
                return None;
            }

            self.head.store(next, Ordering::Relaxed);
            let value = (*next).value.take();
            self.pool.dealloc(sentinel);

            value
        }
    }
}

impl<T, const POOL_SIZE: usize> Drop for Inner<T, POOL_SIZE> {
    fn drop(&mut self) {
        // Steal the tail so late enqueues release their node instead of
        // linking it, then drain and free the final sentinel.
        let mut tail = self.tail.load(Ordering::Acquire);
        while let Err(current) = self.tail.compare_exchange_weak(
            tail,
            ptr::null_mut(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            tail = current;
        }

        while self.head.load(Ordering::Relaxed) != tail {
            while self.try_dequeue().is_some() {}
        }

        unsafe { self.pool.dealloc(tail) };
    }
}
