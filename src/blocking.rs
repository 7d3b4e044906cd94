//! An adapter that layers a blocking dequeue on top of a non-blocking queue.

use crate::fifo::FifoQueue;

use parking_lot::{Condvar, Mutex};

use std::fmt;

/// Wraps any [`FifoQueue`], adding a [`dequeue`] that waits for a value.
///
/// The lock-free queues have no way to wake a sleeping consumer, so the
/// adapter pairs them with a mutex and a condition variable. The mutex only
/// guards the wait itself, never the queue: enqueues and non-blocking
/// dequeues still run lock-free through the inner queue.
///
/// Notification is deliberately coarse. Consumers are anonymous and the inner
/// queue offers no per-value wakeup, so every enqueue notifies all waiters
/// and the ones that find the queue empty go back to sleep.
///
/// [`dequeue`]: BlockingQueue::dequeue
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
/// use std::time::Duration;
/// use sync_fifo::{BlockingQueue, MpmcListQueue};
///
/// let queue = Arc::new(BlockingQueue::new(MpmcListQueue::<i32>::new()));
///
/// let consumer = {
///     let q = Arc::clone(&queue);
///     thread::spawn(move || q.dequeue())
/// };
///
/// thread::sleep(Duration::from_millis(50));
/// queue.enqueue(42);
///
/// assert_eq!(consumer.join().unwrap(), 42);
/// ```
pub struct BlockingQueue<Q: FifoQueue> {
    queue: Q,
    mutex: Mutex<()>,
    waiters: Condvar,
}

impl<Q: FifoQueue> BlockingQueue<Q> {
    /// Wraps `queue` in a blocking adapter.
    pub fn new(queue: Q) -> Self {
        Self {
            queue,
            mutex: Mutex::new(()),
            waiters: Condvar::new(),
        }
    }

    /// Appends a value at the tail of the inner queue and wakes all waiting
    /// consumers.
    ///
    /// Accepts anything convertible into the queue's value type.
    pub fn enqueue<V: Into<Q::Item>>(&self, value: V) {
        self.queue.enqueue(value.into());

        // Notify with the lock held: a consumer between its failed empty
        // check and its wait either has not taken the lock yet (and will
        // re-check the queue under it) or is already waiting (and receives
        // this notification). Either way the value is seen.
        let _guard = self.mutex.lock();
        let _ = self.waiters.notify_all();
    }

    /// Removes and returns the oldest value without blocking, or `None` if
    /// the inner queue appears empty.
    pub fn try_dequeue(&self) -> Option<Q::Item> {
        self.queue.try_dequeue()
    }

    /// Removes and returns the oldest value, waiting for one to be enqueued
    /// if the queue is empty.
    ///
    /// There is no timeout. Callers that need one should poll
    /// [`try_dequeue`](BlockingQueue::try_dequeue) instead.
    pub fn dequeue(&self) -> Q::Item {
        loop {
            if let Some(value) = self.queue.try_dequeue() {
                return value;
            }

            let mut guard = self.mutex.lock();

            // Re-check under the lock: an enqueue may have landed, and
            // notified, after the attempt above.
            if let Some(value) = self.queue.try_dequeue() {
                return value;
            }

            // Spurious wakeups just run the outer loop once more.
            self.waiters.wait(&mut guard);
        }
    }

    /// Returns the wrapped queue, discarding the blocking machinery.
    pub fn into_inner(self) -> Q {
        self.queue
    }
}

impl<Q: FifoQueue + Default> Default for BlockingQueue<Q> {
    fn default() -> Self {
        Self::new(Q::default())
    }
}

impl<Q: FifoQueue> fmt::Debug for BlockingQueue<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingQueue").finish_non_exhaustive()
    }
}
