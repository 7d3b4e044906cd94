//! The uniform interface shared by the queues of this crate.

/// A concurrent FIFO queue: unconditional enqueue, non-blocking dequeue.
///
/// Every queue in this crate implements this trait with the same semantics:
/// `enqueue` always succeeds (the queues are unbounded) and `try_dequeue`
/// returns `None` when the queue was empty at some point during the call.
/// Adapters like [`BlockingQueue`] are generic over it.
///
/// [`BlockingQueue`]: crate::BlockingQueue
pub trait FifoQueue {
    /// The type of the enqueued values.
    type Item;

    /// Appends `item` at the tail of the queue.
    fn enqueue(&self, item: Self::Item);

    /// Removes and returns the oldest value, or `None` if the queue appears
    /// empty.
    fn try_dequeue(&self) -> Option<Self::Item>;

    /// Reports whether the queue operates without locks on the current
    /// platform.
    fn is_lock_free(&self) -> bool;
}
