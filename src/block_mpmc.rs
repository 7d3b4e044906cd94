//! A lock-free multi-producer multi-consumer unbounded block-array queue.

use crate::backoff::Backoff;
use crate::block::{Block, BLOCK_CAP, LAP};
use crate::cache_pad::CachePad;
use crate::fifo::FifoQueue;
use crate::pool::ObjectPool;
use crate::slot::{DESTROY, READ, WRITE};
use crate::variant::sync::atomic::{fence, AtomicPtr, AtomicUsize, Ordering};
use crate::variant::sync::Arc;

use std::fmt;
use std::mem::{self, MaybeUninit};

/// How many lower bits of an index are reserved for metadata.
const SHIFT: usize = 1;

/// Metadata bit of the head index: at least one block follows the current one.
///
/// Knowing that a successor exists lets a dequeue skip loading the tail to
/// check for emptiness, so head and tail are not pulled into the same cache
/// transaction on every pop.
const HAS_NEXT: usize = 1;

/// A lock-free multi-producer multi-consumer unbounded block-array queue.
///
/// Values live in fixed-size blocks of 63 slots chained through atomic `next`
/// pointers, so one allocation is amortized over 63 enqueues and consecutive
/// values share cache lines. Producers and consumers each advance a separate
/// index counter with a single compare-and-swap; a per-slot state machine
/// hands the teardown of a drained block to whichever thread touches it last.
///
/// A failed dequeue race reports `None` instead of retrying, like a failed
/// steal: the caller decides whether to try again. Under contention a `None`
/// therefore does not prove the queue was empty.
///
/// `POOL_SIZE` selects how many freed blocks the queue caches; the default
/// of 2 covers the steady-state alternation between the filling and the
/// draining block.
///
/// Handles are cheap clones sharing one queue; the queue tears down when the
/// last handle drops.
///
/// # Examples
///
/// ```
/// use sync_fifo::MpmcBlockQueue;
///
/// let queue: MpmcBlockQueue<usize> = MpmcBlockQueue::new();
///
/// for i in 0..128 {
///     queue.enqueue(i);
/// }
///
/// for i in 0..128 {
///     assert_eq!(queue.try_dequeue(), Some(i));
/// }
///
/// assert_eq!(queue.try_dequeue(), None);
/// ```
pub struct MpmcBlockQueue<T, const POOL_SIZE: usize = 2> {
    inner: Arc<Inner<T, POOL_SIZE>>,
}

impl<T, const POOL_SIZE: usize> MpmcBlockQueue<T, POOL_SIZE> {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new()),
        }
    }

    /// Appends `value` at the tail of the queue.
    pub fn enqueue(&self, value: T) {
        self.inner.push(value);
    }

    /// Removes and returns the oldest value, or `None` if the queue appears
    /// empty.
    ///
    /// Losing a race against another consumer also returns `None`; callers
    /// that must distinguish retry in a loop.
    pub fn try_dequeue(&self) -> Option<T> {
        self.inner.pop()
    }

    /// Dequeues until the queue is observably empty.
    pub fn clear(&self) {
        while !self.inner.is_empty() {
            let _ = self.inner.pop();
        }
    }

    /// Reports whether the atomics backing this queue are lock-free on the
    /// current platform.
    pub fn is_lock_free(&self) -> bool {
        cfg!(target_has_atomic = "ptr")
    }
}

impl<T, const POOL_SIZE: usize> Default for MpmcBlockQueue<T, POOL_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const POOL_SIZE: usize> Clone for MpmcBlockQueue<T, POOL_SIZE> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, const POOL_SIZE: usize> fmt::Debug for MpmcBlockQueue<T, POOL_SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpmcBlockQueue").finish_non_exhaustive()
    }
}

impl<T, const POOL_SIZE: usize> FifoQueue for MpmcBlockQueue<T, POOL_SIZE> {
    type Item = T;

    fn enqueue(&self, item: T) {
        MpmcBlockQueue::enqueue(self, item);
    }

    fn try_dequeue(&self) -> Option<T> {
        MpmcBlockQueue::try_dequeue(self)
    }

    fn is_lock_free(&self) -> bool {
        MpmcBlockQueue::is_lock_free(self)
    }
}

/// One end of the queue.
#[derive(Debug)]
struct Cursor<T> {
    /// The index of the next slot, shifted left by [`SHIFT`].
    index: AtomicUsize,

    /// The block the index currently runs through.
    block: AtomicPtr<Block<T>>,
}

struct Inner<T, const POOL_SIZE: usize> {
    /// The dequeue end.
    head: CachePad<Cursor<T>>,

    /// The enqueue end.
    tail: CachePad<Cursor<T>>,

    pool: ObjectPool<Block<T>, POOL_SIZE>,
}

unsafe impl<T: Send, const POOL_SIZE: usize> Send for Inner<T, POOL_SIZE> {}
unsafe impl<T: Send, const POOL_SIZE: usize> Sync for Inner<T, POOL_SIZE> {}

impl<T, const POOL_SIZE: usize> Inner<T, POOL_SIZE> {
    fn new() -> Self {
        let pool = ObjectPool::new();
        let first_block = pool.alloc(Block::new());

        Self {
            head: CachePad::new(Cursor {
                index: AtomicUsize::new(0),
                block: AtomicPtr::new(first_block),
            }),
            tail: CachePad::new(Cursor {
                index: AtomicUsize::new(0),
                block: AtomicPtr::new(first_block),
            }),
            pool,
        }
    }

    fn push(&self, value: T) {
        let backoff = Backoff::new();
        let mut tail = self.tail.index.load(Ordering::Acquire);
        let mut block = self.tail.block.load(Ordering::Acquire);
        let mut next_block: Option<PreparedBlock<'_, T, POOL_SIZE>> = None;

        loop {
            let offset = (tail >> SHIFT) % LAP;

            // The block is full. The producer that claimed the last slot is
            // installing the next block; wait for it and reload the cursor.
            if offset == BLOCK_CAP {
                backoff.snooze();
                tail = self.tail.index.load(Ordering::Acquire);
                block = self.tail.block.load(Ordering::Acquire);
                continue;
            }

            // About to claim the last slot: allocate the next block up front,
            // outside the index race, so the window during which every other
            // producer waits at `offset == BLOCK_CAP` stays as short as
            // possible. If the claim below goes to someone else the prepared
            // block drops back into the pool.
            if offset + 1 == BLOCK_CAP && next_block.is_none() {
                next_block = Some(PreparedBlock::alloc(&self.pool));
            }

            let new_tail = tail + (1 << SHIFT);

            match self.tail.index.compare_exchange_weak(
                tail,
                new_tail,
                Ordering::SeqCst,
                Ordering::Acquire,
            ) {
                Ok(_) => unsafe {
                    // Claimed the last slot: install the prepared block and
                    // move the tail past the full-block sentinel position
                    // before publishing the link for waiting consumers.
                    if offset + 1 == BLOCK_CAP {
                        debug_assert!(next_block.is_some());
                        if let Some(prepared) = next_block.take() {
                            let next = prepared.into_raw();
                            let next_index = new_tail.wrapping_add(1 << SHIFT);

                            self.tail.block.store(next, Ordering::Release);
                            self.tail.index.store(next_index, Ordering::Release);
                            (*block).next.store(next, Ordering::Release);
                        }
                    }

                    // The slot is ours: store the value, then publish it.
                    let slot = (*block).slots.get_unchecked(offset);
                    slot.value.with_mut(|p| p.write(MaybeUninit::new(value)));
                    let _ = slot.state.fetch_or(WRITE, Ordering::Release);

                    return;
                },
                Err(current) => {
                    tail = current;
                    block = self.tail.block.load(Ordering::Acquire);
                    backoff.spin();
                }
            }
        }
    }

    fn pop(&self) -> Option<T> {
        let backoff = Backoff::new();
        let mut head = self.head.index.load(Ordering::Acquire);
        let mut block = self.head.block.load(Ordering::Acquire);

        // At the end of a block the head waits for the next block to be
        // installed, exactly like the tail does.
        let offset = loop {
            let offset = (head >> SHIFT) % LAP;
            if offset != BLOCK_CAP {
                break offset;
            }
            backoff.snooze();
            head = self.head.index.load(Ordering::Acquire);
            block = self.head.block.load(Ordering::Acquire);
        };

        let mut new_head = head + (1 << SHIFT);

        if new_head & HAS_NEXT == 0 {
            // Order this head read against the tail read of concurrent
            // pushes, then check whether anything is left to take.
            fence(Ordering::SeqCst);
            let tail = self.tail.index.load(Ordering::Relaxed);

            if head >> SHIFT == tail >> SHIFT {
                return None;
            }

            // Head and tail sit in different blocks, so the advanced head
            // already has a successor block and later pops can skip the
            // emptiness check.
            if (head >> SHIFT) / LAP != (tail >> SHIFT) / LAP {
                new_head |= HAS_NEXT;
            }
        }

        // Claim the slot. A lost race reports empty instead of retrying;
        // the winner is making progress, and the caller chooses whether to
        // come back.
        if self
            .head
            .index
            .compare_exchange_weak(head, new_head, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }

        unsafe {
            // Took the last slot: move the head cursor to the next block,
            // carrying the metadata bit over if that block already has a
            // successor of its own.
            if offset + 1 == BLOCK_CAP {
                let next = (*block).wait_next();
                let mut next_index = (new_head & !HAS_NEXT).wrapping_add(1 << SHIFT);
                if !(*next).next.load(Ordering::Relaxed).is_null() {
                    next_index |= HAS_NEXT;
                }

                self.head.block.store(next, Ordering::Release);
                self.head.index.store(next_index, Ordering::Release);
            }

            let slot = (*block).slots.get_unchecked(offset);
            slot.wait_write();
            let value = slot.value.with(|p| p.read().assume_init());

            // Tear the block down if this was its last slot, or if a passing
            // consumer scheduled the teardown while we were still reading.
            if offset + 1 == BLOCK_CAP {
                Block::destroy(block, offset, &self.pool);
            } else if slot.state.fetch_or(READ, Ordering::AcqRel) & DESTROY != 0 {
                Block::destroy(block, offset, &self.pool);
            }

            Some(value)
        }
    }

    fn is_empty(&self) -> bool {
        let head = self.head.index.load(Ordering::SeqCst);
        let tail = self.tail.index.load(Ordering::SeqCst);
        head >> SHIFT == tail >> SHIFT
    }
}

impl<T, const POOL_SIZE: usize> Drop for Inner<T, POOL_SIZE> {
    fn drop(&mut self) {
        // Drain whatever is still queued. `pop` may report `None` on a
        // spurious exchange failure, so the loop re-checks the positions
        // instead of trusting a single empty answer.
        while !self.is_empty() {
            let _ = self.pop();
        }

        // Head and tail meet in the one remaining block.
        let block = self.head.block.load(Ordering::Acquire);
        unsafe { self.pool.dealloc(block) };
    }
}

/// A block allocated ahead of the tail race.
///
/// Producers allocate the successor block before competing for the last slot
/// of the current one. The loser's allocation must not leak, so the prepared
/// block returns itself to the pool unless it is consumed with
/// [`PreparedBlock::into_raw`].
struct PreparedBlock<'a, T, const N: usize> {
    block: *mut Block<T>,
    pool: &'a ObjectPool<Block<T>, N>,
}

impl<'a, T, const N: usize> PreparedBlock<'a, T, N> {
    fn alloc(pool: &'a ObjectPool<Block<T>, N>) -> Self {
        Self {
            block: pool.alloc(Block::new()),
            pool,
        }
    }

    fn into_raw(self) -> *mut Block<T> {
        let block = self.block;
        mem::forget(self);
        block
    }
}

impl<T, const N: usize> Drop for PreparedBlock<'_, T, N> {
    fn drop(&mut self) {
        unsafe { self.pool.dealloc(self.block) };
    }
}
