//! A block of slots in the block-array queue.
//!
//! The block-array queue amortizes allocation by linking fixed-size blocks of
//! [`BLOCK_CAP`] slots instead of one node per value. Each block covers one
//! [`LAP`] of index positions; the final position of a lap is the "block is
//! full" sentinel rather than a slot, which is why a block holds one slot
//! less than a lap.

use crate::backoff::Backoff;
use crate::pool::ObjectPool;
use crate::slot::{Slot, DESTROY, READ};
use crate::variant::sync::atomic::{AtomicPtr, Ordering};

/// Index positions covered per block.
#[cfg(not(loom))]
pub(crate) const LAP: usize = 64;

/// Index positions covered per block.
///
/// When using loom, we shrink the lap so the model can reach block-boundary
/// interleavings in a reasonable amount of time. This shouldn't impact logic,
/// but allows loom to test more edge cases.
#[cfg(loom)]
pub(crate) const LAP: usize = 4;

/// The maximum number of values a block can hold.
pub(crate) const BLOCK_CAP: usize = LAP - 1;

/// A block in the linked list of the block-array queue.
#[derive(Debug)]
pub(crate) struct Block<T> {
    /// The next block in the linked list, if any.
    pub(crate) next: AtomicPtr<Block<T>>,

    /// The slots of this block.
    pub(crate) slots: [Slot<T>; BLOCK_CAP],
}

impl<T> Block<T> {
    /// New empty blocks are installed every [`BLOCK_CAP`] enqueues. Copying a
    /// constant keeps that cheap.
    #[cfg(not(loom))]
    const UNINIT: Block<T> = Self {
        next: AtomicPtr::new(std::ptr::null_mut()),
        slots: [Slot::UNINIT; BLOCK_CAP],
    };

    /// Creates an empty block.
    #[cfg(not(loom))]
    pub(crate) fn new() -> Self {
        Self::UNINIT
    }

    // See the note on `Slot::new`: loom cannot model constants, so the slot
    // array is built through `Default` instead.
    #[cfg(loom)]
    pub(crate) fn new() -> Self {
        Self {
            next: AtomicPtr::new(std::ptr::null_mut()),
            slots: Default::default(),
        }
    }

    /// Waits until the next block is published.
    ///
    /// Consumers call this at the end of a block; the producer that filled
    /// the last slot is installing the successor concurrently.
    pub(crate) fn wait_next(&self) -> *mut Block<T> {
        let backoff = Backoff::new();
        loop {
            let next = self.next.load(Ordering::Acquire);
            if !next.is_null() {
                return next;
            }
            backoff.snooze();
        }
    }

    /// Marks the slots below `count` with [`DESTROY`] and frees the block once
    /// every slot has been read.
    ///
    /// The slot at `count` itself needs no marker: its consumer is the one
    /// that began the teardown. Walking downward, a slot whose `READ` bit is
    /// still clear belongs to a consumer that has not finished reading; that
    /// consumer observes the freshly set `DESTROY` bit and inherits the rest
    /// of the teardown, so the walk stops there.
    ///
    /// # Safety
    ///
    /// `block` must be a block of this queue that every consumer other than
    /// the ones hand-over participating in the teardown has moved past.
    pub(crate) unsafe fn destroy<const N: usize>(
        block: *mut Block<T>,
        count: usize,
        pool: &ObjectPool<Block<T>, N>,
    ) {
        for i in (0..count).rev() {
            let slot = unsafe { (*block).slots.get_unchecked(i) };

            if slot.state.load(Ordering::Acquire) & READ == 0
                && slot.state.fetch_or(DESTROY, Ordering::AcqRel) & READ == 0
            {
                // A thread is still reading from the slot; it will continue
                // the teardown of the block.
                return;
            }
        }

        // Every slot has been read, the block can be released.
        unsafe { pool.dealloc(block) };
    }
}
