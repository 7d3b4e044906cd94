//! Holds one value of the block-array queue.
//!
//! The [`Slot`]'s state uses below bit flags to report its progress:
//!
//! ```txt
//! INITIAL 0b00000000
//! WRITE   0b00000001 -> Added after a successful write of the value into the slot.
//! READ    0b00000010 -> Added from the time a thread starts to read the value.
//! DESTROY 0b00000100 -> Added when a teardown of the slot's block has been scheduled.
//! ```
//!
//! The state only moves forward, resulting in bit flags being added in below
//! order:
//!
//! ```txt
//! INITIAL            0b00000000
//! INITIAL -> WRITE   0b00000001
//! WRITE   -> READ    0b00000011
//! READ    -> DESTROY 0b00000111
//! ```
//!
//! A `DESTROY` bit without `READ` is the one exception: a consumer clearing
//! the block leaves it as a marker on a slot whose reader has not finished,
//! and that reader then inherits the teardown of the whole block.
//!
//! All three bits share one atomic word. Splitting them would break the race
//! between the last reader of a block and the consumer tearing it down.
//!
//! [`Block`]: crate::block::Block

use crate::backoff::Backoff;
use crate::variant::cell::UnsafeCell;
use crate::variant::sync::atomic::{AtomicU32, Ordering};

use std::mem::MaybeUninit;

/// Holds one value of the block-array queue.
#[derive(Debug)]
pub(crate) struct Slot<T> {
    /// The value, live between the `WRITE` and `READ` transitions.
    pub(crate) value: UnsafeCell<MaybeUninit<T>>,

    /// The state bits of the slot.
    pub(crate) state: AtomicU32,
}

impl<T> Slot<T> {
    /// When creating a new [`Block`], [`BLOCK_CAP`] uninitialized slots are
    /// added to its container. Using a constant keeps that initialization
    /// cheap.
    ///
    /// [`Block`]: crate::block::Block
    /// [`BLOCK_CAP`]: crate::block::BLOCK_CAP
    #[cfg(not(loom))]
    pub(crate) const UNINIT: Slot<T> = Self {
        value: UnsafeCell::new(MaybeUninit::uninit()),
        state: AtomicU32::new(0),
    };

    // Loom model checking can't work with constants as it needs to keep
    // track of the initialized items. In loom, `AtomicU32::new` is therefore
    // not a `const fn`, so the container is built from `Default` instead.
    #[cfg(loom)]
    pub(crate) fn new() -> Self {
        Self {
            value: UnsafeCell::new(MaybeUninit::uninit()),
            state: AtomicU32::new(0),
        }
    }

    /// Waits until a value is written into the slot.
    ///
    /// A consumer can win the head index before the producer that won the
    /// matching tail index has stored its value; this bridges that gap.
    pub(crate) fn wait_write(&self) {
        let backoff = Backoff::new();
        while self.state.load(Ordering::Acquire) & WRITE == 0 {
            backoff.snooze();
        }
    }
}

#[cfg(loom)]
impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bit flag added once the slot holds a value.
pub(crate) const WRITE: u32 = 1;

/// Bit flag added once a thread started reading the value out.
pub(crate) const READ: u32 = 2;

/// Bit flag added once teardown of the enclosing block is scheduled.
pub(crate) const DESTROY: u32 = 4;
