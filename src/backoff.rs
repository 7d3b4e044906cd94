//! Exponential backoff for spin loops.
//!
//! Retrying a contended atomic operation in a tight loop wastes bus bandwidth
//! and keeps the cache line ping-ponging between cores. [`Backoff`] ramps the
//! wait up in powers of two: a few pause instructions at first, then yielding
//! the time slice to the OS scheduler, and finally reporting through
//! [`Backoff::is_completed`] that spinning stopped being useful and the caller
//! should park on a real synchronization primitive instead.
//!
//! Two entry points cover the two kinds of waiting:
//!
//! - [`Backoff::spin`] when the current thread can retry its own operation
//!   (e.g. a failed compare-and-swap).
//! - [`Backoff::snooze`] when the current thread waits for another thread to
//!   make progress (e.g. a slot that has not been written yet).

use std::cell::Cell;

#[cfg(not(loom))]
use std::hint;

/// Steps with a pause-instruction loop; `spin` never grows past this.
const SPIN_LIMIT: u32 = 6;

/// Steps after which `snooze` reports that blocking is preferable.
const YIELD_LIMIT: u32 = 10;

/// Performs exponential backoff in spin loops.
///
/// Each backoff step takes roughly twice as long as the previous one. The
/// state is a plain counter in a [`Cell`], so a `Backoff` belongs to exactly
/// one thread and is created fresh for every operation.
///
/// # Examples
///
/// Waiting for an atomic flag to flip:
///
/// ```
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use sync_fifo::Backoff;
///
/// fn spin_wait(ready: &AtomicBool) {
///     let backoff = Backoff::new();
///     while !ready.load(Ordering::Acquire) {
///         backoff.snooze();
///     }
/// }
/// # let ready = AtomicBool::new(true);
/// # spin_wait(&ready);
/// ```
#[derive(Debug)]
pub struct Backoff {
    step: Cell<u32>,
}

impl Backoff {
    /// Creates a backoff in its initial state.
    pub fn new() -> Self {
        Self { step: Cell::new(0) }
    }

    /// Clears the state, restarting the ramp from the shortest wait.
    pub fn reset(&self) {
        self.step.set(0);
    }

    /// Backs off after a failed attempt at an operation this thread will
    /// retry itself.
    ///
    /// Executes `2^step` pause instructions, capped at `2^6`, and never
    /// yields the time slice: the retry does not depend on another thread
    /// being scheduled.
    pub fn spin(&self) {
        #[cfg(not(loom))]
        for _ in 0..1u32 << self.step.get().min(SPIN_LIMIT) {
            hint::spin_loop();
        }

        if self.step.get() <= SPIN_LIMIT {
            self.step.set(self.step.get() + 1);
        }
    }

    /// Backs off while waiting for another thread to make progress.
    ///
    /// Starts with pause-instruction loops like [`Backoff::spin`] and, once
    /// the step count passes the spin limit, yields the time slice so the
    /// thread being waited for can run. Callers that can block should switch
    /// to a real wait once [`Backoff::is_completed`] returns `true`.
    pub fn snooze(&self) {
        if self.step.get() <= SPIN_LIMIT {
            #[cfg(not(loom))]
            for _ in 0..1u32 << self.step.get() {
                hint::spin_loop();
            }

            // Loom's scheduler is, by design, not fair. The pause loop must
            // become an explicit yield so the model can schedule the thread
            // we are waiting for.
            #[cfg(loom)]
            crate::variant::thread::yield_now();
        } else {
            crate::variant::thread::yield_now();
        }

        if self.step.get() <= YIELD_LIMIT {
            self.step.set(self.step.get() + 1);
        }
    }

    /// Returns `true` once backing off has run its course and blocking the
    /// thread on a condition variable (or similar) is advised.
    ///
    /// Becomes `true` after `YIELD_LIMIT + 1` calls to [`Backoff::snooze`]
    /// from a fresh or [reset] state.
    ///
    /// [reset]: Backoff::reset
    pub fn is_completed(&self) -> bool {
        self.step.get() > YIELD_LIMIT
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
