//! A bounded cache of heap allocations for the queues' internal nodes and blocks.
//!
//! Queues allocate one node (or block) per enqueue batch and free it once the
//! contents are consumed. Under steady traffic the same handful of objects is
//! allocated and freed over and over, so the pool keeps up to `N` freed
//! allocations in an array of atomic pointers and hands them back out before
//! touching the global allocator.
//!
//! The pool caches raw memory, never live values: [`ObjectPool::dealloc`] runs
//! the destructor before caching and [`ObjectPool::alloc`] writes a fresh value
//! into whatever memory it returns. Relaxed ordering on the cache slots is
//! enough because of that. The memory holds no data anyone may observe, and
//! the construction of the new value is published by the queue-level
//! synchronization of whoever links the node into a queue.

use crate::variant::sync::atomic::{AtomicPtr, Ordering};

use std::fmt;
use std::mem::MaybeUninit;
use std::ptr;

/// A fixed-capacity cache of `N` freed `T` allocations.
///
/// With `N = 0` every call passes straight through to the global allocator.
/// Each non-null cache slot owns exactly one destructed allocation; null
/// slots own nothing.
pub struct ObjectPool<T, const N: usize> {
    cache: [AtomicPtr<T>; N],
}

impl<T, const N: usize> ObjectPool<T, N> {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self {
            cache: std::array::from_fn(|_| AtomicPtr::new(ptr::null_mut())),
        }
    }

    /// Returns a pointer to a live object holding `value`.
    ///
    /// Scans the cache slots in order and steals the first non-null one with
    /// a relaxed compare-and-swap; whoever wins the exchange owns the memory.
    /// If every slot is empty the object is heap-allocated instead.
    pub fn alloc(&self, value: T) -> *mut T {
        for slot in &self.cache {
            let cached = slot.load(Ordering::Relaxed);
            if !cached.is_null()
                && slot
                    .compare_exchange(cached, ptr::null_mut(), Ordering::Relaxed, Ordering::Relaxed)
                    .is_ok()
            {
                // The cached memory holds no live value; construct in place.
                unsafe { cached.write(value) };
                return cached;
            }
        }

        Box::into_raw(Box::new(value))
    }

    /// Destroys the object behind `ptr` and recycles its memory.
    ///
    /// The destructor runs immediately. The memory is then offered to the
    /// first null cache slot; if the cache is full it goes back to the heap.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`ObjectPool::alloc`] of a pool with the same `T`
    /// and must not be used afterwards.
    pub unsafe fn dealloc(&self, ptr: *mut T) {
        unsafe { ptr::drop_in_place(ptr) };

        for slot in &self.cache {
            if slot.load(Ordering::Relaxed).is_null()
                && slot
                    .compare_exchange(ptr::null_mut(), ptr, Ordering::Relaxed, Ordering::Relaxed)
                    .is_ok()
            {
                return;
            }
        }

        unsafe { release_memory(ptr) };
    }
}

impl<T, const N: usize> Default for ObjectPool<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Drop for ObjectPool<T, N> {
    fn drop(&mut self) {
        // Exclusive access here: no compare-and-swap dance needed to empty
        // the cache, and the cached memory holds destructed objects only.
        for slot in &self.cache {
            let cached = slot.load(Ordering::Relaxed);
            if !cached.is_null() {
                unsafe { release_memory(cached) };
            }
        }
    }
}

impl<T, const N: usize> fmt::Debug for ObjectPool<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool").finish_non_exhaustive()
    }
}

/// Returns memory obtained from [`ObjectPool::alloc`] to the heap without
/// running a destructor. `Box<MaybeUninit<T>>` has the same layout as the
/// `Box<T>` the memory came from.
unsafe fn release_memory<T>(ptr: *mut T) {
    drop(unsafe { Box::from_raw(ptr.cast::<MaybeUninit<T>>()) });
}
