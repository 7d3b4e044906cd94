#![deny(
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    missing_docs,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_op_in_unsafe_fn,
    unused_extern_crates,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    rust_2018_idioms
)]

//! Unbounded lock-free FIFO queues for producer/consumer decoupling.
//!
//! Three lock-free cores cover the common access disciplines, and one adapter
//! turns any of them into a blocking queue:
//!
//! - [`MpmcListQueue`]: linked-list queue, any number of producers and
//!   consumers, one allocation per value.
//! - [`MpscListQueue`]: linked-list queue with a single-consumer fast path.
//! - [`MpmcBlockQueue`]: block-array queue, any number of producers and
//!   consumers, one allocation per 63 values.
//! - [`BlockingQueue`]: wraps any [`FifoQueue`] with a waiting `dequeue`.
//!
//! The building blocks the queues are made of are exported as well:
//! [`Backoff`] for contention loops, [`CachePad`] against false sharing and
//! [`ObjectPool`] for recycling node allocations.
//!
//! Queue handles are cheap clones sharing one underlying queue, so moving a
//! handle into each thread is the whole setup.
//!
//! # Examples
//!
//! Single producer, single consumer:
//!
//! ```
//! use sync_fifo::MpmcBlockQueue;
//!
//! const COUNT: usize = 1_000;
//! let queue: MpmcBlockQueue<usize> = MpmcBlockQueue::new();
//!
//! for i in 0..COUNT {
//!     queue.enqueue(i);
//! }
//!
//! for i in 0..COUNT {
//!     assert_eq!(queue.try_dequeue(), Some(i));
//! }
//!
//! assert!(queue.try_dequeue().is_none());
//! ```
//!
//! Multi producer, single consumer:
//!
//! ```
//! use std::thread;
//! use sync_fifo::MpscListQueue;
//!
//! const COUNT: usize = 1_000;
//! const CONCURRENCY: usize = 4;
//!
//! let queue: MpscListQueue<usize> = MpscListQueue::new();
//!
//! let producers: Vec<_> = (0..CONCURRENCY)
//!     .map(|_| {
//!         let q = queue.clone();
//!         thread::spawn(move || {
//!             for i in 0..COUNT {
//!                 q.enqueue(i);
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for producer in producers {
//!     producer.join().unwrap();
//! }
//!
//! for _ in 0..COUNT * CONCURRENCY {
//!     assert!(queue.try_dequeue().is_some());
//! }
//!
//! assert!(queue.try_dequeue().is_none());
//! ```
//!
//! Multi producer, multi consumer, with consumers retrying until their share
//! arrives:
//!
//! ```
//! use std::thread;
//! use sync_fifo::MpmcBlockQueue;
//!
//! const COUNT: usize = 1_000;
//! const CONCURRENCY: usize = 2;
//!
//! let queue: MpmcBlockQueue<usize> = MpmcBlockQueue::new();
//!
//! let consumers: Vec<_> = (0..CONCURRENCY)
//!     .map(|_| {
//!         let q = queue.clone();
//!         thread::spawn(move || {
//!             for _ in 0..COUNT {
//!                 loop {
//!                     if q.try_dequeue().is_some() {
//!                         break;
//!                     }
//!                     thread::yield_now();
//!                 }
//!             }
//!         })
//!     })
//!     .collect();
//!
//! let producers: Vec<_> = (0..CONCURRENCY)
//!     .map(|_| {
//!         let q = queue.clone();
//!         thread::spawn(move || {
//!             for i in 0..COUNT {
//!                 q.enqueue(i);
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for th in producers.into_iter().chain(consumers) {
//!     th.join().unwrap();
//! }
//!
//! assert!(queue.try_dequeue().is_none());
//! ```
//!
//! Blocking on an empty queue:
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use sync_fifo::{BlockingQueue, MpmcListQueue};
//!
//! let queue = Arc::new(BlockingQueue::new(MpmcListQueue::<String>::new()));
//!
//! let consumer = {
//!     let q = Arc::clone(&queue);
//!     thread::spawn(move || q.dequeue())
//! };
//!
//! queue.enqueue("ping");
//! assert_eq!(consumer.join().unwrap(), "ping");
//! ```
//!
//! # Teardown
//!
//! Dropping the last handle of a queue drains and frees everything still
//! enqueued. Because the drop only ever runs once no other handle exists,
//! there is no way to race a queue's teardown against its use from safe code.

mod backoff;
mod block_mpmc;
mod blocking;
mod cache_pad;
mod fifo;
mod list_mpmc;
mod list_mpsc;
mod pool;

pub(crate) mod block;
pub(crate) mod node;
pub(crate) mod slot;
pub(crate) mod variant;

pub use backoff::Backoff;
pub use block_mpmc::MpmcBlockQueue;
pub use blocking::BlockingQueue;
pub use cache_pad::CachePad;
pub use fifo::FifoQueue;
pub use list_mpmc::MpmcListQueue;
pub use list_mpsc::MpscListQueue;
pub use pool::ObjectPool;
