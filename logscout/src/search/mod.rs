//! This module implements the concurrent scanning engine.
//!
//! # Threads
//!
//! One scan runs on `1 + N` scoped OS threads:
//!
//! 1. **Walker** ([`walker::Walker`]): the single producer. Walks the tree iteratively and
//!    pushes every qualifying file onto the [`queue::WorkQueue`]. When traversal ends (or the
//!    walker unwinds) the queue is marked done exactly once.
//!
//! 2. **Workers** ([`worker::Worker`]): `N` consumers numbered from 1. Each one loops
//!    `Idle -> Processing -> Idle` and only stops when the queue is both empty and done:
//!    ```rust,ignore
//!    match queue.try_take() {
//!        Take::Ready(path) => process(path),
//!        Take::Pending => queue.wait_for_item_or_done(),
//!        Take::Drained => break,
//!    }
//!    ```
//!
//! # Shared State
//!
//! Everything the threads share lives on one [`engine::ScanContext`] that is created per run
//! and passed by reference. There are exactly three synchronization points:
//!
//! - the work queue (mutex + condition variable),
//! - the output file (the [`writer::ResultWriter`] mutex, one batch at a time),
//! - the found flag (an atomic that only goes false -> true during a run).
//!
//! # Ordering
//!
//! Files finish in whatever order the scheduler produces. Within a file, matches keep their
//! source order because a worker collects the whole file before handing the batch over, so
//! one file's lines are never interleaved with another's.
//!
//! # Cancellation
//!
//! A [`CancelToken`] is checked by the walker on every entry and by each worker before it takes
//! the next file. A file already being searched is finished and written as a whole.

pub mod cancel;
pub mod engine;
pub mod matcher;
pub mod processor;
pub mod queue;
pub mod walker;
pub mod worker;
pub mod writer;

pub use cancel::CancelToken;
pub use engine::{scan, scan_with_cancel, ScanContext};
pub use matcher::LineMatcher;
pub use processor::FileProcessor;
pub use queue::{Take, WorkQueue};
pub use writer::ResultWriter;
