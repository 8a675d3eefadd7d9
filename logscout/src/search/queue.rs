//! Work queue shared by the walker and the workers.
//!
//! The pending paths and the "traversal complete" flag live behind one mutex, and every
//! decision a worker makes ("take a path", "wait", "exit") is made while holding it. A push or
//! a completion always broadcasts on the condition variable, and every waiter re-checks
//! "non-empty or done" after waking, so neither lost nor spurious wake-ups matter.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{trace, warn};

use super::cancel::CancelToken;

/// Upper bound on a single wait, so blocked workers notice cancellation
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Outcome of [`WorkQueue::try_take`]
#[derive(Debug, PartialEq, Eq)]
pub enum Take {
    /// A path, now owned by the caller
    Ready(PathBuf),
    /// Nothing queued yet but the walker is still running
    Pending,
    /// Nothing queued and the walker has finished
    Drained,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<PathBuf>,
    done: bool,
}

/// Unbounded multi-consumer queue of candidate files
#[derive(Debug)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    available: Condvar,
    cancel: CancelToken,
}

impl WorkQueue {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            available: Condvar::new(),
            cancel,
        }
    }

    // Every critical section leaves the state consistent, so a poisoned lock is still usable
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a path and wakes all waiting workers
    pub fn push(&self, path: PathBuf) {
        {
            let mut state = self.lock();
            debug_assert!(!state.done, "push after the queue was marked done");
            trace!("Queued {}", path.display());
            state.pending.push_back(path);
        }
        self.available.notify_all();
    }

    /// Takes a path if one is queued, otherwise reports whether more may still arrive.
    /// The emptiness check and the done check happen under the same lock.
    pub fn try_take(&self) -> Take {
        let mut state = self.lock();
        match state.pending.pop_front() {
            Some(path) => Take::Ready(path),
            None if state.done => Take::Drained,
            None => Take::Pending,
        }
    }

    /// Blocks until the queue is non-empty, the walker is done, or the scan is cancelled.
    /// May return early; callers re-evaluate with [`WorkQueue::try_take`].
    pub fn wait_for_item_or_done(&self) {
        let state = self.lock();
        let _state = self
            .available
            .wait_timeout_while(state, CANCEL_POLL_INTERVAL, |s| {
                s.pending.is_empty() && !s.done && !self.cancel.is_cancelled()
            })
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Flags the end of traversal and wakes everyone. Returns false if it was already set.
    pub fn mark_done(&self) -> bool {
        let first = {
            let mut state = self.lock();
            !std::mem::replace(&mut state.done, true)
        };
        if !first {
            warn!("Work queue marked done more than once");
        }
        self.available.notify_all();
        first
    }

    pub fn is_done(&self) -> bool {
        self.lock().done
    }

    /// Number of paths waiting to be taken
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }
}
