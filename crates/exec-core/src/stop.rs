//! Cooperative cancellation handle.
//!
//! The original implementation forwards `std::stop_token`/`std::jthread`
//! through blocking operations; Rust has no stdlib equivalent, so this
//! module builds the minimal shared-flag-plus-condvar handle the rest of
//! the crate needs (spec §9: "represent as a cloneable shared cancellation
//! handle owned by the pool and forwarded by value").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

struct Inner {
    requested: AtomicBool,
    // Paired with `requested` purely to give waiters something to block on;
    // the bool itself carries no state beyond what `requested` already has.
    gate: Mutex<()>,
    condvar: Condvar,
}

/// Owns the cancellation flag for a worker pool generation. Dropped and
/// replaced wholesale on [`crate::worker_pool::WorkerPool::halt`] so a pool
/// can be restarted with a fresh, unsignaled token.
#[derive(Clone)]
pub struct StopSource {
    inner: Arc<Inner>,
}

impl StopSource {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                requested: AtomicBool::new(false),
                gate: Mutex::new(()),
                condvar: Condvar::new(),
            }),
        }
    }

    /// Returns a cloneable token observing this source's cancellation state.
    pub fn token(&self) -> StopToken {
        StopToken {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Requests stop. Returns `true` if this call was the one that actually
    /// transitioned the flag (mirrors `std::stop_source::request_stop`).
    pub fn request_stop(&self) -> bool {
        let already_requested = self.inner.requested.swap(true, Ordering::SeqCst);
        if !already_requested {
            // Hold the mutex while notifying so a waiter that just checked
            // the flag and is about to wait can't miss this wakeup.
            let _guard = self.inner.gate.lock().unwrap();
            self.inner.condvar.notify_all();
        }
        !already_requested
    }

    pub fn stop_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }
}

impl Default for StopSource {
    fn default() -> Self {
        Self::new()
    }
}

/// A cloneable, `Send + Sync` handle that blocking operations poll to decide
/// whether to abandon a wait.
#[derive(Clone)]
pub struct StopToken {
    inner: Arc<Inner>,
}

impl StopToken {
    pub fn stop_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Blocks until either `timeout` elapses or stop is requested. Used by
    /// spin-based waiters (the lock-free queue's blocking push/pop) to avoid
    /// a hot spin loop while still noticing cancellation promptly.
    pub(crate) fn wait_timeout(&self, timeout: Duration) {
        if self.stop_requested() {
            return;
        }
        let guard = self.inner.gate.lock().unwrap();
        let _ = self.inner.condvar.wait_timeout(guard, timeout);
    }
}
