//! A fixed-size pool of worker threads sharing one cancellation token.
//!
//! The source launches detached `std::jthread`s and propagates the first
//! worker panic out of `halt_and_clear` via `std::exception_ptr`, treating
//! its own `interrupt_exception` (raised by a cooperative-cancellation
//! check) as a silent, expected unwind rather than a failure. Rust has no
//! exception hierarchy to distinguish "expected interrupt" from "genuine
//! bug" that way: this port instead has worker closures return
//! `Result<(), Interrupted>` so cancellation is an ordinary value, and only
//! a real `panic!` inside a worker is caught (via `catch_unwind`) and
//! re-raised from [`WorkerPool::halt_and_clear`] (spec §6).

use crate::config::WorkerPoolConfig;
use crate::stop::{StopSource, StopToken};
use log::{debug, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

pub type WorkerId = u32;

struct ThreadSlot {
    handle: JoinHandle<()>,
}

/// Owns a generation's worker threads and their shared [`StopSource`].
///
/// Dropping a pool calls [`Self::halt_and_clear`]; a panic captured from a
/// worker during that drop is propagated by re-panicking, matching the
/// source's `~worker_pool` behavior of not silently swallowing it.
pub struct WorkerPool {
    worker_limit: usize,
    threads: Vec<ThreadSlot>,
    stop_source: StopSource,
    panics: Vec<Box<dyn Any + Send + 'static>>,
}

impl WorkerPool {
    #[must_use]
    pub fn new(config: WorkerPoolConfig) -> Self {
        Self {
            worker_limit: config.worker_limit(),
            threads: Vec::new(),
            stop_source: StopSource::new(),
            panics: Vec::new(),
        }
    }

    pub fn worker_limit(&self) -> usize {
        self.worker_limit
    }

    pub fn launched_worker_count(&self) -> usize {
        self.threads.len()
    }

    #[must_use]
    pub fn stop_token(&self) -> StopToken {
        self.stop_source.token()
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_source.stop_requested()
    }

    /// Requests stop and replaces the pool's token with a fresh,
    /// unsignaled one, so a later `launch` starts a new, uncancelled
    /// generation.
    pub fn halt(&mut self) {
        if !self.stop_source.stop_requested() {
            self.stop_source.request_stop();
        }
        self.stop_source = StopSource::new();
    }

    /// Halts and joins every worker, then re-panics with the first captured
    /// worker panic, if any (first non-cancellation panic wins).
    pub fn halt_and_clear(&mut self) {
        self.halt();

        for slot in self.threads.drain(..) {
            if let Err(payload) = slot.handle.join() {
                self.panics.push(payload);
            }
        }

        if let Some(payload) = self.panics.drain(..).next() {
            panic::resume_unwind(payload);
        }
    }

    /// Spawns one worker thread running `f(id, token)`. `f` should return
    /// promptly once `token` requests stop.
    pub fn launch<F>(&mut self, f: F)
    where
        F: FnOnce(WorkerId, StopToken) + Send + 'static,
    {
        let id = self.threads.len() as WorkerId;
        let token = self.stop_source.token();
        let stop_source = self.stop_source.clone();
        debug!("launching worker {id}");

        let handle = thread::spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| f(id, token)));
            if let Err(payload) = result {
                warn!("worker {id} panicked; requesting pool stop");
                stop_source.request_stop();
                panic::resume_unwind(payload);
            }
        });

        self.threads.push(ThreadSlot { handle });
    }

    /// Launches additional workers up to `worker_limit`, running `f` in
    /// each (spec §6: "fills the pool to its configured limit").
    pub fn launch_rest<F>(&mut self, f: F)
    where
        F: Fn(WorkerId, StopToken) + Send + Sync + Clone + 'static,
    {
        let remaining = self.worker_limit.saturating_sub(self.launched_worker_count());
        for _ in 0..remaining {
            let f = f.clone();
            self.launch(move |id, token| f(id, token));
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.halt_and_clear();
    }
}
