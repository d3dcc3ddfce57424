//! Crate-wide error taxonomy.
//!
//! Recoverable signals (queue closed, cancellation) are modeled as plain
//! `bool`/`Option` returns or the dedicated [`Interrupted`] marker, never as
//! part of [`ExecError`] — only configuration mistakes, which are caller
//! bugs surfaced synchronously at the configuration call, go through this
//! enum. Logic violations (double gate access, double discard) are program
//! errors and panic directly rather than returning a value; see
//! [`crate::gate`].

use thiserror::Error;

/// Bad configuration supplied to a queue, gate, worker pool, or scheduler.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A queue or scheduler was asked to operate with zero capacity.
    #[error("capacity must be non-zero")]
    ZeroCapacity,

    /// `set_capacity` would shrink the queue below its current occupancy.
    #[error("capacity {requested} is smaller than current size {current}")]
    CapacityBelowCurrentSize { requested: usize, current: usize },

    /// Worker pool was configured with fewer than the minimum 2 workers.
    #[error("worker limit must be at least 2, got {0}")]
    WorkerLimitTooSmall(usize),

    /// Scheduler producer chunk size of zero would never make progress.
    #[error("producer chunk size must be non-zero")]
    ZeroChunkSize,
}

/// The cooperative-cancellation sentinel (component B).
///
/// Raised by the cancelable variants of [`crate::cv_queue::CvQueue`] and
/// [`crate::lfq::LfQueue`] blocking operations when a [`crate::stop::StopToken`]
/// observes a stop request while waiting. Worker wrappers and the scheduler
/// treat this as a silent, expected exit rather than a failure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Default)]
#[error("operation interrupted by cooperative cancellation")]
pub struct Interrupted;

/// Top-level error for operations that can fail at configuration time or be
/// cancelled. Worker-pool user-callable failures are not represented here —
/// they propagate as captured panics, resumed on `halt_and_clear`.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}
