//! Validated construction parameters for every component in the crate.
//!
//! Follows the teacher crate's `Config::new` pattern (a `const`-friendly
//! validating constructor plus a `Default` impl) rather than builder
//! structs with unchecked setters, so a misconfigured queue or pool fails
//! at the call site instead of surfacing a confusing panic three calls
//! later.

use crate::error::ConfigError;
use std::time::Duration;

/// Producer/consumer multiplicity preset for [`crate::cv_queue::CvQueue`].
///
/// Shorthand over the two orthogonal `multi_producer` / `multi_consumer`
/// flags (spec §4.C); selects the notification policy (notify-one vs
/// notify-all) on each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Multiplicity {
    #[default]
    Spsc,
    Spmc,
    Mpsc,
    Mpmc,
}

impl Multiplicity {
    pub(crate) fn flags(self) -> (bool, bool) {
        match self {
            Multiplicity::Spsc => (false, false),
            Multiplicity::Spmc => (false, true),
            Multiplicity::Mpsc => (true, false),
            Multiplicity::Mpmc => (true, true),
        }
    }
}

/// Element ordering discipline for [`crate::cv_queue::CvQueue`] (spec §4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessDiscipline {
    /// Push and pop both operate on the back — LIFO. Default, matching the
    /// source's `stack` access.
    #[default]
    Stack,
    /// Push the back, pop the front — FIFO.
    Queue,
}

/// Configuration for [`crate::cv_queue::CvQueue`].
#[derive(Debug, Clone, Copy)]
pub struct CvQueueConfig {
    capacity: usize,
    multiplicity: Multiplicity,
    access: AccessDiscipline,
}

impl CvQueueConfig {
    pub fn new(capacity: usize, multiplicity: Multiplicity) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            multiplicity,
            access: AccessDiscipline::Stack,
        })
    }

    #[must_use]
    pub fn with_access(mut self, access: AccessDiscipline) -> Self {
        self.access = access;
        self
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    pub(crate) fn access(&self) -> AccessDiscipline {
        self.access
    }
}

impl Default for CvQueueConfig {
    fn default() -> Self {
        Self::new(1024, Multiplicity::default()).expect("1024 is non-zero")
    }
}

/// Configuration for [`crate::lfq::LfQueue`].
#[derive(Debug, Clone, Copy)]
pub struct LfQueueConfig {
    capacity: usize,
}

impl LfQueueConfig {
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self { capacity })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for LfQueueConfig {
    fn default() -> Self {
        Self::new(1024).expect("1024 is non-zero")
    }
}

/// Configuration for [`crate::worker_pool::WorkerPool`].
#[derive(Debug, Clone, Copy)]
pub struct WorkerPoolConfig {
    worker_limit: usize,
}

impl WorkerPoolConfig {
    pub fn new(worker_limit: usize) -> Result<Self, ConfigError> {
        if worker_limit < 2 {
            return Err(ConfigError::WorkerLimitTooSmall(worker_limit));
        }
        Ok(Self { worker_limit })
    }

    pub(crate) fn worker_limit(&self) -> usize {
        self.worker_limit
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        let limit = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1)
            .max(2);
        Self::new(limit).expect("computed default is always >= 2")
    }
}

/// Configuration for [`crate::scheduler::Scheduler`].
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    queue_capacity: usize,
    producer_chunk_size: Option<usize>,
    stats_interval: Option<Duration>,
}

impl SchedulerConfig {
    pub fn new(queue_capacity: usize) -> Result<Self, ConfigError> {
        if queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self {
            queue_capacity,
            producer_chunk_size: None,
            stats_interval: None,
        })
    }

    pub fn with_producer_chunk_size(mut self, size: usize) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        self.producer_chunk_size = Some(size);
        Ok(self)
    }

    #[must_use]
    pub fn with_stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = Some(interval);
        self
    }

    pub(crate) fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub(crate) fn producer_chunk_size(&self) -> Option<usize> {
        self.producer_chunk_size
    }

    pub(crate) fn stats_interval(&self) -> Option<Duration> {
        self.stats_interval
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(1024).expect("1024 is non-zero")
    }
}

/// `clamp(total / worker_limit, 1, 100_000)`, the default chunk size when
/// the caller hasn't set one and the input range is sized (spec §4.H).
pub(crate) fn default_chunk_size(total: usize, worker_limit: usize) -> usize {
    (total / worker_limit.max(1)).clamp(1, 100_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_rejected() {
        assert_eq!(
            CvQueueConfig::new(0, Multiplicity::Spsc).unwrap_err(),
            ConfigError::ZeroCapacity
        );
        assert_eq!(LfQueueConfig::new(0).unwrap_err(), ConfigError::ZeroCapacity);
    }

    #[test]
    fn worker_limit_below_two_rejected() {
        assert_eq!(
            WorkerPoolConfig::new(1).unwrap_err(),
            ConfigError::WorkerLimitTooSmall(1)
        );
        assert!(WorkerPoolConfig::new(2).is_ok());
    }

    #[test]
    fn default_chunk_size_is_clamped() {
        assert_eq!(default_chunk_size(1000, 4), 250);
        assert_eq!(default_chunk_size(1, 4), 1);
        assert_eq!(default_chunk_size(10_000_000, 1), 100_000);
    }
}
