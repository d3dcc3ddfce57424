//! exec-core - bounded producer/consumer queues and an adaptive scheduler
//!
//! A family of bounded producer/consumer queues plus a work-stealing-flavored
//! adaptive scheduler for CPU-bound pipelines: a bounded stream of *producer
//! inputs* is transformed into a bounded stream of *work items*, which are
//! then consumed, with workers dynamically reassigned between the producer
//! role and the consumer role based on queue pressure.
//!
//! Three tightly coupled pieces make up the core:
//!
//! - [`cv_queue`] - a lock + condition-variable bounded queue supporting all
//!   four producer/consumer multiplicities (SPSC/SPMC/MPSC/MPMC), a
//!   close/open/clear lifecycle, and optional cooperative cancellation.
//! - [`lfq`] - a lock-free MPMC bounded ring queue using per-slot turn
//!   counters, cache-line padded to avoid false sharing.
//! - [`gate`] and [`scheduler`] - a single-owner access handle enforcing
//!   at-most-once or counted access per worker iteration, and a scheduler
//!   that drives a [`worker_pool::WorkerPool`] whose workers switch between
//!   producing and consuming based on queue fill, with accurate completion
//!   detection and live statistics.
//!
//! # Example
//!
//! ```
//! use exec_core::config::{Multiplicity, SchedulerConfig, WorkerPoolConfig};
//! use exec_core::scheduler::Scheduler;
//! use exec_core::worker_pool::WorkerPool;
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use std::sync::Arc;
//!
//! let pool = WorkerPool::new(WorkerPoolConfig::new(4).unwrap());
//! let config = SchedulerConfig::new(64).unwrap();
//! let mut scheduler = Scheduler::with_config(pool, Multiplicity::Mpmc, config);
//!
//! scheduler.set_producer_inputs((1..=100i64).collect());
//! scheduler.set_producer(|_id, input, gate, token| {
//!     let _ = gate.push_wait(*input, token);
//! });
//!
//! let total = Arc::new(AtomicI64::new(0));
//! let total_clone = Arc::clone(&total);
//! scheduler.set_consumer(move |_id, value: i64| {
//!     total_clone.fetch_add(value, Ordering::SeqCst);
//! });
//!
//! scheduler.start();
//! scheduler.wait_for_all_tasks();
//!
//! assert_eq!(total.load(Ordering::SeqCst), (1..=100i64).sum::<i64>());
//! ```

pub mod arch;
pub(crate) mod backoff;
pub mod config;
pub mod cv_queue;
pub mod error;
pub mod gate;
pub(crate) mod invariants;
pub mod lfq;
pub mod queue_traits;
pub mod scheduler;
pub mod stats;
pub mod stop;
pub mod worker_pool;

pub use cv_queue::CvQueue;
pub use error::{ConfigError, ExecError, Interrupted};
pub use gate::{AccessPolicy, ConsumerGate, ProducerGate};
pub use lfq::LfQueue;
pub use queue_traits::{QueueAccess, QueueSizeInfo};
pub use scheduler::{Scheduler, WorkerMode};
pub use stats::{Count, SchedulerDeltaStats, SchedulerStats, SchedulerStatsTracker};
pub use stop::{StopSource, StopToken};
pub use worker_pool::{WorkerId, WorkerPool};
