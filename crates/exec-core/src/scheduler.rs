//! Drives a bounded queue with a dedicated producer thread, a dedicated
//! consumer thread, and a pool of adaptive workers that switch role based on
//! queue fill (spec §7).
//!
//! The source parameterizes over an arbitrary forward range of producer
//! inputs and keeps a raw iterator cursor into it under a mutex. This port
//! materializes the inputs into a `Vec<PI>` up front (`set_producer_inputs`)
//! and keeps only the numeric cursor under a mutex — ranges that cannot be
//! materialized cheaply are out of scope for a bounded in-memory pipeline
//! (see `DESIGN.md`).

use crate::config::{default_chunk_size, Multiplicity, SchedulerConfig};
use crate::error::Interrupted;
use crate::gate::{AccessPolicy, ConsumerGate, ProducerGate};
use crate::queue_traits::QueueAccess;
use crate::stats::{Count, SchedulerStats, SchedulerStatsTracker};
use crate::stop::{StopSource, StopToken};
use crate::worker_pool::{WorkerId, WorkerPool};
use log::warn;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Whether an adaptive worker is currently pulling from producer inputs or
/// draining the queue (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMode {
    Producer,
    Consumer,
}

type ProducerFn<PI, T, Q> = Box<dyn Fn(WorkerId, &PI, &ProducerGate<'_, Q, T>, &StopToken) + Send + Sync>;
type ConsumerFn<T> = Box<dyn Fn(WorkerId, T) + Send + Sync>;

struct SchedulerCore<PI, T, Q> {
    queue: Arc<Q>,
    producer_func: ProducerFn<PI, T, Q>,
    consumer_func: ConsumerFn<T>,
    producer_inputs: Vec<PI>,
    producer_input_total: Count,
    producer_chunk_size: Count,
    next_index: Mutex<usize>,
    pool_stats: Mutex<SchedulerStats>,
    task_done_cv: Condvar,
}

/// Coordinates a [`WorkerPool`] and a bounded queue to run a producer/
/// consumer pipeline with adaptive role switching (spec §7).
///
/// Configuration methods (`set_producer`, `set_producer_inputs`, ...) are
/// not safe to call concurrently with themselves or `start()`; once
/// started, `wait_for_all_tasks` and `abort` are.
pub struct Scheduler<PI, T, Q>
where
    PI: Send + Sync + 'static,
    T: Send + 'static,
    Q: QueueAccess<T> + Send + Sync + 'static,
{
    pool: WorkerPool,
    queue: Arc<Q>,
    producer_func: Option<ProducerFn<PI, T, Q>>,
    consumer_func: Option<ConsumerFn<T>>,
    producer_inputs: Vec<PI>,
    producer_input_total: Count,
    producer_chunk_size: Count,
    core: Option<Arc<SchedulerCore<PI, T, Q>>>,
    stats_tracker: Option<Arc<Mutex<SchedulerStatsTracker>>>,
    stats_tracker_stop: Option<StopSource>,
    stats_tracker_handle: Option<JoinHandle<()>>,
    /// A `stats_interval` set via [`Self::with_config`]/[`SchedulerConfig`],
    /// applied once `start()` has built the core a tracker needs to sample.
    pending_stats_interval: Option<Duration>,
}

impl<PI, T, Q> Scheduler<PI, T, Q>
where
    PI: Send + Sync + 'static,
    T: Send + 'static,
    Q: QueueAccess<T> + Send + Sync + 'static,
{
    pub fn new(pool: WorkerPool, queue: Q) -> Self {
        Self {
            pool,
            queue: Arc::new(queue),
            producer_func: None,
            consumer_func: None,
            producer_inputs: Vec::new(),
            producer_input_total: 0,
            producer_chunk_size: 0,
            core: None,
            stats_tracker: None,
            stats_tracker_stop: None,
            stats_tracker_handle: None,
            pending_stats_interval: None,
        }
    }

    pub fn set_producer<F>(&mut self, f: F)
    where
        F: Fn(WorkerId, &PI, &ProducerGate<'_, Q, T>, &StopToken) + Send + Sync + 'static,
    {
        self.producer_func = Some(Box::new(f));
    }

    pub fn set_consumer<F>(&mut self, f: F)
    where
        F: Fn(WorkerId, T) + Send + Sync + 'static,
    {
        self.consumer_func = Some(Box::new(f));
    }

    pub fn set_producer_inputs(&mut self, inputs: Vec<PI>) {
        self.producer_input_total = inputs.len() as Count;
        self.producer_inputs = inputs;
    }

    pub fn producer_input_total(&self) -> Count {
        self.producer_input_total
    }

    pub fn producer_chunk_size(&self) -> Count {
        self.producer_chunk_size
    }

    /// The queue backing this scheduler's producer/consumer pipeline.
    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn set_producer_chunk_size(&mut self, chunk_size: Count) -> Result<(), crate::error::ConfigError> {
        if chunk_size <= 0 {
            return Err(crate::error::ConfigError::ZeroChunkSize);
        }
        self.producer_chunk_size = chunk_size;
        Ok(())
    }

    pub fn stats_tracker(&self) -> Option<&Arc<Mutex<SchedulerStatsTracker>>> {
        self.stats_tracker.as_ref()
    }

    /// Installs a stats tracker and starts a background thread sampling
    /// scheduler progress into it every `tracker.interval()`.
    pub fn set_stats_tracker(&mut self, tracker: SchedulerStatsTracker) {
        self.halt_stats_tracker();

        let core = Arc::clone(
            self.core
                .as_ref()
                .expect("start() must be called before set_stats_tracker()"),
        );
        let tracker = Arc::new(Mutex::new(tracker));
        self.stats_tracker = Some(Arc::clone(&tracker));

        let pool_token = self.pool.stop_token();
        let stop_source = StopSource::new();
        let tracker_token = stop_source.token();
        self.stats_tracker_stop = Some(stop_source);

        let handle = std::thread::spawn(move || {
            while !pool_token.stop_requested() && !tracker_token.stop_requested() {
                let interval = tracker.lock().unwrap().interval();
                tracker_token.wait_timeout(interval);

                let stats = *core.pool_stats.lock().unwrap();
                tracker.lock().unwrap().tick(stats);

                if pool_token.stop_requested() || tracker_token.stop_requested() {
                    break;
                }
            }
        });
        self.stats_tracker_handle = Some(handle);
    }

    /// Stops and joins the stats tracker's background thread, if any.
    pub fn halt_stats_tracker(&mut self) {
        if let Some(stop) = self.stats_tracker_stop.take() {
            stop.request_stop();
        }
        if let Some(handle) = self.stats_tracker_handle.take() {
            let _ = handle.join();
        }
    }

    /// Launches the dedicated producer/consumer threads plus the adaptive
    /// worker pool (spec §7).
    pub fn start(&mut self) {
        let chunk_size = if self.producer_chunk_size > 0 {
            self.producer_chunk_size
        } else {
            default_chunk_size(self.producer_input_total.max(0) as usize, self.pool.worker_limit()) as Count
        };

        let core = Arc::new(SchedulerCore {
            queue: Arc::clone(&self.queue),
            producer_func: self
                .producer_func
                .take()
                .expect("set_producer() must be called before start()"),
            consumer_func: self
                .consumer_func
                .take()
                .expect("set_consumer() must be called before start()"),
            producer_inputs: std::mem::take(&mut self.producer_inputs),
            producer_input_total: self.producer_input_total,
            producer_chunk_size: chunk_size,
            next_index: Mutex::new(0),
            pool_stats: Mutex::new(SchedulerStats::new(Some(self.producer_input_total))),
            task_done_cv: Condvar::new(),
        });

        self.pool.halt_and_clear();

        let c = Arc::clone(&core);
        self.pool.launch(move |id, token| Self::fixed_consumer(&c, id, &token));

        let c = Arc::clone(&core);
        self.pool.launch(move |id, token| Self::fixed_producer(&c, id, &token));

        let c = Arc::clone(&core);
        self.pool
            .launch_rest(move |id, token| Self::worker(Arc::clone(&c), id, token, WorkerMode::Producer));

        self.core = Some(core);

        if let Some(interval) = self.pending_stats_interval.take() {
            self.set_stats_tracker(SchedulerStatsTracker::new(interval));
        }
    }

    /// Blocks until every producer input has been processed and every
    /// produced item consumed, or the pool is stopped. On stop, closes the
    /// queue and returns without waiting for drain.
    pub fn wait_for_all_tasks(&mut self) {
        let core = Arc::clone(
            self.core
                .as_ref()
                .expect("start() must be called before wait_for_all_tasks()"),
        );
        let token = self.pool.stop_token();

        let mut stats = core.pool_stats.lock().unwrap();
        loop {
            if stats.producer_input_processed >= core.producer_input_total
                && stats.consumer_input_processed >= stats.producer_output
            {
                break;
            }
            if token.stop_requested() {
                break;
            }
            let (next, _timeout) = core
                .task_done_cv
                .wait_timeout(stats, Duration::from_millis(10))
                .unwrap();
            stats = next;
        }

        if token.stop_requested() {
            let remaining = core.queue.size_info().len;
            drop(stats);
            core.queue.close();
            warn!("scheduler interrupted; {remaining} item(s) left in queue");
            return;
        }
        drop(stats);

        self.halt_stats_tracker();
    }

    /// Stops the stats tracker and closes the queue without waiting for
    /// outstanding work.
    pub fn abort(&mut self) {
        self.halt_stats_tracker();
        self.queue.close();
    }

    fn do_worker_producer(core: &Arc<SchedulerCore<PI, T, Q>>, worker_id: WorkerId, token: &StopToken) -> bool {
        let (first, last) = {
            let mut next = core.next_index.lock().unwrap();
            let first = *next;
            let remaining = core.producer_inputs.len().saturating_sub(first);
            let count = (core.producer_chunk_size as usize).min(remaining);
            let last = first + count;
            *next = last;
            (first, last)
        };

        {
            let mut stats = core.pool_stats.lock().unwrap();
            stats.producer_input_consumed += (last - first) as Count;
        }

        let gate = ProducerGate::new(&core.queue, AccessPolicy::Counted);
        for item in &core.producer_inputs[first..last] {
            (core.producer_func)(worker_id, item, &gate, token);
        }

        let mut stats = core.pool_stats.lock().unwrap();
        stats.producer_input_processed += (last - first) as Count;
        stats.producer_output += gate.count();
        stats.queue_blocked_nanos += gate.blocked_nanos();

        if stats.producer_input_processed >= core.producer_input_total {
            if stats.consumer_input_processed >= stats.producer_output {
                core.task_done_cv.notify_all();
            }
            return false;
        }
        true
    }

    fn do_worker_consumer(core: &Arc<SchedulerCore<PI, T, Q>>, worker_id: WorkerId, token: &StopToken) -> bool {
        let gate = ConsumerGate::new(&core.queue, AccessPolicy::NotCounted);
        let value = match gate.pop_wait(token) {
            Ok(Some(value)) => value,
            Ok(None) | Err(Interrupted) => return false,
        };

        (core.consumer_func)(worker_id, value);

        let mut stats = core.pool_stats.lock().unwrap();
        stats.consumer_input_processed += 1;
        stats.queue_blocked_nanos += gate.blocked_nanos();
        if stats.producer_input_processed >= core.producer_input_total
            && stats.consumer_input_processed >= stats.producer_output
        {
            core.task_done_cv.notify_all();
            return false;
        }
        true
    }

    fn fixed_producer(core: &Arc<SchedulerCore<PI, T, Q>>, worker_id: WorkerId, token: &StopToken) {
        while !token.stop_requested() {
            if !Self::do_worker_producer(core, worker_id, token) {
                break;
            }
        }
        if token.stop_requested() {
            return;
        }
        while !token.stop_requested() {
            if !Self::do_worker_consumer(core, worker_id, token) {
                break;
            }
        }
    }

    fn fixed_consumer(core: &Arc<SchedulerCore<PI, T, Q>>, worker_id: WorkerId, token: &StopToken) {
        while !token.stop_requested() {
            if !Self::do_worker_consumer(core, worker_id, token) {
                break;
            }
        }
    }

    /// A worker that starts as a producer and switches role when the queue
    /// gets too full (≥90%) or, as a consumer, too empty (≤10%) (spec §7).
    fn worker(core: Arc<SchedulerCore<PI, T, Q>>, worker_id: WorkerId, token: StopToken, mut mode: WorkerMode) {
        while !token.stop_requested() {
            match mode {
                WorkerMode::Producer => {
                    if !Self::do_worker_producer(&core, worker_id, &token) {
                        mode = WorkerMode::Consumer;
                        continue;
                    }
                    if core.queue.size_info().fill_ratio() >= 0.9 {
                        mode = WorkerMode::Consumer;
                    }
                }
                WorkerMode::Consumer => {
                    if !Self::do_worker_consumer(&core, worker_id, &token) {
                        return;
                    }
                    if core.queue.size_info().fill_ratio() <= 0.1 {
                        mode = WorkerMode::Producer;
                    }
                }
            }
        }
    }
}

impl<PI, T> Scheduler<PI, T, crate::cv_queue::CvQueue<T>>
where
    PI: Send + Sync + 'static,
    T: Send + 'static,
{
    /// Builds a scheduler over a fresh [`crate::cv_queue::CvQueue`], wiring
    /// every [`SchedulerConfig`] field into the pipeline it configures:
    /// `queue_capacity` into the queue's own constructor, `producer_chunk_size`
    /// into [`Self::set_producer_chunk_size`], and `stats_interval` into a
    /// [`SchedulerStatsTracker`] installed once [`Self::start`] runs (spec
    /// §4.H, §10).
    pub fn with_config(pool: WorkerPool, multiplicity: Multiplicity, config: SchedulerConfig) -> Self {
        let queue = crate::cv_queue::CvQueue::new(
            crate::config::CvQueueConfig::new(config.queue_capacity(), multiplicity)
                .expect("SchedulerConfig::new already validated queue_capacity != 0"),
        );
        let mut scheduler = Self::new(pool, queue);
        if let Some(chunk_size) = config.producer_chunk_size() {
            scheduler
                .set_producer_chunk_size(chunk_size as Count)
                .expect("SchedulerConfig::with_producer_chunk_size already validated size != 0");
        }
        scheduler.pending_stats_interval = config.stats_interval();
        scheduler
    }
}

impl<PI, T, Q> Drop for Scheduler<PI, T, Q>
where
    PI: Send + Sync + 'static,
    T: Send + 'static,
    Q: QueueAccess<T> + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.abort();
    }
}
