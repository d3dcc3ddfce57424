//! Scheduler progress counters and the periodic-sampling tracker that turns
//! them into a rate (spec §7, §8).
//!
//! The source's counters use a sentinel (`-1`, named `UNPREDICTABLE`) for
//! "total input count not known up front" because the producer input range
//! might not be a sized range. Rust expresses that directly as
//! `Option<i64>` instead of a magic sentinel value (spec §11).
//!
//! The source also tracks a debug-only `queue_overhead` nanosecond counter:
//! the fraction of wall-clock time producer/consumer workers spend blocked
//! inside a gate's `push_wait`/`pop_wait` rather than doing useful work.
//! This port gets the same number for free from [`crate::gate::GateCore`]'s
//! `blocked_nanos` accumulator (summed across every gate the scheduler
//! hands out) without needing the source's separate `producer_time`/
//! `consumer_time` instrumentation: [`SchedulerDeltaStats::queue_overhead_fraction`]
//! divides the delta in accumulated blocked time by the delta's wall-clock
//! duration across every worker, so it stays a ratio in `[0.0, 1.0]`
//! regardless of pool size.

use std::time::{Duration, Instant};

pub type Count = i64;

/// Snapshot of a scheduler's progress counters.
///
/// `producer_input_processed`/`consumer_input_processed` drive the
/// "all tasks done" check the scheduler waits on; the two `_all` flags
/// record that a boundary was crossed exactly once, guarding against a
/// duplicate wakeup notification.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerStats {
    pub is_running: bool,
    producer_input_total: Option<Count>,
    pub producer_input_consumed: Count,
    pub producer_input_processed: Count,
    pub producer_output: Count,
    pub consumer_input_processed: Count,
    /// Nanoseconds every producer/consumer gate has spent blocked inside
    /// `push_wait`/`pop_wait`, summed across the pool (spec §4.H, §10).
    pub queue_blocked_nanos: u64,
    producer_input_consumed_all: bool,
    producer_input_processed_all: bool,
}

impl SchedulerStats {
    /// `total` is `None` when the producer input range's length isn't known
    /// up front.
    #[must_use]
    pub fn new(total: Option<Count>) -> Self {
        Self {
            is_running: false,
            producer_input_total: total,
            producer_input_consumed: 0,
            producer_input_processed: 0,
            producer_output: 0,
            consumer_input_processed: 0,
            queue_blocked_nanos: 0,
            producer_input_consumed_all: false,
            producer_input_processed_all: false,
        }
    }

    pub fn producer_input_total(&self) -> Option<Count> {
        self.producer_input_total
    }

    #[must_use]
    pub fn same_count(&self, other: &Self) -> bool {
        self.producer_input_consumed_all == other.producer_input_consumed_all
            && self.producer_input_consumed == other.producer_input_consumed
            && self.producer_input_processed == other.producer_input_processed
            && self.producer_output == other.producer_output
            && self.consumer_input_processed == other.consumer_input_processed
    }

    #[must_use]
    pub fn count_updated(&self, other: &Self) -> bool {
        !self.same_count(other) || self.is_running != other.is_running
    }

    pub fn is_producer_input_consumed_all(&self) -> bool {
        self.producer_input_consumed_all
    }

    /// Marks all producer input as consumed. Panics if already set.
    pub fn set_producer_input_consumed_all(&mut self) {
        assert!(
            !self.producer_input_consumed_all,
            "set_producer_input_consumed_all has been called multiple times"
        );
        self.producer_input_consumed_all = true;
    }

    pub fn is_producer_input_processed_all(&self) -> bool {
        self.producer_input_processed_all
    }

    /// Marks all producer input as processed. Panics if already set, or if
    /// `producer_input_total` is known and doesn't match
    /// `producer_input_processed`.
    pub fn set_producer_input_processed_all(&mut self) {
        assert!(
            !self.producer_input_processed_all,
            "set_producer_input_processed_all has been called multiple times; \
             this leads to invalid (duplicate) wakeups"
        );
        if let Some(total) = self.producer_input_total {
            assert_eq!(
                self.producer_input_processed, total,
                "attempted to set producer_input_processed_all, but total count \
                 and processed count do not match"
            );
        }
        self.producer_input_processed_all = true;
    }

    pub fn is_consumer_input_processed_all(&self) -> bool {
        self.consumer_input_processed >= self.producer_output
    }

    pub fn is_all_task_done(&self) -> bool {
        self.is_producer_input_processed_all() && self.is_consumer_input_processed_all()
    }
}

impl Default for SchedulerStats {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Per-second rates derived from the difference between two
/// [`SchedulerStats`] snapshots over `delta`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerDeltaStats {
    producer_output_per_sec: f64,
    consumer_process_per_sec: f64,
    throughput_delta_per_sec: f64,
    queue_overhead_fraction: f64,
}

impl SchedulerDeltaStats {
    #[must_use]
    pub fn new(delta: Duration, prev: &SchedulerStats, current: &SchedulerStats) -> Self {
        let delta_sec = delta.as_secs_f64();
        if delta_sec <= 0.0 {
            return Self::default();
        }
        let producer_output_delta = (current.producer_output - prev.producer_output) as f64;
        let consumer_process_delta =
            (current.consumer_input_processed - prev.consumer_input_processed) as f64;
        let blocked_delta_nanos = current
            .queue_blocked_nanos
            .saturating_sub(prev.queue_blocked_nanos) as f64;
        let delta_nanos = delta.as_nanos() as f64;
        Self {
            producer_output_per_sec: producer_output_delta / delta_sec,
            consumer_process_per_sec: consumer_process_delta / delta_sec,
            throughput_delta_per_sec: (producer_output_delta - consumer_process_delta) / delta_sec,
            queue_overhead_fraction: (blocked_delta_nanos / delta_nanos).min(1.0),
        }
    }

    pub fn producer_output_per_sec(&self) -> f64 {
        self.producer_output_per_sec
    }

    pub fn consumer_process_per_sec(&self) -> f64 {
        self.consumer_process_per_sec
    }

    pub fn throughput_delta_per_sec(&self) -> f64 {
        self.throughput_delta_per_sec
    }

    /// Fraction of this interval's wall-clock time spent blocked inside a
    /// gate's `push_wait`/`pop_wait`, clamped to `[0.0, 1.0]`. A pool with
    /// several concurrently-blocked workers can otherwise accumulate more
    /// blocked-nanosecond mass than the interval itself contains.
    pub fn queue_overhead_fraction(&self) -> f64 {
        self.queue_overhead_fraction
    }
}

/// Periodically samples a scheduler's stats and fires a callback with the
/// computed delta, but only when something actually changed since the
/// previous sample (spec §8: "computing a delta only when at least one
/// counter changed").
pub struct SchedulerStatsTracker {
    interval: Duration,
    callback: Option<Box<dyn FnMut(&SchedulerStatsTracker) + Send>>,
    first_tick: Option<Instant>,
    tick: Option<Instant>,
    last_tick: Option<Instant>,
    stats: SchedulerStats,
    prev_stats: SchedulerStats,
    delta_stats: SchedulerDeltaStats,
}

impl SchedulerStatsTracker {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            callback: None,
            first_tick: None,
            tick: None,
            last_tick: None,
            stats: SchedulerStats::default(),
            prev_stats: SchedulerStats::default(),
            delta_stats: SchedulerDeltaStats::default(),
        }
    }

    #[must_use]
    pub fn with_callback<F>(interval: Duration, callback: F) -> Self
    where
        F: FnMut(&SchedulerStatsTracker) + Send + 'static,
    {
        let mut tracker = Self::new(interval);
        tracker.callback = Some(Box::new(callback));
        tracker
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&SchedulerStatsTracker) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    pub fn reset_first_tick(&mut self) {
        let now = Instant::now();
        self.first_tick = Some(now);
        self.delta_stats = SchedulerDeltaStats::default();
    }

    pub fn total_time(&self) -> Duration {
        match (self.tick, self.first_tick) {
            (Some(tick), Some(first)) => tick.saturating_duration_since(first),
            _ => Duration::ZERO,
        }
    }

    pub fn delta_time(&self) -> Duration {
        match (self.tick, self.last_tick) {
            (Some(tick), Some(last)) => tick.saturating_duration_since(last),
            _ => Duration::ZERO,
        }
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub fn prev_stats(&self) -> &SchedulerStats {
        &self.prev_stats
    }

    pub fn delta_stats(&self) -> &SchedulerDeltaStats {
        &self.delta_stats
    }

    /// Whether `interval` has elapsed since the last tick (always `true`
    /// before the first tick).
    pub fn interval_elapsed(&self) -> bool {
        match self.last_tick {
            Some(last) => last.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Records a new stats sample, firing the callback only if something
    /// counted actually changed since `prev_stats`.
    pub fn tick(&mut self, stats: SchedulerStats) {
        let now = Instant::now();
        if self.first_tick.is_none() {
            self.first_tick = Some(now);
        }
        self.tick = Some(now);
        self.stats = stats;

        if self.callback.is_some() && self.stats.count_updated(&self.prev_stats) {
            let last = self.last_tick.unwrap_or(now);
            self.delta_stats = SchedulerDeltaStats::new(
                now.saturating_duration_since(last),
                &self.prev_stats,
                &self.stats,
            );
            if let Some(callback) = self.callback.as_mut() {
                callback(self);
            }
        }

        self.last_tick = Some(now);
        self.prev_stats = self.stats;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn producer_input_processed_all_rejects_mismatched_total() {
        let mut stats = SchedulerStats::new(Some(10));
        stats.producer_input_processed = 5;
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            stats.set_producer_input_processed_all();
        }));
        assert!(result.is_err());
    }

    #[test]
    fn producer_input_processed_all_accepts_matching_total() {
        let mut stats = SchedulerStats::new(Some(10));
        stats.producer_input_processed = 10;
        stats.set_producer_input_processed_all();
        assert!(stats.is_producer_input_processed_all());
    }

    #[test]
    fn unpredictable_total_skips_match_check() {
        let mut stats = SchedulerStats::new(None);
        stats.producer_input_processed = 3;
        stats.set_producer_input_processed_all();
        assert!(stats.is_producer_input_processed_all());
    }

    #[test]
    fn all_task_done_requires_both_flags() {
        let mut stats = SchedulerStats::new(Some(1));
        stats.producer_output = 1;
        stats.producer_input_processed = 1;
        stats.consumer_input_processed = 1;
        assert!(!stats.is_all_task_done());
        stats.set_producer_input_processed_all();
        assert!(stats.is_all_task_done());
    }

    #[test]
    fn queue_overhead_fraction_reflects_blocked_time_delta() {
        let mut prev = SchedulerStats::new(None);
        prev.queue_blocked_nanos = 0;
        let mut current = SchedulerStats::new(None);
        current.queue_blocked_nanos = 500_000_000;

        let delta = SchedulerDeltaStats::new(Duration::from_secs(1), &prev, &current);
        assert!((delta.queue_overhead_fraction() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn queue_overhead_fraction_clamps_at_one() {
        let prev = SchedulerStats::new(None);
        let mut current = SchedulerStats::new(None);
        current.queue_blocked_nanos = 10_000_000_000;

        let delta = SchedulerDeltaStats::new(Duration::from_secs(1), &prev, &current);
        assert_eq!(delta.queue_overhead_fraction(), 1.0);
    }

    #[test]
    fn tick_fires_callback_only_on_change() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        let mut tracker = SchedulerStatsTracker::with_callback(Duration::from_millis(1), move |_| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        let mut stats = SchedulerStats::new(Some(10));
        tracker.tick(stats);
        thread::sleep(Duration::from_millis(2));
        tracker.tick(stats);
        assert_eq!(fired.load(Ordering::SeqCst), 0, "unchanged stats must not fire");

        stats.producer_output += 1;
        thread::sleep(Duration::from_millis(2));
        tracker.tick(stats);
        assert_eq!(fired.load(Ordering::SeqCst), 1, "a changed counter must fire once");
    }
}
