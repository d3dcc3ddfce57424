//! A bounded, lock + condition-variable queue supporting all four
//! producer/consumer multiplicities, optional cooperative cancellation, and
//! a close/open/clear lifecycle.
//!
//! The source detects at compile time which of several container shapes
//! (back-insert only, double-ended, STL-stack-like, STL-queue-like) a
//! caller-supplied buffer type supports. This port fixes the backing
//! container to `VecDeque<T>`, which natively supports both access
//! disciplines, and exposes the discipline as a construction-time enum
//! instead (see `SPEC_FULL.md` §11).

use crate::config::{AccessDiscipline, CvQueueConfig, Multiplicity};
use crate::error::{ConfigError, Interrupted};
use crate::queue_traits::QueueSizeInfo;
use crate::stop::StopToken;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

struct Inner<T> {
    buf: VecDeque<T>,
    capacity: usize,
    closed: bool,
}

/// A bounded queue with blocking push/pop, closable for graceful shutdown.
///
/// See the module docs and spec §4.C for the full contract. `push_wait`
/// and `pop_wait` block; `*_cancelable` variants additionally accept a
/// [`StopToken`] and raise [`Interrupted`] if cancellation is observed
/// while waiting.
pub struct CvQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    multi_producer: bool,
    multi_consumer: bool,
    access: AccessDiscipline,
}

impl<T> CvQueue<T> {
    #[must_use]
    pub fn new(config: CvQueueConfig) -> Self {
        let (multi_producer, multi_consumer) = config.multiplicity().flags();
        Self {
            inner: Mutex::new(Inner {
                buf: VecDeque::with_capacity(config.capacity()),
                capacity: config.capacity(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            multi_producer,
            multi_consumer,
            access: config.access(),
        }
    }

    /// Convenience constructor for a given preset multiplicity at the
    /// default capacity and access discipline.
    #[must_use]
    pub fn with_multiplicity(capacity: usize, multiplicity: Multiplicity) -> Self {
        Self::new(CvQueueConfig::new(capacity, multiplicity).expect("non-zero capacity"))
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().capacity
    }

    /// Resizes the queue's capacity. Fails if `n` is zero or smaller than
    /// the queue's current occupancy (the original's `length_error`).
    pub fn set_capacity(&self, n: usize) -> Result<(), ConfigError> {
        let mut inner = self.inner.lock().unwrap();
        if n == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if n < inner.buf.len() {
            return Err(ConfigError::CapacityBelowCurrentSize {
                requested: n,
                current: inner.buf.len(),
            });
        }
        inner.capacity = n;
        drop(inner);
        // A shrink-to-fit growth may let waiting producers proceed.
        self.not_full.notify_all();
        Ok(())
    }

    pub fn reserve_capacity(&self) {
        let mut inner = self.inner.lock().unwrap();
        let capacity = inner.capacity;
        inner.buf.reserve(capacity.saturating_sub(inner.buf.len()));
    }

    /// Current occupancy. Deliberately paired with `size_info` rather than
    /// an `is_empty`/`empty` method — see spec §9, Open Question #2.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().buf.len()
    }

    pub fn size_info(&self) -> QueueSizeInfo {
        let inner = self.inner.lock().unwrap();
        QueueSizeInfo {
            len: inner.buf.len(),
            capacity: inner.capacity,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    /// Blocks while full and open; returns `false` without pushing if the
    /// queue is closed.
    pub fn push_wait(&self, item: T) -> bool {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.closed {
                return false;
            }
            if inner.buf.len() < inner.capacity {
                break;
            }
            inner = self.not_full.wait(inner).unwrap();
        }
        let was_empty = inner.buf.is_empty();
        inner.buf.push_back(item);
        drop(inner);
        self.notify_push(was_empty);
        true
    }

    /// As [`Self::push_wait`], but raises [`Interrupted`] if `token`
    /// observes a stop request before the push succeeds or the queue
    /// closes.
    pub fn push_wait_cancelable(&self, item: T, token: &StopToken) -> Result<bool, Interrupted> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.closed {
                return Ok(false);
            }
            if inner.buf.len() < inner.capacity {
                break;
            }
            if token.stop_requested() {
                return Err(Interrupted);
            }
            let (next, timeout) = self
                .not_full
                .wait_timeout(inner, std::time::Duration::from_millis(10))
                .unwrap();
            inner = next;
            let _ = timeout;
        }
        let was_empty = inner.buf.is_empty();
        inner.buf.push_back(item);
        drop(inner);
        self.notify_push(was_empty);
        Ok(true)
    }

    /// Blocks while empty and open; returns `None` once the queue is
    /// closed and drained.
    pub fn pop_wait(&self) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(item) = self.take_one(&mut inner) {
                drop(inner);
                self.notify_pop(item.1);
                return Some(item.0);
            }
            if inner.closed {
                return None;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    /// As [`Self::pop_wait`], but raises [`Interrupted`] if `token`
    /// observes a stop request before an item is available or the queue
    /// closes.
    pub fn pop_wait_cancelable(&self, token: &StopToken) -> Result<Option<T>, Interrupted> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some((item, was_full)) = self.take_one(&mut inner) {
                drop(inner);
                self.notify_pop(was_full);
                return Ok(Some(item));
            }
            if inner.closed {
                return Ok(None);
            }
            if token.stop_requested() {
                return Err(Interrupted);
            }
            let (next, _timeout) = self
                .not_empty
                .wait_timeout(inner, std::time::Duration::from_millis(10))
                .unwrap();
            inner = next;
        }
    }

    fn take_one(&self, inner: &mut Inner<T>) -> Option<(T, bool)> {
        if inner.buf.is_empty() {
            return None;
        }
        let was_full = inner.buf.len() >= inner.capacity;
        let item = match self.access {
            AccessDiscipline::Stack => inner.buf.pop_back(),
            AccessDiscipline::Queue => inner.buf.pop_front(),
        }
        .expect("checked non-empty above");
        Some((item, was_full))
    }

    fn notify_push(&self, was_empty: bool) {
        if !self.multi_producer && !self.multi_consumer {
            // SPSC: only worth waking a waiter if the queue was actually empty.
            if was_empty {
                self.not_empty.notify_one();
            }
        } else if self.multi_consumer {
            self.not_empty.notify_all();
        } else {
            self.not_empty.notify_one();
        }
    }

    fn notify_pop(&self, was_full: bool) {
        if !self.multi_producer && !self.multi_consumer {
            if was_full {
                self.not_full.notify_one();
            }
        } else if self.multi_producer {
            self.not_full.notify_all();
        } else {
            self.not_full.notify_one();
        }
    }

    /// Marks the queue closed. Existing and future waiters wake with a
    /// failure indication; buffered items remain poppable until drained.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        drop(inner);
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Clears the closed flag, allowing pushes again.
    pub fn open(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = false;
        drop(inner);
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Drops all buffered items and wakes producers waiting on not-full.
    /// Deliberately does not wake consumers waiting on not-empty — an empty
    /// queue has nothing for them (mirrors the source: the not-empty
    /// broadcast on `clear` is a no-op by construction, so it is omitted).
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.buf.clear();
        drop(inner);
        self.not_full.notify_all();
    }
}
