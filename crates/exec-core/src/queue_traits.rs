//! Uniform cancelable push/pop surface over [`crate::cv_queue::CvQueue`] and
//! [`crate::lfq::LfQueue`] (spec §4.E), used by [`crate::gate::Gate`] and
//! the scheduler so neither has to know which queue kind it's driving.

use crate::error::Interrupted;
use crate::stop::StopToken;

/// `len()` + `capacity()` read together, so a caller computing a fill ratio
/// sees a consistent pair rather than two independently-racing loads (spec
/// §4.H: "Fill ratios read `size_info()` ... so the decision is on a
/// consistent snapshot").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSizeInfo {
    pub len: usize,
    pub capacity: usize,
}

impl QueueSizeInfo {
    #[must_use]
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.len as f64 / self.capacity as f64
        }
    }
}

/// Whether a queue's cancellation is handled internally (it threads a
/// [`StopToken`] through its own blocking wait) or must be emulated
/// externally by spinning its non-blocking try-operations under a token.
///
/// [`crate::cv_queue::CvQueue`] is the former (`false`); [`crate::lfq::LfQueue`]
/// is the latter (`true`) — see spec §4.E.
pub trait QueueAccess<T> {
    const NEED_STOP_TOKEN_FOR_CANCEL: bool;

    /// Pushes `item`, blocking until accepted, the queue closes (`Ok(false)`),
    /// or `token` requests stop (`Err(Interrupted)`).
    fn cancelable_bounded_push(&self, item: T, token: &StopToken) -> Result<bool, Interrupted>;

    /// Pops one item, blocking until available, the queue closes and drains
    /// (`Ok(None)`), or `token` requests stop (`Err(Interrupted)`).
    fn cancelable_pop(&self, token: &StopToken) -> Result<Option<T>, Interrupted>;

    fn size_info(&self) -> QueueSizeInfo;

    fn close(&self);
}

impl<T> QueueAccess<T> for crate::cv_queue::CvQueue<T> {
    const NEED_STOP_TOKEN_FOR_CANCEL: bool = false;

    fn cancelable_bounded_push(&self, item: T, token: &StopToken) -> Result<bool, Interrupted> {
        self.push_wait_cancelable(item, token)
    }

    fn cancelable_pop(&self, token: &StopToken) -> Result<Option<T>, Interrupted> {
        self.pop_wait_cancelable(token)
    }

    fn size_info(&self) -> QueueSizeInfo {
        let info = crate::cv_queue::CvQueue::size_info(self);
        QueueSizeInfo {
            len: info.len,
            capacity: info.capacity,
        }
    }

    fn close(&self) {
        crate::cv_queue::CvQueue::close(self);
    }
}

impl<T> QueueAccess<T> for crate::lfq::LfQueue<T> {
    const NEED_STOP_TOKEN_FOR_CANCEL: bool = true;

    fn cancelable_bounded_push(&self, item: T, token: &StopToken) -> Result<bool, Interrupted> {
        self.push_wait_cancelable(item, token).map(|()| true)
    }

    fn cancelable_pop(&self, token: &StopToken) -> Result<Option<T>, Interrupted> {
        self.pop_wait_cancelable(token).map(Some)
    }

    fn size_info(&self) -> QueueSizeInfo {
        QueueSizeInfo {
            len: self.len(),
            capacity: self.capacity(),
        }
    }

    fn close(&self) {
        // The lock-free ring has no closed state (spec §3: "For LFQ: ...
        // cannot be closed"); callers that need to unblock an LFQ-backed
        // pipeline do so purely through the shared stop token.
    }
}
