//! Update coalescing
//!
//! Content changes do not notify views directly. Instead each change arms
//! two single-shot deadlines: a short one that is pushed back by every new
//! change, and a long one that is armed once and left alone. The flush
//! fires when either expires, so an isolated burst settles quickly while a
//! continuous stream is still flushed at a bounded interval instead of
//! being starved.
//!
//! There is no timer thread; the owner checks [`UpdateScheduler::expired`]
//! on its own driving calls.

use std::time::{Duration, Instant};

/// Flush at most this long after the last change in a burst.
pub const BULK_TIMEOUT_FAST: Duration = Duration::from_millis(10);
/// Force a flush at least this often under continuous change.
pub const BULK_TIMEOUT_SLOW: Duration = Duration::from_millis(40);

/// Two-deadline coalescing state.
#[derive(Debug, Default)]
pub struct UpdateScheduler {
    fast_deadline: Option<Instant>,
    slow_deadline: Option<Instant>,
}

impl UpdateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a content change at `now`. The fast deadline is re-armed
    /// unconditionally; the slow one only if it is not already pending.
    pub fn schedule(&mut self, now: Instant) {
        self.fast_deadline = Some(now + BULK_TIMEOUT_FAST);
        if self.slow_deadline.is_none() {
            self.slow_deadline = Some(now + BULK_TIMEOUT_SLOW);
        }
    }

    /// True once either deadline has elapsed.
    pub fn expired(&self, now: Instant) -> bool {
        let due = |deadline: &Option<Instant>| deadline.is_some_and(|at| at <= now);
        due(&self.fast_deadline) || due(&self.slow_deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.fast_deadline.is_some() || self.slow_deadline.is_some()
    }

    /// Clears both deadlines after a flush.
    pub fn reset(&mut self) {
        self.fast_deadline = None;
        self.slow_deadline = None;
    }
}
