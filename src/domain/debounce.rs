//! One-shot, cancel-and-reschedule timer.
//!
//! The debouncer never sleeps or spawns anything. Callers `schedule` on every
//! edit and `poll` from whatever loop they already run; `poll` reports `true`
//! exactly once per quiet period.

use std::time::{Duration, Instant};

/// Parameter edits landing within this window coalesce into one recompute.
pub const PARAMETER_DEBOUNCE: Duration = Duration::from_millis(150);

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Arm the timer, replacing any pending deadline.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fire if the deadline has passed. Disarms the timer when it fires.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(PARAMETER_DEBOUNCE)
    }
}
