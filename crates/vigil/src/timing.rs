//! Deadline-based timers
//!
//! All timing in the engine is expressed as stored deadlines compared
//! against a caller-supplied `Instant` on each tick. Nothing schedules
//! callbacks; clearing a deadline before it elapses means the action never
//! runs, and tests drive the 100 ms / 200 ms / 2.5 s windows with
//! synthetic instants.

use std::time::{Duration, Instant};

/// Coalesces a burst of triggers into one ready signal after a quiet
/// window.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Start (or restart) the quiet window.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    /// True once the window has elapsed since the last trigger. Fires at
    /// most once per trigger burst.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// One-shot expiry used to fade recent-edit highlights. Re-arming replaces
/// the outstanding deadline rather than stacking a second one.
#[derive(Debug)]
pub struct FadeTimer {
    ttl: Duration,
    deadline: Option<Instant>,
}

impl FadeTimer {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            deadline: None,
        }
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.ttl);
    }

    /// True exactly once when the armed deadline has passed.
    pub fn expired(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
