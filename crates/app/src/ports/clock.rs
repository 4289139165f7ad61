//! Clock port: every "now" read goes through here.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::TimeDelta;
use hush_domain::time::{self, Timestamp};

/// A clock that provides the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        time::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current += delta;
    }

    /// Jump to `at`.
    pub fn set(&self, at: Timestamp) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = at;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(time::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
