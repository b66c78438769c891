//! Interval accounting for utilization.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Source of monotonic time.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// When the interval clock is sampled and advanced during an emission pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockCadence {
    /// Sample and advance once, at the start of each emission pass.
    /// The interval is the time since the previous pass.
    #[default]
    PerPoll,
    /// Sample at the start of every tracked record and advance after every
    /// record that emitted something. Later devices in a pass see only the
    /// time spent on the devices before them.
    PerRecord,
}

/// Elapsed time since the last advance.
#[derive(Debug)]
pub struct IntervalClock<C> {
    clock: C,
    last: Instant,
}

impl<C: Clock> IntervalClock<C> {
    /// Start the clock now.
    pub fn new(clock: C) -> Self {
        let last = clock.now();
        Self { clock, last }
    }

    /// Seconds since the last advance.
    pub fn elapsed_secs(&self) -> f64 {
        self.clock.now().saturating_duration_since(self.last).as_secs_f64()
    }

    /// Move the reference point to now.
    pub fn advance(&mut self) {
        self.last = self.clock.now();
    }

    /// Seconds since the last advance, then advance.
    pub fn lap(&mut self) -> f64 {
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;
        elapsed
    }
}
