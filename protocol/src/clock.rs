//! # Clock
//!
//! Time-based behavior (quota window rollover, handshake expiry) is
//! evaluated once per call against an external clock. The clock is injected
//! so tests can move time deterministically.

use std::cell::Cell;

use chrono::{DateTime, Duration, TimeZone, Utc};

/// A monotonically non-decreasing source of "now".
pub trait Clock {
    /// Current time, read once at operation entry.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock for tests and simulations.
///
/// Only moves forward: [`advance`](Self::advance) with a negative duration
/// is ignored.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    /// Starts the clock at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Starts the clock at the given unix timestamp (seconds).
    pub fn at_unix(secs: i64) -> Self {
        let start = Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now);
        Self::new(start)
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        if by > Duration::zero() {
            self.now.set(self.now.get() + by);
        }
    }

    /// Moves the clock forward by whole seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for std::rc::Rc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
