//! Manual clock for deterministic tests
//!
//! Sleeping on a [`ManualClock`] returns immediately and advances the clock
//! by the requested amount, so scenario timelines stay identical while
//! tests run with zero real delay.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::traits::Clock;

/// Fixed start instant: 2023-11-14T22:13:20Z
const MANUAL_EPOCH_SECS: i64 = 1_700_000_000;

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(DateTime::from_timestamp(MANUAL_EPOCH_SECS, 0).unwrap_or_default())
    }

    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, duration: Duration) {
        let delta = chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
        *self.now.lock() += delta;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
