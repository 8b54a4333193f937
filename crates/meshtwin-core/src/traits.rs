//! Core traits for the mesh digital twin
//!
//! These traits keep the engine free of ambient globals: time, randomness
//! and telemetry are all injected.
//!
//! ## Key Traits
//!
//! - [`Clock`]: Time abstraction for testability
//! - [`RandomSource`]: Randomness for topology generation and cascades
//! - [`TelemetrySource`]: Time-series queries feeding real metrics into the twin

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::TelemetryError;
use crate::telemetry::MetricSeries;

/// Time abstraction
///
/// Production uses [`SystemClock`], which really sleeps. Tests use
/// [`crate::ManualClock`], where sleeping only advances a counter.
pub trait Clock: Send + Sync {
    /// Get the current UTC datetime
    fn now_utc(&self) -> DateTime<Utc>;

    /// Block the calling thread for a duration
    fn sleep(&self, duration: Duration);

    /// Current time as fractional Unix seconds
    fn timestamp(&self) -> f64 {
        self.now_utc().timestamp_micros() as f64 / 1_000_000.0
    }
}

/// Real clock implementation using system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Source of randomness for the simulation
///
/// Only two primitives are required; everything else is derived from them
/// so that a seeded or scripted source yields the same sequence everywhere.
pub trait RandomSource: Send {
    /// Uniform float in `[0, 1)`
    fn next_f64(&mut self) -> f64;

    /// Uniform index in `[0, n)`. `n` must be non-zero.
    fn next_index(&mut self, n: usize) -> usize;

    /// Uniform float in `[low, high)`
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Bernoulli trial with the given success probability
    fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }
}

impl dyn RandomSource + '_ {
    /// Fisher-Yates shuffle driven by this source
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_index(i + 1);
            items.swap(i, j);
        }
    }

    /// Pick `count` distinct elements, in selection order
    ///
    /// `count` is clamped to the number of available items.
    pub fn sample<T: Clone>(&mut self, items: &[T], count: usize) -> Vec<T> {
        let count = count.min(items.len());
        let mut pool: Vec<T> = items.to_vec();
        for i in 0..count {
            let j = i + self.next_index(pool.len() - i);
            pool.swap(i, j);
        }
        pool.truncate(count);
        pool
    }
}

/// Prometheus-style time-series source
///
/// `query` returns every series matching `metric` over the last
/// `range_hours`. Transport failures surface as [`TelemetryError`]; the twin
/// treats them as non-fatal.
pub trait TelemetrySource: Send + Sync {
    fn query(&self, metric: &str, range_hours: u32) -> Result<Vec<MetricSeries>, TelemetryError>;
}
