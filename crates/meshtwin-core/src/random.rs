//! Randomness implementations

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::traits::RandomSource;

/// [`RandomSource`] backed by a seedable `StdRng`
///
/// The same seed always produces the same sequence, which is what makes
/// topology generation and cascade propagation reproducible in tests.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Deterministic source from a fixed seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Non-deterministic source seeded from the OS
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl Default for SeededRandom {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    fn next_index(&mut self, n: usize) -> usize {
        self.rng.random_range(0..n)
    }
}

/// Scripted source replaying a fixed list of floats
///
/// Once the script runs out it keeps returning the last value (or `0.0`
/// for an empty script). Handy for forcing a cascade to always or never
/// propagate.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedRandom {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, cursor: 0 }
    }

    /// A source that always returns `value`
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&mut self) -> f64 {
        let value = self
            .values
            .get(self.cursor)
            .or_else(|| self.values.last())
            .copied()
            .unwrap_or(0.0);
        self.cursor += 1;
        value
    }

    fn next_index(&mut self, n: usize) -> usize {
        ((self.next_f64() * n as f64) as usize).min(n.saturating_sub(1))
    }
}
