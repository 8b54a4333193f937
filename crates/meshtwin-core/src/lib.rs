//! # Meshtwin Core
//!
//! Core traits, types, and errors shared by the mesh digital twin.
//!
//! The twin itself never touches the network or the wall clock directly.
//! Everything with side effects sits behind a trait defined here so the
//! simulation can run deterministically under test:
//!
//! ## Key Traits
//!
//! - [`Clock`]: Time abstraction (real sleep in production, manual in tests)
//! - [`RandomSource`]: Swappable, seedable randomness
//! - [`TelemetrySource`]: Prometheus-style range queries feeding the twin
//!
//! ## Key Types
//!
//! - [`TwinError`] / [`TelemetryError`]: Error taxonomy
//! - [`MetricSeries`] / [`Sample`]: Time-series returned by a telemetry source
//! - [`ManualClock`], [`SeededRandom`], [`StaticTelemetrySource`]: test doubles

pub mod error;
pub mod mock_clock;
pub mod random;
pub mod telemetry;
pub mod traits;

// Re-export main types
pub use error::*;
pub use mock_clock::*;
pub use random::*;
pub use telemetry::*;
pub use traits::*;
