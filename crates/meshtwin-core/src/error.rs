//! Error types for the mesh digital twin
//!
//! Fault injection itself never fails: unknown targets produce a degenerate
//! result rather than an error. These types cover the ambient surfaces
//! around the engine (configuration, export, telemetry).

use thiserror::Error;

/// Top-level error type for the twin
#[derive(Debug, Error)]
pub enum TwinError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

impl From<serde_json::Error> for TwinError {
    fn from(err: serde_json::Error) -> Self {
        TwinError::Serialization(err.to_string())
    }
}

/// Errors raised by a telemetry source
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("Telemetry source unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed telemetry response: {0}")]
    Malformed(String),

    #[error("Query failed for {metric}: {reason}")]
    Query { metric: String, reason: String },
}
