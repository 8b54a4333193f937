//! Structured logging for the mesh digital twin
//!
//! Thin layer over `tracing-subscriber` that every meshtwin binary uses to
//! set up output.
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines for log aggregation (default)
//! - **Pretty Console**: Human-readable output for development
//! - **File Rotation**: Daily/hourly log rotation via tracing-appender
//! - **Run Context**: [`TwinContextGuard`] names a chaos run; its ids go on the run's span
//!
//! # Quick Start
//!
//! ```ignore
//! use meshtwin_logging::{LogConfig, TwinSubscriberBuilder};
//!
//! let _guard = TwinSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init()?;
//! ```

pub mod config;
pub mod context;
pub mod layers;

pub use config::{ConsoleOutput, FileOutput, LogConfig, RotationStrategy};
pub use context::{TwinContextData, TwinContextGuard};
pub use layers::jsonl_layer;

use std::fs::{self, File};

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Failed to prepare log output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to create rolling log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Builder for configuring and initializing the logging subscriber
///
/// By default console output uses JSONL. Use [`LogConfig::development()`]
/// for human-readable output. Console output goes to stderr; stdout is left
/// to the binaries for their results.
pub struct TwinSubscriberBuilder {
    config: LogConfig,
}

impl TwinSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Install the subscriber globally
    ///
    /// The returned guard (present when file output is enabled) must be kept
    /// alive for the lifetime of the program so buffered lines get flushed.
    pub fn init(self) -> Result<Option<WorkerGuard>, LogError> {
        let config = &self.config;
        let location = config.include_location;

        let (file_layer, guard) = match &config.file {
            Some(file) => {
                let (writer, guard) = create_file_writer(file)?;
                (Some(jsonl_layer(writer, location)), Some(guard))
            }
            None => (None, None),
        };

        let pretty = (config.console == ConsoleOutput::Pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(config.ansi)
                .with_target(true)
        });
        let json = (config.console == ConsoleOutput::Json).then(|| jsonl_layer(std::io::stderr, location));

        Registry::default()
            .with(config.env_filter())
            .with(pretty)
            .with(json)
            .with(file_layer)
            .try_init()
            .map_err(|_| LogError::AlreadyInitialized)?;

        Ok(guard)
    }
}

impl Default for TwinSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Open the writer for file output; `Never` truncates a single file
fn create_file_writer(file: &FileOutput) -> Result<(NonBlocking, WorkerGuard), LogError> {
    let rotation = match file.rotation {
        RotationStrategy::Never => {
            fs::create_dir_all(&file.directory)?;
            let path = file.directory.join(format!("{}.jsonl", file.prefix));
            return Ok(tracing_appender::non_blocking(File::create(path)?));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&file.prefix)
        .filename_suffix("jsonl")
        .build(&file.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Install [`LogConfig::testing`] once per process; later calls are no-ops
pub fn init_testing() {
    let _ = TwinSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .init();
}
