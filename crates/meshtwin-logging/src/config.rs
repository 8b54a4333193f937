//! Logging configuration
//!
//! Lives in the `[log]` table of the twin's TOML file:
//!
//! ```toml
//! [log]
//! level = "meshtwin_simulation=debug,info"
//! console = "pretty"
//!
//! [log.file]
//! directory = "./logs"
//! rotation = "hourly"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// What the subscriber writes and where
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directives, used when `RUST_LOG` is unset
    pub level: String,
    pub console: ConsoleOutput,
    /// Colors on pretty console output
    pub ansi: bool,
    /// JSONL file output
    pub file: Option<FileOutput>,
    /// Source file and line on JSON lines
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: ConsoleOutput::Json,
            ansi: false,
            file: None,
            include_location: true,
        }
    }
}

impl LogConfig {
    /// Debug level, human-readable console
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            console: ConsoleOutput::Pretty,
            ansi: true,
            ..Default::default()
        }
    }

    /// Daily-rotated JSONL files under `log_dir`, nothing on the console
    pub fn production(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            console: ConsoleOutput::Off,
            file: Some(FileOutput {
                directory: log_dir.into(),
                ..FileOutput::default()
            }),
            ..Default::default()
        }
    }

    /// Warnings only, plain console
    pub fn testing() -> Self {
        Self {
            level: "warn".to_string(),
            console: ConsoleOutput::Pretty,
            ..Default::default()
        }
    }

    /// One JSONL file per chaos invocation, kept next to the twin config
    ///
    /// The file is `<config_dir>/logs/<twin_id>-chaos.jsonl` and is replaced
    /// by the next run. Debug spans are kept so every line carries the run id.
    pub fn chaos_run(config_dir: &Path, twin_id: &str) -> Self {
        Self {
            level: "debug".to_string(),
            console: ConsoleOutput::Off,
            file: Some(FileOutput {
                directory: config_dir.join("logs"),
                prefix: format!("{twin_id}-chaos"),
                rotation: RotationStrategy::Never,
            }),
            ..Default::default()
        }
    }

    /// `RUST_LOG` when set, otherwise [`LogConfig::level`]
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    /// Path of the single log file, when file output does not rotate
    pub fn log_file(&self) -> Option<PathBuf> {
        self.file.as_ref().and_then(FileOutput::single_file)
    }
}

/// Console format; output goes to stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleOutput {
    Off,
    #[default]
    Json,
    Pretty,
}

/// JSONL file output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutput {
    pub directory: PathBuf,
    /// File name prefix
    pub prefix: String,
    pub rotation: RotationStrategy,
}

impl Default for FileOutput {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "meshtwin".to_string(),
            rotation: RotationStrategy::Daily,
        }
    }
}

impl FileOutput {
    fn single_file(&self) -> Option<PathBuf> {
        (self.rotation == RotationStrategy::Never)
            .then(|| self.directory.join(format!("{}.jsonl", self.prefix)))
    }
}

/// File rotation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationStrategy {
    #[default]
    Daily,
    Hourly,
    /// One file, truncated when the subscriber starts
    Never,
}
