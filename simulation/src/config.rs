//! Twin configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! twin_id = "lab-mesh"
//! monitoring_delay_ms = 0
//! route_metric = "latency"
//! seed = 42
//!
//! [partition_connectivity]
//! mode = "smaller_group_ratio"
//!
//! [log]
//! level = "debug"
//! ```

use std::path::Path;
use std::time::Duration;

use meshtwin_core::TwinError;
use meshtwin_logging::LogConfig;
use serde::{Deserialize, Serialize};

/// Path metric used when planning alternate routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMetric {
    /// Fewest hops (BFS)
    #[default]
    Hops,
    /// Lowest summed link latency (Dijkstra)
    Latency,
}

/// How a partition result reports `connectivity_maintained`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PartitionConnectivity {
    /// Constant value regardless of group sizes
    Fixed { value: f64 },
    /// `min(|A|, |B|) / (|A| + |B|)`
    SmallerGroupRatio,
}

impl Default for PartitionConnectivity {
    fn default() -> Self {
        PartitionConnectivity::Fixed { value: 0.5 }
    }
}

impl PartitionConnectivity {
    pub fn evaluate(&self, group_a: usize, group_b: usize) -> f64 {
        match *self {
            PartitionConnectivity::Fixed { value } => value,
            PartitionConnectivity::SmallerGroupRatio => {
                let total = group_a + group_b;
                if total == 0 {
                    1.0
                } else {
                    group_a.min(group_b) as f64 / total as f64
                }
            }
        }
    }
}

/// Configuration for a [`crate::MeshDigitalTwin`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwinConfig {
    pub twin_id: String,
    /// Real time spent "monitoring" during a node failure
    pub monitoring_delay_ms: u64,
    pub route_metric: RouteMetric,
    pub partition_connectivity: PartitionConnectivity,
    /// Used by the chaos runner's cascade runs
    pub cascade_propagation_probability: f64,
    pub max_alternate_routes: usize,
    pub max_cascade_waves: u32,
    /// Lookback window for telemetry ingestion
    pub ingest_window_hours: u32,
    /// Fixed RNG seed; entropy when absent
    pub seed: Option<u64>,
    pub log: LogConfig,
}

impl Default for TwinConfig {
    fn default() -> Self {
        Self {
            twin_id: "mesh-twin".to_string(),
            monitoring_delay_ms: 10,
            route_metric: RouteMetric::default(),
            partition_connectivity: PartitionConnectivity::default(),
            cascade_propagation_probability: 0.3,
            max_alternate_routes: 10,
            max_cascade_waves: 10,
            ingest_window_hours: 24,
            seed: None,
            log: LogConfig::default(),
        }
    }
}

impl TwinConfig {
    /// Config for tests: no monitoring delay, fixed seed, quiet logs
    pub fn testing() -> Self {
        Self {
            monitoring_delay_ms: 0,
            seed: Some(42),
            log: LogConfig::testing(),
            ..Default::default()
        }
    }

    pub fn from_toml_str(data: &str) -> Result<Self, TwinError> {
        let config: TwinConfig =
            toml::from_str(data).map_err(|e| TwinError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TwinError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_toml_str(&data)
    }

    pub fn validate(&self) -> Result<(), TwinError> {
        if !(0.0..=1.0).contains(&self.cascade_propagation_probability) {
            return Err(TwinError::Config(format!(
                "cascade_propagation_probability must be within [0, 1], got {}",
                self.cascade_propagation_probability
            )));
        }
        if let PartitionConnectivity::Fixed { value } = self.partition_connectivity
            && !(0.0..=1.0).contains(&value)
        {
            return Err(TwinError::Config(format!(
                "fixed partition connectivity must be within [0, 1], got {value}"
            )));
        }
        if self.twin_id.is_empty() {
            return Err(TwinError::Config("twin_id must not be empty".into()));
        }
        Ok(())
    }

    pub fn monitoring_delay(&self) -> Duration {
        Duration::from_millis(self.monitoring_delay_ms)
    }

    pub fn to_toml_string(&self) -> Result<String, TwinError> {
        toml::to_string_pretty(self).map_err(|e| TwinError::Serialization(e.to_string()))
    }
}
