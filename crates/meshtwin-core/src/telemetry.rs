//! Telemetry series and sources
//!
//! A telemetry source answers Prometheus-style range queries. Two
//! implementations live here:
//!
//! - [`StaticTelemetrySource`]: in-memory series, optionally failing on
//!   chosen metrics (used by tests)
//! - [`RecordedPrometheusSource`]: replays `query_range` responses saved
//!   to disk as `<metric>.json`

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TelemetryError;
use crate::traits::TelemetrySource;

/// A single timestamped observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: f64,
    pub value: f64,
}

/// One labelled time series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub labels: BTreeMap<String, String>,
    pub samples: Vec<Sample>,
}

impl MetricSeries {
    pub fn new<I, K, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            samples: Vec::new(),
        }
    }

    pub fn with_sample(mut self, timestamp: f64, value: f64) -> Self {
        self.samples.push(Sample { timestamp, value });
        self
    }

    /// Label value, or `"unknown"` when absent
    pub fn label(&self, key: &str) -> &str {
        self.labels.get(key).map(String::as_str).unwrap_or("unknown")
    }

    /// Most recent sample, if any
    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }
}

/// In-memory telemetry source
#[derive(Debug, Clone, Default)]
pub struct StaticTelemetrySource {
    series: BTreeMap<String, Vec<MetricSeries>>,
    failing: BTreeSet<String>,
}

impl StaticTelemetrySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series for a metric
    pub fn with_series(mut self, metric: impl Into<String>, series: MetricSeries) -> Self {
        self.series.entry(metric.into()).or_default().push(series);
        self
    }

    /// Make every query for `metric` fail
    pub fn failing_on(mut self, metric: impl Into<String>) -> Self {
        self.failing.insert(metric.into());
        self
    }
}

impl TelemetrySource for StaticTelemetrySource {
    fn query(&self, metric: &str, _range_hours: u32) -> Result<Vec<MetricSeries>, TelemetryError> {
        if self.failing.contains(metric) {
            return Err(TelemetryError::Unavailable(format!(
                "static source configured to fail on {metric}"
            )));
        }
        Ok(self.series.get(metric).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct PromResponse {
    status: String,
    #[serde(default)]
    data: Option<PromData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromData {
    #[serde(rename = "resultType")]
    result_type: String,
    #[serde(default)]
    result: Vec<PromSeries>,
}

#[derive(Debug, Deserialize)]
struct PromSeries {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    #[serde(default)]
    values: Vec<(f64, String)>,
}

/// Parse a Prometheus `query_range` response body into series
///
/// Only `matrix` results are accepted. Sample values arrive as strings and
/// must parse as floats.
pub fn parse_range_response(metric: &str, body: &str) -> Result<Vec<MetricSeries>, TelemetryError> {
    let response: PromResponse =
        serde_json::from_str(body).map_err(|e| TelemetryError::Malformed(e.to_string()))?;

    if response.status != "success" {
        return Err(TelemetryError::Query {
            metric: metric.to_string(),
            reason: response.error.unwrap_or_else(|| response.status.clone()),
        });
    }

    let data = response
        .data
        .ok_or_else(|| TelemetryError::Malformed("missing data section".into()))?;

    if data.result_type != "matrix" {
        return Err(TelemetryError::Malformed(format!(
            "expected matrix result, got {}",
            data.result_type
        )));
    }

    data.result
        .into_iter()
        .map(|series| {
            let samples = series
                .values
                .into_iter()
                .map(|(timestamp, raw)| {
                    raw.parse::<f64>()
                        .map(|value| Sample { timestamp, value })
                        .map_err(|_| TelemetryError::Malformed(format!("bad sample value {raw:?}")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(MetricSeries {
                labels: series.metric,
                samples,
            })
        })
        .collect()
}

/// Replays recorded Prometheus responses from a directory
///
/// The directory must exist. A metric without a recording yields no
/// series, the same as an empty Prometheus result.
#[derive(Debug, Clone)]
pub struct RecordedPrometheusSource {
    dir: PathBuf,
}

impl RecordedPrometheusSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TelemetrySource for RecordedPrometheusSource {
    fn query(&self, metric: &str, range_hours: u32) -> Result<Vec<MetricSeries>, TelemetryError> {
        if !self.dir.is_dir() {
            return Err(TelemetryError::Unavailable(format!(
                "recording directory {} does not exist",
                self.dir.display()
            )));
        }

        let path = self.dir.join(format!("{metric}.json"));
        if !path.exists() {
            debug!(metric, "No recording for metric");
            return Ok(Vec::new());
        }

        let body = std::fs::read_to_string(&path)
            .map_err(|e| TelemetryError::Unavailable(format!("{}: {e}", path.display())))?;
        debug!(metric, range_hours, path = %path.display(), "Replaying recorded range query");
        parse_range_response(metric, &body)
    }
}
