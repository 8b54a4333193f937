//! Statistics and export records

use serde::{Deserialize, Serialize};

use crate::types::{LinkRecord, NodeRecord};

/// Summary of the twin's recovery-time history
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MttrStatistics {
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
    pub min: f64,
    pub max: f64,
    pub samples: usize,
}

impl MttrStatistics {
    /// All fields zero for an empty slice
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();

        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        Self {
            mean: sorted.iter().sum::<f64>() / n as f64,
            median,
            p95: percentile_95(&sorted),
            min: sorted[0],
            max: sorted[n - 1],
            samples: n,
        }
    }
}

/// `sorted[floor(0.95 n)]`, clamped to the last index
///
/// `sorted` must be non-empty and ascending.
pub(crate) fn percentile_95(sorted: &[f64]) -> f64 {
    let index = ((sorted.len() as f64 * 0.95) as usize).min(sorted.len() - 1);
    sorted[index]
}

/// Current topology health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyStats {
    pub total_nodes: usize,
    pub healthy_nodes: usize,
    pub total_links: usize,
    pub up_links: usize,
    pub avg_link_quality: f64,
    /// Fraction of nodes healthy; 1.0 for an empty twin
    pub connectivity: f64,
    pub components: usize,
}

/// Full JSON export of a twin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwinExport {
    pub twin_id: String,
    /// Unix seconds
    pub timestamp: f64,
    pub topology: TopologyStats,
    pub mttr: MttrStatistics,
    pub nodes: Vec<NodeRecord>,
    pub links: Vec<LinkRecord>,
}
