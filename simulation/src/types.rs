//! Core types for the mesh digital twin
//!
//! Nodes and links are plain state-carrying records. Only the twin mutates
//! their `state`; callers build them, hand them over, and read clones back.

use std::collections::{BTreeMap, VecDeque};

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Capacity of a node's state-history ring buffer
pub const STATE_HISTORY_CAPACITY: usize = 100;
/// Capacity of a node's or link's metrics-history ring buffer
pub const METRICS_HISTORY_CAPACITY: usize = 1000;

/// Operational state of a node
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    #[default]
    #[display("healthy")]
    Healthy,
    #[display("degraded")]
    Degraded,
    #[display("failed")]
    Failed,
    #[display("recovering")]
    Recovering,
    #[display("isolated")]
    Isolated,
}

/// Operational state of a link
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    #[default]
    #[display("up")]
    Up,
    #[display("degraded")]
    Degraded,
    #[display("down")]
    Down,
    #[display("congested")]
    Congested,
}

/// Bounded append-only history; the oldest entry is evicted when full
#[derive(Debug, Clone, PartialEq)]
pub struct History<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> History<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    pub fn push(&mut self, entry: T) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest retained entry
    pub fn oldest(&self) -> Option<&T> {
        self.entries.front()
    }

    /// Newest entry
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

/// Snapshot recorded on every node state transition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub state: NodeState,
    pub timestamp: f64,
    pub cpu: f64,
    pub memory: f64,
}

/// One ingested metric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub metric: String,
    pub value: f64,
    pub timestamp: f64,
}

/// Digital twin representation of a mesh node
#[derive(Debug, Clone, PartialEq)]
pub struct TwinNode {
    pub node_id: String,
    pub state: NodeState,
    /// 0-100 %
    pub cpu_usage: f64,
    /// 0-100 %
    pub memory_usage: f64,
    /// Seconds
    pub uptime: f64,
    /// 0-1
    pub trust_score: f64,
    /// x, y for visualization
    pub position: (f64, f64),
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub state_history: History<StateSnapshot>,
    pub metrics_history: History<MetricSnapshot>,
}

impl TwinNode {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            state: NodeState::Healthy,
            cpu_usage: 0.0,
            memory_usage: 0.0,
            uptime: 0.0,
            trust_score: 1.0,
            position: (0.0, 0.0),
            metadata: BTreeMap::new(),
            state_history: History::with_capacity(STATE_HISTORY_CAPACITY),
            metrics_history: History::with_capacity(METRICS_HISTORY_CAPACITY),
        }
    }

    /// Append the current state to the state history
    pub fn record_state(&mut self, timestamp: f64) {
        self.state_history.push(StateSnapshot {
            state: self.state,
            timestamp,
            cpu: self.cpu_usage,
            memory: self.memory_usage,
        });
    }

    /// Append a metric observation to the metrics history
    pub fn record_metric(&mut self, metric: impl Into<String>, value: f64, timestamp: f64) {
        self.metrics_history.push(MetricSnapshot {
            metric: metric.into(),
            value,
            timestamp,
        });
    }

    /// Wire representation used by exports
    pub fn to_record(&self) -> NodeRecord {
        NodeRecord {
            node_id: self.node_id.clone(),
            state: self.state,
            cpu_usage: self.cpu_usage,
            memory_usage: self.memory_usage,
            uptime: self.uptime,
            trust_score: self.trust_score,
            position: self.position,
        }
    }
}

/// Exported view of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_id: String,
    pub state: NodeState,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub uptime: f64,
    pub trust_score: f64,
    pub position: (f64, f64),
}

/// Digital twin representation of a mesh link
///
/// Links are directed records keyed by `source->target`. Endpoints do not
/// have to exist as nodes: telemetry may describe a link before either
/// node has reported.
#[derive(Debug, Clone, PartialEq)]
pub struct TwinLink {
    pub source: String,
    pub target: String,
    pub state: LinkState,
    pub latency_ms: f64,
    pub bandwidth_mbps: f64,
    /// 0-1
    pub packet_loss: f64,
    /// dBm
    pub rssi: f64,
    /// dB
    pub snr: f64,
    pub metrics_history: History<MetricSnapshot>,
}

impl TwinLink {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            state: LinkState::Up,
            latency_ms: 1.0,
            bandwidth_mbps: 100.0,
            packet_loss: 0.0,
            rssi: -50.0,
            snr: 20.0,
            metrics_history: History::with_capacity(METRICS_HISTORY_CAPACITY),
        }
    }

    pub fn link_id(&self) -> String {
        link_id(&self.source, &self.target)
    }

    /// Direction-independent id
    pub fn canonical_id(&self) -> String {
        canonical_link_id(&self.source, &self.target)
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }

    /// Composite link quality in `[0, 1]`
    ///
    /// 500 ms latency scores zero; RSSI maps -90..-40 dBm onto 0..1.
    pub fn quality_score(&self) -> f64 {
        let latency_score = (1.0 - self.latency_ms / 500.0).max(0.0);
        let loss_score = 1.0 - self.packet_loss;
        let rssi_score = ((self.rssi + 90.0) / 50.0).clamp(0.0, 1.0);

        latency_score * 0.4 + loss_score * 0.4 + rssi_score * 0.2
    }

    pub fn record_metric(&mut self, metric: impl Into<String>, value: f64, timestamp: f64) {
        self.metrics_history.push(MetricSnapshot {
            metric: metric.into(),
            value,
            timestamp,
        });
    }

    /// Wire representation used by exports
    pub fn to_record(&self) -> LinkRecord {
        LinkRecord {
            link_id: self.link_id(),
            source: self.source.clone(),
            target: self.target.clone(),
            state: self.state,
            latency_ms: self.latency_ms,
            bandwidth_mbps: self.bandwidth_mbps,
            packet_loss: self.packet_loss,
            quality_score: self.quality_score(),
        }
    }
}

/// Exported view of a link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub link_id: String,
    pub source: String,
    pub target: String,
    pub state: LinkState,
    pub latency_ms: f64,
    pub bandwidth_mbps: f64,
    pub packet_loss: f64,
    pub quality_score: f64,
}

/// Per-neighbor routing features for a node's outgoing links
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborFeature {
    pub neighbor_id: String,
    pub rssi: f64,
    pub latency_ms: f64,
    pub packet_loss: f64,
    pub hop_count: u32,
    pub bandwidth_mbps: f64,
    pub trust_score: f64,
}

/// `source->target`
pub fn link_id(source: &str, target: &str) -> String {
    format!("{source}->{target}")
}

/// `min(source, target)->max(source, target)`
pub fn canonical_link_id(source: &str, target: &str) -> String {
    if source <= target {
        link_id(source, target)
    } else {
        link_id(target, source)
    }
}

/// Split a link id back into `(source, target)`
pub fn parse_link_id(id: &str) -> Option<(&str, &str)> {
    id.split_once("->")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_defaults() {
        let node = TwinNode::new("n1");
        assert_eq!(node.state, NodeState::Healthy);
        assert_eq!(node.cpu_usage, 0.0);
        assert_eq!(node.trust_score, 1.0);
        assert_eq!(node.position, (0.0, 0.0));
        assert!(node.metadata.is_empty());
        assert!(node.state_history.is_empty());
        assert_eq!(node.state_history.capacity(), 100);
        assert_eq!(node.metrics_history.capacity(), 1000);
    }

    #[test]
    fn test_record_state_evicts_oldest() {
        let mut node = TwinNode::new("n1");
        for i in 0..110 {
            node.cpu_usage = i as f64;
            node.record_state(i as f64);
        }
        assert_eq!(node.state_history.len(), 100);
        assert_eq!(node.state_history.oldest().unwrap().cpu, 10.0);
        assert_eq!(node.state_history.latest().unwrap().cpu, 109.0);
    }

    #[test]
    fn test_record_state_captures_fields() {
        let mut node = TwinNode {
            cpu_usage: 50.0,
            memory_usage: 70.0,
            state: NodeState::Degraded,
            ..TwinNode::new("n1")
        };
        node.record_state(12.0);
        let entry = node.state_history.latest().unwrap();
        assert_eq!(entry.state, NodeState::Degraded);
        assert_eq!(entry.memory, 70.0);
        assert_eq!(entry.timestamp, 12.0);
    }

    #[test]
    fn test_link_defaults_and_id() {
        let link = TwinLink::new("a", "b");
        assert_eq!(link.link_id(), "a->b");
        assert_eq!(link.state, LinkState::Up);
        assert_eq!(link.latency_ms, 1.0);
        assert_eq!(link.bandwidth_mbps, 100.0);
        assert_eq!(link.rssi, -50.0);
        assert_eq!(link.snr, 20.0);
    }

    #[test]
    fn test_quality_score_extremes() {
        let ideal = TwinLink {
            latency_ms: 0.0,
            packet_loss: 0.0,
            rssi: -40.0,
            ..TwinLink::new("a", "b")
        };
        assert!((ideal.quality_score() - 1.0).abs() < 1e-9);

        let worst = TwinLink {
            latency_ms: 500.0,
            packet_loss: 1.0,
            rssi: -90.0,
            ..TwinLink::new("a", "b")
        };
        assert!(worst.quality_score().abs() < 1e-9);
    }

    #[test]
    fn test_quality_score_mid_and_clamped() {
        let mid = TwinLink {
            latency_ms: 250.0,
            packet_loss: 0.5,
            rssi: -65.0,
            ..TwinLink::new("a", "b")
        };
        assert!((mid.quality_score() - 0.5).abs() < 1e-9);

        let weak_radio = TwinLink {
            latency_ms: 0.0,
            packet_loss: 0.0,
            rssi: -100.0,
            ..TwinLink::new("a", "b")
        };
        assert!((weak_radio.quality_score() - 0.8).abs() < 1e-9);

        let slow = TwinLink {
            latency_ms: 1000.0,
            ..TwinLink::new("a", "b")
        };
        assert!(slow.quality_score() >= 0.0);
    }

    #[test]
    fn test_canonical_and_parse() {
        assert_eq!(canonical_link_id("b", "a"), "a->b");
        assert_eq!(canonical_link_id("a", "b"), "a->b");
        assert_eq!(parse_link_id("node-1->node-2"), Some(("node-1", "node-2")));
        assert_eq!(parse_link_id("garbage"), None);
    }

    #[test]
    fn test_records_serialize_with_wire_names() {
        let node = TwinNode {
            state: NodeState::Failed,
            position: (10.0, 20.0),
            ..TwinNode::new("n1")
        };
        let json = serde_json::to_value(node.to_record()).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["position"], serde_json::json!([10.0, 20.0]));

        let link = TwinLink::new("a", "b");
        let json = serde_json::to_value(link.to_record()).unwrap();
        assert_eq!(json["link_id"], "a->b");
        assert_eq!(json["state"], "up");
        assert!(json.get("quality_score").is_some());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(NodeState::Recovering.to_string(), "recovering");
        assert_eq!(LinkState::Congested.to_string(), "congested");
    }
}
