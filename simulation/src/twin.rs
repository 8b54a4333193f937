//! The mesh digital twin
//!
//! [`MeshDigitalTwin`] owns the node map, the link map and the topology
//! graph behind a single lock. The graph always mirrors the maps:
//!
//! - `graph.has_node(id)` iff `id` is a registered node
//! - `graph.has_edge(s, t)` iff `"s->t"` is a registered link
//!
//! Links may reference node ids that were never added. Telemetry can report
//! a link before either endpoint has reported its own metrics.
//!
//! Fault injection lives in [`crate::faults`]; this module covers topology
//! management, telemetry ingestion, consumer accessors and export.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use meshtwin_core::{
    Clock, RandomSource, SeededRandom, SystemClock, TelemetrySource, TwinError,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::TwinConfig;
use crate::result::{ScenarioEvent, SimEvent};
use crate::stats::{MttrStatistics, TopologyStats, TwinExport};
use crate::topology::{Topology, TopologyGraph};
use crate::types::{LinkState, NeighborFeature, NodeState, TwinLink, TwinNode, link_id};

/// Node attributes fed from telemetry
#[derive(Debug, Clone, Copy)]
enum NodeMetric {
    Cpu,
    Memory,
    Uptime,
    Trust,
}

impl NodeMetric {
    fn apply(self, node: &mut TwinNode, value: f64) {
        match self {
            NodeMetric::Cpu => node.cpu_usage = value,
            NodeMetric::Memory => node.memory_usage = value,
            NodeMetric::Uptime => node.uptime = value,
            NodeMetric::Trust => node.trust_score = value,
        }
    }
}

/// Link attributes fed from telemetry
#[derive(Debug, Clone, Copy)]
enum LinkMetric {
    Latency,
    PacketLoss,
    Rssi,
}

impl LinkMetric {
    fn apply(self, link: &mut TwinLink, value: f64) {
        match self {
            LinkMetric::Latency => link.latency_ms = value,
            LinkMetric::PacketLoss => link.packet_loss = value,
            LinkMetric::Rssi => link.rssi = value,
        }
    }
}

const NODE_METRICS: [(&str, NodeMetric); 4] = [
    ("mesh_node_cpu_usage", NodeMetric::Cpu),
    ("mesh_node_memory_usage", NodeMetric::Memory),
    ("mesh_node_uptime_seconds", NodeMetric::Uptime),
    ("mesh_node_trust_score", NodeMetric::Trust),
];

const LINK_METRICS: [(&str, LinkMetric); 3] = [
    ("mesh_link_latency_ms", LinkMetric::Latency),
    ("mesh_link_packet_loss", LinkMetric::PacketLoss),
    ("mesh_link_rssi", LinkMetric::Rssi),
];

/// Everything guarded by the twin's lock
pub(crate) struct TwinState {
    pub(crate) nodes: BTreeMap<String, TwinNode>,
    /// Keyed by `source->target`
    pub(crate) links: BTreeMap<String, TwinLink>,
    pub(crate) graph: TopologyGraph,
    pub(crate) events: Vec<ScenarioEvent>,
    pub(crate) failure_start_times: BTreeMap<String, f64>,
    pub(crate) recovery_times: Vec<f64>,
    pub(crate) rng: Box<dyn RandomSource>,
}

impl TwinState {
    fn new(rng: Box<dyn RandomSource>) -> Self {
        Self {
            nodes: BTreeMap::new(),
            links: BTreeMap::new(),
            graph: TopologyGraph::new(),
            events: Vec::new(),
            failure_start_times: BTreeMap::new(),
            recovery_times: Vec::new(),
            rng,
        }
    }

    pub(crate) fn insert_node(&mut self, node: TwinNode) {
        self.graph.add_node(&node.node_id);
        self.nodes.insert(node.node_id.clone(), node);
    }

    pub(crate) fn insert_link(&mut self, link: TwinLink) {
        self.graph.add_edge(&link.source, &link.target, link.latency_ms);
        self.links.insert(link.link_id(), link);
    }

    pub(crate) fn remove_node(&mut self, node_id: &str) -> bool {
        if self.nodes.remove(node_id).is_none() {
            return false;
        }
        self.links.retain(|_, link| !link.touches(node_id));
        self.graph.remove_node(node_id);
        true
    }

    pub(crate) fn remove_link(&mut self, source: &str, target: &str) -> bool {
        if self.links.remove(&link_id(source, target)).is_none() {
            return false;
        }
        self.graph.remove_edge(source, target);
        true
    }

    /// Fraction of nodes healthy; 1.0 when there are none
    pub(crate) fn connectivity(&self) -> f64 {
        if self.nodes.is_empty() {
            return 1.0;
        }
        let healthy = self
            .nodes
            .values()
            .filter(|n| n.state == NodeState::Healthy)
            .count();
        healthy as f64 / self.nodes.len() as f64
    }

    /// Transition a registered node and snapshot it; false if unknown
    pub(crate) fn transition(&mut self, node_id: &str, state: NodeState, timestamp: f64) -> bool {
        match self.nodes.get_mut(node_id) {
            Some(node) => {
                node.state = state;
                node.record_state(timestamp);
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_link_states(&mut self, link_ids: &[String], state: LinkState) {
        for id in link_ids {
            if let Some(link) = self.links.get_mut(id) {
                link.state = state;
            }
        }
    }

    pub(crate) fn log_events(&mut self, scenario: &str, events: &[SimEvent]) {
        self.events.extend(events.iter().map(|event| ScenarioEvent {
            scenario: scenario.to_string(),
            event: event.clone(),
        }));
    }

    fn topology_stats(&self) -> TopologyStats {
        let total_links = self.links.len();
        let avg_link_quality = if total_links == 0 {
            0.0
        } else {
            self.links.values().map(TwinLink::quality_score).sum::<f64>() / total_links as f64
        };

        TopologyStats {
            total_nodes: self.nodes.len(),
            healthy_nodes: self
                .nodes
                .values()
                .filter(|n| n.state == NodeState::Healthy)
                .count(),
            total_links,
            up_links: self
                .links
                .values()
                .filter(|l| l.state == LinkState::Up)
                .count(),
            avg_link_quality,
            connectivity: self.connectivity(),
            components: self.graph.connected_components().len(),
        }
    }
}

/// In-memory model of a mesh network
///
/// `Send + Sync`; share it through an `Arc`. Every operation takes the
/// internal lock, so calls from many threads serialize. Overlapping chaos on
/// the same nodes is last-writer-wins.
pub struct MeshDigitalTwin {
    twin_id: String,
    config: TwinConfig,
    pub(crate) clock: Arc<dyn Clock>,
    telemetry: Option<Box<dyn TelemetrySource>>,
    pub(crate) state: Mutex<TwinState>,
}

impl MeshDigitalTwin {
    /// Twin with default configuration and the given id
    pub fn new(twin_id: impl Into<String>) -> Self {
        Self::from_config(TwinConfig {
            twin_id: twin_id.into(),
            ..Default::default()
        })
    }

    /// Real clock; seeded RNG when the config carries a seed
    pub fn from_config(config: TwinConfig) -> Self {
        let rng: Box<dyn RandomSource> = match config.seed {
            Some(seed) => Box::new(SeededRandom::new(seed)),
            None => Box::new(SeededRandom::from_entropy()),
        };
        info!(twin_id = %config.twin_id, seed = ?config.seed, "Creating mesh digital twin");
        Self {
            twin_id: config.twin_id.clone(),
            config,
            clock: Arc::new(SystemClock),
            telemetry: None,
            state: Mutex::new(TwinState::new(rng)),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_random(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.state.get_mut().rng = rng;
        self
    }

    pub fn with_telemetry(mut self, source: Box<dyn TelemetrySource>) -> Self {
        self.telemetry = Some(source);
        self
    }

    pub fn twin_id(&self) -> &str {
        &self.twin_id
    }

    pub fn config(&self) -> &TwinConfig {
        &self.config
    }

    // ---------------------------------------------------------------------
    // Topology management
    // ---------------------------------------------------------------------

    /// Insert or overwrite a node
    pub fn add_node(&self, node: TwinNode) {
        debug!(node_id = %node.node_id, "Adding node");
        self.state.lock().insert_node(node);
    }

    /// Insert or overwrite a link; endpoints need not exist
    pub fn add_link(&self, link: TwinLink) {
        debug!(link_id = %link.link_id(), "Adding link");
        self.state.lock().insert_link(link);
    }

    /// Remove a node and every link touching it; false if unknown
    pub fn remove_node(&self, node_id: &str) -> bool {
        let removed = self.state.lock().remove_node(node_id);
        if removed {
            debug!(node_id, "Removed node");
        }
        removed
    }

    /// Remove one directed link record; false if it did not exist
    pub fn remove_link(&self, source: &str, target: &str) -> bool {
        self.state.lock().remove_link(source, target)
    }

    /// Load a prebuilt topology, upserting every node and link
    pub fn apply_topology(&self, topology: Topology) {
        let mut state = self.state.lock();
        for node in topology.nodes {
            state.insert_node(node);
        }
        for link in topology.links {
            state.insert_link(link);
        }
        info!(
            nodes = state.nodes.len(),
            links = state.links.len(),
            "Applied topology"
        );
    }

    /// Random topology of `node-0..node-{n-1}`
    ///
    /// Every unordered pair `i < j` gets a link `node-i -> node-j` with
    /// probability `connectivity`. All draws come from the twin's RNG.
    pub fn create_test_topology(&self, num_nodes: usize, connectivity: f64) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let mut ids = Vec::with_capacity(num_nodes);
        for i in 0..num_nodes {
            let mut node = TwinNode::new(format!("node-{i}"));
            node.position = (state.rng.uniform(0.0, 100.0), state.rng.uniform(0.0, 100.0));
            node.cpu_usage = state.rng.uniform(10.0, 50.0);
            node.memory_usage = state.rng.uniform(20.0, 60.0);
            ids.push(node.node_id.clone());
            state.insert_node(node);
        }

        for (i, source) in ids.iter().enumerate() {
            for target in &ids[i + 1..] {
                if state.rng.chance(connectivity) {
                    let mut link = TwinLink::new(source, target);
                    link.latency_ms = state.rng.uniform(1.0, 50.0);
                    link.bandwidth_mbps = state.rng.uniform(10.0, 100.0);
                    link.rssi = state.rng.uniform(-80.0, -40.0);
                    state.insert_link(link);
                }
            }
        }

        info!(
            nodes = state.nodes.len(),
            links = state.links.len(),
            "Created test topology"
        );
    }

    pub fn node(&self, node_id: &str) -> Option<TwinNode> {
        self.state.lock().nodes.get(node_id).cloned()
    }

    pub fn link(&self, source: &str, target: &str) -> Option<TwinLink> {
        self.state.lock().links.get(&link_id(source, target)).cloned()
    }

    /// Sorted node ids
    pub fn node_ids(&self) -> Vec<String> {
        self.state.lock().nodes.keys().cloned().collect()
    }

    /// Sorted link ids
    pub fn link_ids(&self) -> Vec<String> {
        self.state.lock().links.keys().cloned().collect()
    }

    pub fn node_count(&self) -> usize {
        self.state.lock().nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.state.lock().links.len()
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.state.lock().nodes.contains_key(node_id)
    }

    /// Graph neighbors regardless of link direction, sorted
    pub fn neighbors(&self, node_id: &str) -> Vec<String> {
        self.state.lock().graph.neighbors(node_id).into_iter().collect()
    }

    /// Whether the graph mirrors the node and link maps exactly
    pub fn is_consistent(&self) -> bool {
        let state = self.state.lock();
        state.graph.node_count() == state.nodes.len()
            && state.nodes.keys().all(|id| state.graph.has_node(id))
            && state.graph.edge_count() == state.links.len()
            && state
                .links
                .values()
                .all(|l| state.graph.has_edge(&l.source, &l.target))
    }

    // ---------------------------------------------------------------------
    // Routing consumer surface
    // ---------------------------------------------------------------------

    /// One feature vector per outgoing link of `node_id`
    ///
    /// Trust is the neighbor's when it is a known node, else the source
    /// node's own.
    pub fn neighbor_features(&self, node_id: &str) -> Vec<NeighborFeature> {
        let state = self.state.lock();
        let own_trust = state.nodes.get(node_id).map_or(1.0, |n| n.trust_score);

        state
            .links
            .values()
            .filter(|link| link.source == node_id)
            .map(|link| NeighborFeature {
                neighbor_id: link.target.clone(),
                rssi: link.rssi,
                latency_ms: link.latency_ms,
                packet_loss: link.packet_loss,
                hop_count: 1,
                bandwidth_mbps: link.bandwidth_mbps,
                trust_score: state
                    .nodes
                    .get(&link.target)
                    .map_or(own_trust, |n| n.trust_score),
            })
            .collect()
    }

    /// Force a node into a state; false if the node is unknown
    pub fn set_node_state(&self, node_id: &str, new_state: NodeState) -> bool {
        let timestamp = self.clock.timestamp();
        let changed = self.state.lock().transition(node_id, new_state, timestamp);
        if changed {
            debug!(node_id, state = %new_state, "Node state set externally");
        }
        changed
    }

    pub fn node_state(&self, node_id: &str) -> Option<NodeState> {
        self.state.lock().nodes.get(node_id).map(|n| n.state)
    }

    // ---------------------------------------------------------------------
    // Telemetry ingestion
    // ---------------------------------------------------------------------

    /// Pull node and link metrics from the telemetry source
    ///
    /// Returns the number of samples observed. Missing nodes and links are
    /// created with defaults. A source error stops ingestion and the count
    /// gathered so far is returned.
    pub fn ingest_from_source(&self, duration_hours: u32) -> usize {
        let Some(source) = self.telemetry.as_deref() else {
            warn!("Telemetry source not configured");
            return 0;
        };

        let mut count = 0;

        for (metric, field) in NODE_METRICS {
            let series = match source.query(metric, duration_hours) {
                Ok(series) => series,
                Err(e) => {
                    warn!(metric, error = %e, "Telemetry ingestion aborted");
                    return count;
                }
            };

            let mut state = self.state.lock();
            for item in series {
                let node_id = item.label("node_id").to_string();
                if !state.nodes.contains_key(&node_id) {
                    state.insert_node(TwinNode::new(&node_id));
                }
                if let (Some(last), Some(node)) = (item.last(), state.nodes.get_mut(&node_id)) {
                    field.apply(node, last.value);
                    node.record_metric(metric, last.value, last.timestamp);
                    count += item.samples.len();
                }
            }
        }

        for (metric, field) in LINK_METRICS {
            let series = match source.query(metric, duration_hours) {
                Ok(series) => series,
                Err(e) => {
                    warn!(metric, error = %e, "Telemetry ingestion aborted");
                    return count;
                }
            };

            let mut guard = self.state.lock();
            let state = &mut *guard;
            for item in series {
                let source_id = item.label("source").to_string();
                let target_id = item.label("target").to_string();
                let id = link_id(&source_id, &target_id);
                if !state.links.contains_key(&id) {
                    state.insert_link(TwinLink::new(&source_id, &target_id));
                }
                let Some(last) = item.last() else {
                    continue;
                };
                if let Some(link) = state.links.get_mut(&id) {
                    field.apply(link, last.value);
                    link.record_metric(metric, last.value, last.timestamp);
                    count += item.samples.len();
                    state.graph.add_edge(&source_id, &target_id, link.latency_ms);
                }
            }
        }

        info!(count, "Ingested telemetry samples");
        count
    }

    /// Ingest over the configured lookback window
    pub fn ingest(&self) -> usize {
        self.ingest_from_source(self.config.ingest_window_hours)
    }

    // ---------------------------------------------------------------------
    // Statistics and export
    // ---------------------------------------------------------------------

    /// Snapshot of every event emitted by every scenario so far
    pub fn events(&self) -> Vec<ScenarioEvent> {
        self.state.lock().events.clone()
    }

    /// When the node was last failed by a scenario (Unix seconds)
    pub fn failure_started_at(&self, node_id: &str) -> Option<f64> {
        self.state.lock().failure_start_times.get(node_id).copied()
    }

    pub fn recovery_times(&self) -> Vec<f64> {
        self.state.lock().recovery_times.clone()
    }

    pub fn connectivity(&self) -> f64 {
        self.state.lock().connectivity()
    }

    pub fn mttr_statistics(&self) -> MttrStatistics {
        MttrStatistics::from_samples(&self.state.lock().recovery_times)
    }

    pub fn topology_stats(&self) -> TopologyStats {
        self.state.lock().topology_stats()
    }

    pub fn export_state(&self) -> TwinExport {
        let timestamp = self.clock.timestamp();
        let state = self.state.lock();
        TwinExport {
            twin_id: self.twin_id.clone(),
            timestamp,
            topology: state.topology_stats(),
            mttr: MttrStatistics::from_samples(&state.recovery_times),
            nodes: state.nodes.values().map(TwinNode::to_record).collect(),
            links: state.links.values().map(TwinLink::to_record).collect(),
        }
    }

    /// Pretty-printed export
    pub fn to_json(&self) -> Result<String, TwinError> {
        Ok(serde_json::to_string_pretty(&self.export_state())?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), TwinError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), "Exported twin state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_capture::LogCapture;
    use crate::topology::MeshBuilder;
    use meshtwin_core::{ManualClock, MetricSeries, StaticTelemetrySource};

    fn twin() -> MeshDigitalTwin {
        MeshDigitalTwin::from_config(TwinConfig::testing()).with_clock(Arc::new(ManualClock::new()))
    }

    #[test]
    fn test_add_node_upserts() {
        let twin = twin();
        twin.add_node(TwinNode::new("a"));
        twin.add_node(TwinNode {
            cpu_usage: 42.0,
            ..TwinNode::new("a")
        });
        assert_eq!(twin.node_count(), 1);
        assert_eq!(twin.node("a").unwrap().cpu_usage, 42.0);
        assert!(twin.is_consistent());
    }

    #[test]
    fn test_links_to_unknown_nodes_tolerated() {
        let twin = twin();
        twin.add_link(TwinLink::new("ghost-1", "ghost-2"));
        assert_eq!(twin.link_count(), 1);
        assert_eq!(twin.node_count(), 0);
        assert_eq!(twin.neighbors("ghost-1"), vec!["ghost-2"]);
        assert!(twin.is_consistent());
    }

    #[test]
    fn test_remove_node_drops_incident_links() {
        let twin = twin();
        twin.apply_topology(MeshBuilder::with_ids(["A", "B", "C"]).line());
        assert!(twin.remove_node("B"));
        assert_eq!(twin.link_count(), 0);
        assert!(twin.neighbors("A").is_empty());
        assert!(twin.is_consistent());

        assert!(!twin.remove_node("B"));
        assert!(!twin.remove_node("never-there"));
    }

    #[test]
    fn test_remove_link_twice() {
        let twin = twin();
        twin.apply_topology(MeshBuilder::with_ids(["A", "B"]).line());
        assert!(twin.remove_link("A", "B"));
        assert!(!twin.remove_link("A", "B"));
        assert!(twin.link("A", "B").is_none());
        assert!(twin.is_consistent());
    }

    #[test]
    fn test_create_test_topology_ranges() {
        let twin = twin();
        twin.create_test_topology(12, 0.5);
        assert_eq!(twin.node_count(), 12);
        assert!(twin.is_consistent());

        for id in twin.node_ids() {
            let node = twin.node(&id).unwrap();
            assert!((10.0..50.0).contains(&node.cpu_usage));
            assert!((20.0..60.0).contains(&node.memory_usage));
            assert!((0.0..100.0).contains(&node.position.0));
        }
        for id in twin.link_ids() {
            let (s, t) = crate::types::parse_link_id(&id).unwrap();
            let link = twin.link(s, t).unwrap();
            assert!((1.0..50.0).contains(&link.latency_ms));
            assert!((-80.0..-40.0).contains(&link.rssi));
        }
    }

    #[test]
    fn test_connectivity_probability_extremes() {
        let none = twin();
        none.create_test_topology(6, 0.0);
        assert_eq!(none.link_count(), 0);

        let full = twin();
        full.create_test_topology(6, 1.0);
        assert_eq!(full.link_count(), 15);
    }

    #[test]
    fn test_neighbor_features_use_target_trust() {
        let twin = twin();
        twin.add_node(TwinNode {
            trust_score: 0.9,
            ..TwinNode::new("a")
        });
        twin.add_node(TwinNode {
            trust_score: 0.4,
            ..TwinNode::new("b")
        });
        twin.add_link(TwinLink {
            rssi: -60.0,
            ..TwinLink::new("a", "b")
        });
        twin.add_link(TwinLink::new("a", "phantom"));
        twin.add_link(TwinLink::new("b", "a"));

        let features = twin.neighbor_features("a");
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].neighbor_id, "b");
        assert_eq!(features[0].trust_score, 0.4);
        assert_eq!(features[0].rssi, -60.0);
        assert_eq!(features[0].hop_count, 1);
        assert_eq!(features[1].neighbor_id, "phantom");
        assert_eq!(features[1].trust_score, 0.9);
    }

    #[test]
    fn test_set_node_state_records_history() {
        let twin = twin();
        twin.add_node(TwinNode::new("a"));
        assert!(twin.set_node_state("a", NodeState::Isolated));
        assert_eq!(twin.node_state("a"), Some(NodeState::Isolated));
        assert_eq!(twin.node("a").unwrap().state_history.len(), 1);
        assert!(!twin.set_node_state("zzz", NodeState::Failed));
        assert_eq!(twin.node_state("zzz"), None);
    }

    #[test]
    fn test_ingest_without_source() {
        assert_eq!(twin().ingest_from_source(24), 0);
    }

    #[test]
    fn test_ingest_applies_last_sample() {
        let source = StaticTelemetrySource::new()
            .with_series(
                "mesh_node_cpu_usage",
                MetricSeries::new([("node_id", "n1")])
                    .with_sample(1.0, 10.0)
                    .with_sample(2.0, 35.0),
            )
            .with_series(
                "mesh_link_latency_ms",
                MetricSeries::new([("source", "n1"), ("target", "n2")]).with_sample(1.0, 80.0),
            )
            .with_series("mesh_node_trust_score", MetricSeries::new([("node_id", "n3")]));

        let twin = twin().with_telemetry(Box::new(source));
        assert_eq!(twin.ingest(), 3);

        let node = twin.node("n1").unwrap();
        assert_eq!(node.cpu_usage, 35.0);
        assert_eq!(node.metrics_history.latest().unwrap().metric, "mesh_node_cpu_usage");

        // empty series still creates the entity, with defaults
        assert_eq!(twin.node("n3").unwrap().trust_score, 1.0);

        assert_eq!(twin.link("n1", "n2").unwrap().latency_ms, 80.0);
        assert!(twin.is_consistent());
    }

    #[test]
    fn test_ingest_missing_labels_default_unknown() {
        let source = StaticTelemetrySource::new().with_series(
            "mesh_link_rssi",
            MetricSeries::new([("source", "n1")]).with_sample(0.0, -70.0),
        );
        let twin = twin().with_telemetry(Box::new(source));
        assert_eq!(twin.ingest_from_source(1), 1);
        assert_eq!(twin.link("n1", "unknown").unwrap().rssi, -70.0);
    }

    #[test]
    fn test_topology_stats_empty() {
        let stats = twin().topology_stats();
        assert_eq!(stats.total_nodes, 0);
        assert_eq!(stats.connectivity, 1.0);
        assert_eq!(stats.avg_link_quality, 0.0);
        assert_eq!(stats.components, 0);
    }

    #[test]
    fn test_topology_stats_counts() {
        let twin = twin();
        twin.apply_topology(MeshBuilder::with_ids(["A", "B", "C", "D"]).line());
        twin.add_node(TwinNode::new("E"));
        twin.set_node_state("A", NodeState::Failed);

        let stats = twin.topology_stats();
        assert_eq!(stats.total_nodes, 5);
        assert_eq!(stats.healthy_nodes, 4);
        assert_eq!(stats.total_links, 3);
        assert_eq!(stats.up_links, 3);
        assert_eq!(stats.connectivity, 0.8);
        assert_eq!(stats.components, 2);
    }

    #[test]
    fn test_export_json_shape() {
        let twin = twin();
        twin.apply_topology(MeshBuilder::with_ids(["A", "B"]).line());
        let json: serde_json::Value = serde_json::from_str(&twin.to_json().unwrap()).unwrap();
        assert_eq!(json["twin_id"], "mesh-twin");
        assert_eq!(json["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(json["links"][0]["link_id"], "A->B");
        assert_eq!(json["topology"]["total_links"], 1);
        assert_eq!(json["mttr"]["samples"], 0);
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let twin = twin();
        twin.add_node(TwinNode::new("solo"));
        twin.write_json(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"solo\""));
    }

    #[test]
    fn test_ingestion_abort_logged_as_warning() {
        let source = StaticTelemetrySource::new().failing_on("mesh_node_cpu_usage");
        let twin = twin().with_telemetry(Box::new(source));

        let logs = LogCapture::new();
        assert_eq!(logs.capture(|| twin.ingest_from_source(24)), 0);

        let aborted: Vec<_> = logs
            .json_logs()
            .into_iter()
            .filter(|line| line["message"] == "Telemetry ingestion aborted")
            .collect();
        assert_eq!(aborted.len(), 1);
        assert_eq!(aborted[0]["level"], "WARN");
        assert_eq!(aborted[0]["metric"], "mesh_node_cpu_usage");
    }
}
