//! Scenario events and results
//!
//! Every fault injector returns a [`SimulationResult`] holding a timeline of
//! [`SimEvent`]s. Event times are simulated offsets in seconds from the
//! moment of injection, not wall-clock readings.

use serde::{Deserialize, Serialize};

pub const NODE_FAILURE: &str = "node_failure";
pub const NETWORK_PARTITION: &str = "network_partition";
pub const CASCADE_FAILURE: &str = "cascade_failure";

/// What happened at a point of the simulated timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    NodeFailed { node_id: String },
    LinksDown { count: usize },
    FailureDetected { node_id: String },
    RecoveryPlanned { alternative_routes: usize },
    RecoveryStarted { node_id: String },
    RecoveryComplete { node_id: String },
    PartitionCreated {
        group_a_size: usize,
        group_b_size: usize,
        links_severed: usize,
    },
    PartitionHealed,
    InitialFailures { nodes: Vec<String> },
    CascadeWave { wave: u32, new_failures: Vec<String> },
    CascadeRecoveryComplete { total_affected: usize },
    /// The scenario could not run (e.g. unknown target)
    Error { error: String },
}

impl EventKind {
    /// Snake-case tag, as serialized
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::NodeFailed { .. } => "node_failed",
            EventKind::LinksDown { .. } => "links_down",
            EventKind::FailureDetected { .. } => "failure_detected",
            EventKind::RecoveryPlanned { .. } => "recovery_planned",
            EventKind::RecoveryStarted { .. } => "recovery_started",
            EventKind::RecoveryComplete { .. } => "recovery_complete",
            EventKind::PartitionCreated { .. } => "partition_created",
            EventKind::PartitionHealed => "partition_healed",
            EventKind::InitialFailures { .. } => "initial_failures",
            EventKind::CascadeWave { .. } => "cascade_wave",
            EventKind::CascadeRecoveryComplete { .. } => "cascade_recovery_complete",
            EventKind::Error { .. } => "error",
        }
    }
}

/// Timestamped event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    /// Simulated offset in seconds
    pub time: f64,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl SimEvent {
    pub fn new(time: f64, kind: EventKind) -> Self {
        Self { time, kind }
    }
}

/// Event as kept in the twin's cumulative log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEvent {
    pub scenario: String,
    #[serde(flatten)]
    pub event: SimEvent,
}

/// Outcome of one fault-injection call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub scenario_name: String,
    /// Wall-clock time spent inside the call
    pub duration_seconds: f64,
    pub mttr_seconds: f64,
    pub nodes_affected: usize,
    pub links_affected: usize,
    /// 0-1
    pub connectivity_maintained: f64,
    pub packet_loss_total: f64,
    pub events: Vec<SimEvent>,
}

impl SimulationResult {
    /// Zero-impact result for a target the twin does not know
    pub fn not_found(scenario: &str, node_id: &str) -> Self {
        Self {
            scenario_name: scenario.to_string(),
            duration_seconds: 0.0,
            mttr_seconds: 0.0,
            nodes_affected: 0,
            links_affected: 0,
            connectivity_maintained: 1.0,
            packet_loss_total: 0.0,
            events: vec![SimEvent::new(
                0.0,
                EventKind::Error {
                    error: format!("Node {node_id} not found"),
                },
            )],
        }
    }

    /// First error message in the timeline, if any
    pub fn error(&self) -> Option<&str> {
        self.events.iter().find_map(|e| match &e.kind {
            EventKind::Error { error } => Some(error.as_str()),
            _ => None,
        })
    }

    /// True for the degenerate result of an unknown target
    pub fn is_not_found(&self) -> bool {
        self.nodes_affected == 0 && self.error().is_some()
    }

    /// Number of events with the given tag
    pub fn count_events(&self, tag: &str) -> usize {
        self.events.iter().filter(|e| e.kind.tag() == tag).count()
    }

    /// Compact summary without the timeline
    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            scenario: self.scenario_name.clone(),
            duration_seconds: self.duration_seconds,
            mttr_seconds: self.mttr_seconds,
            nodes_affected: self.nodes_affected,
            links_affected: self.links_affected,
            connectivity_maintained: self.connectivity_maintained,
            packet_loss_total: self.packet_loss_total,
            events_count: self.events.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub scenario: String,
    pub duration_seconds: f64,
    pub mttr_seconds: f64,
    pub nodes_affected: usize,
    pub links_affected: usize,
    pub connectivity_maintained: f64,
    pub packet_loss_total: f64,
    pub events_count: usize,
}

/// Alternate path between two former neighbors of a failed node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub source: String,
    pub target: String,
    pub path: Vec<String>,
}
