//! # Meshtwin Simulation
//!
//! A digital twin of a mesh network with chaos fault injection.
//!
//! ## Overview
//!
//! The twin is an in-memory model of a mesh topology. It can:
//!
//! - **Mirror a network**: nodes and links, fed from Prometheus-style telemetry
//! - **Inject faults**: single-node failure, network partition, multi-wave cascade
//! - **Recover**: simulate a detect -> plan -> recover cycle and restore state
//! - **Measure**: MTTR statistics, connectivity, link quality, JSON export
//! - **Run chaos**: repeat randomized scenarios and summarize the outcomes
//!
//! ## Architecture
//!
//! - **Types** (`types.rs`): TwinNode, TwinLink, states, bounded histories
//! - **Topology** (`topology.rs`): adjacency graph and mesh builders
//! - **Twin** (`twin.rs`): the locked model, ingestion, accessors, export
//! - **Faults** (`faults.rs`): fault injectors and recovery planning
//! - **Chaos** (`chaos.rs`): repeated randomized runs and summaries
//! - **Scenarios** (`scenarios.rs`): pre-built experiments
//!
//! ## Example: Chain Relay Failure
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use meshtwin_core::ManualClock;
//! use meshtwin_simulation::*;
//!
//! let twin = MeshDigitalTwin::from_config(TwinConfig::testing())
//!     .with_clock(Arc::new(ManualClock::new()));
//! twin.apply_topology(MeshBuilder::with_ids(["A", "B", "C"]).line());
//!
//! let result = twin.simulate_node_failure("B", 60.0);
//! assert_eq!(result.links_affected, 2);
//! assert_eq!(twin.topology_stats().healthy_nodes, 3);
//! ```

pub mod chaos;
pub mod config;
pub mod faults;
pub mod result;
pub mod scenarios;
pub mod stats;
pub mod topology;
pub mod twin;
pub mod types;

#[cfg(test)]
mod integration_scenarios;
#[cfg(test)]
mod log_capture;

// Re-export main types
pub use types::{
    LinkRecord,
    LinkState,
    MetricSnapshot,
    NeighborFeature,
    NodeRecord,
    NodeState,
    StateSnapshot,
    TwinLink,
    TwinNode,
    canonical_link_id,
    link_id,
    parse_link_id,
};

pub use topology::{MeshBuilder, Topology, TopologyGraph, from_edges};

pub use result::{EventKind, ResultSummary, Route, ScenarioEvent, SimEvent, SimulationResult};

pub use config::{PartitionConnectivity, RouteMetric, TwinConfig};

pub use stats::{MttrStatistics, TopologyStats, TwinExport};

pub use twin::MeshDigitalTwin;

pub use chaos::{ChaosScenarioRunner, RunnerSummary};
