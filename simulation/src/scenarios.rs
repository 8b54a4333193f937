//! Pre-defined scenarios for the mesh digital twin
//!
//! Topology shapes used by the CLI and tests, plus the canonical single-shot
//! experiments: a relay chain losing its middle hop, a star losing its hub,
//! a chain split in half, and a cascade through a random mesh.

use tracing::info;

use crate::result::SimulationResult;
use crate::topology::{MeshBuilder, Topology};
use crate::twin::MeshDigitalTwin;

/// `node-0 - node-1 - ... - node-{n-1}`
pub fn chain(n: usize) -> Topology {
    MeshBuilder::new(n).line()
}

/// `node-0` as hub with `leaves` spokes
pub fn star(leaves: usize) -> Topology {
    MeshBuilder::new(leaves + 1).star()
}

pub fn ring(n: usize) -> Topology {
    MeshBuilder::new(n).ring()
}

pub fn full_mesh(n: usize) -> Topology {
    MeshBuilder::new(n).full_mesh()
}

/// A - B - C, fail B
///
/// Both links go down and no alternate route exists between A and C.
pub fn run_chain_failure(twin: &MeshDigitalTwin) -> SimulationResult {
    info!("=== Running chain relay failure ===");
    twin.apply_topology(MeshBuilder::with_ids(["A", "B", "C"]).line());
    twin.simulate_node_failure("B", 60.0)
}

/// Hub with five leaves, fail the hub
pub fn run_star_hub_failure(twin: &MeshDigitalTwin) -> SimulationResult {
    info!("=== Running star hub failure ===");
    twin.apply_topology(star(5));
    twin.simulate_node_failure("node-0", 60.0)
}

/// A - B - C - D split into {A, B} and {C, D}
pub fn run_split_partition(twin: &MeshDigitalTwin) -> SimulationResult {
    info!("=== Running split partition ===");
    twin.apply_topology(MeshBuilder::with_ids(["A", "B", "C", "D"]).line());
    twin.simulate_partition(&["A", "B"], &["C", "D"])
}

/// Random mesh of `nodes`, cascade from `node-0`
pub fn run_random_cascade(
    twin: &MeshDigitalTwin,
    nodes: usize,
    connectivity: f64,
    propagation_probability: f64,
) -> SimulationResult {
    info!(nodes, connectivity, "=== Running random cascade ===");
    twin.create_test_topology(nodes, connectivity);
    twin.simulate_cascade(&["node-0"], propagation_probability)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use meshtwin_core::ManualClock;

    use super::*;
    use crate::config::TwinConfig;

    fn twin() -> MeshDigitalTwin {
        MeshDigitalTwin::from_config(TwinConfig::testing()).with_clock(Arc::new(ManualClock::new()))
    }

    #[test]
    fn test_shapes() {
        assert_eq!(chain(5).links.len(), 4);
        assert_eq!(star(5).nodes.len(), 6);
        assert_eq!(star(5).links.len(), 5);
        assert_eq!(ring(5).links.len(), 5);
        assert_eq!(full_mesh(5).links.len(), 10);
        assert!(chain(0).links.is_empty());
        assert!(ring(1).links.is_empty());
    }

    #[test]
    fn test_chain_failure() {
        let result = run_chain_failure(&twin());
        assert_eq!(result.links_affected, 2);
        assert_eq!(result.nodes_affected, 1);
    }

    #[test]
    fn test_star_hub_failure() {
        let result = run_star_hub_failure(&twin());
        assert_eq!(result.links_affected, 5);
        assert_eq!(result.nodes_affected, 1);
    }

    #[test]
    fn test_split_partition() {
        let result = run_split_partition(&twin());
        assert_eq!(result.links_affected, 1);
        assert_eq!(result.connectivity_maintained, 0.5);
    }

    #[test]
    fn test_random_cascade_heals() {
        let twin = twin();
        let result = run_random_cascade(&twin, 15, 0.3, 0.5);
        assert!(result.nodes_affected >= 1);
        assert_eq!(twin.topology_stats().healthy_nodes, 15);
    }
}
