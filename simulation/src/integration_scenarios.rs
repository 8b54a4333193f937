//! Integration scenarios exercising the whole twin
//!
//! These scenarios cover the twin end to end:
//! - topology bookkeeping (graph mirrors the node and link maps)
//! - every fault injector restoring the model afterwards
//! - links-affected accounting and the connectivity formula
//! - MTTR statistics and chaos summaries
//! - seeded determinism and partial telemetry ingestion

use std::sync::Arc;

use meshtwin_core::{ManualClock, MetricSeries, ScriptedRandom, SeededRandom, StaticTelemetrySource};

use crate::chaos::{ChaosScenarioRunner, RunnerSummary};
use crate::config::TwinConfig;
use crate::stats::MttrStatistics;
use crate::topology::MeshBuilder;
use crate::twin::MeshDigitalTwin;
use crate::types::{LinkState, NodeState, TwinLink, TwinNode};

fn test_twin() -> MeshDigitalTwin {
    MeshDigitalTwin::from_config(TwinConfig::testing()).with_clock(Arc::new(ManualClock::new()))
}

fn all_healthy(twin: &MeshDigitalTwin) -> bool {
    let stats = twin.topology_stats();
    stats.healthy_nodes == stats.total_nodes && stats.up_links == stats.total_links
}

/// Graph and maps stay in sync across a mixed sequence of mutations
#[test]
fn test_graph_tracks_maps() {
    let twin = test_twin();
    twin.create_test_topology(10, 0.4);
    assert!(twin.is_consistent());

    twin.add_link(TwinLink::new("node-0", "outsider"));
    twin.remove_node("node-3");
    twin.remove_link("node-0", "outsider");
    twin.add_node(TwinNode::new("node-3"));
    twin.remove_node("missing");
    assert!(twin.is_consistent());
    assert_eq!(twin.node_count(), 10);
}

/// Chain A - B - C: B touches two links, A one
#[test]
fn test_chain_links_affected() {
    let twin = test_twin();
    twin.apply_topology(MeshBuilder::with_ids(["A", "B", "C"]).line());

    let middle = twin.simulate_node_failure("B", 60.0);
    assert_eq!(middle.links_affected, 2);
    assert_eq!(middle.count_events("recovery_planned"), 1);

    let edge = twin.simulate_node_failure("A", 60.0);
    assert_eq!(edge.links_affected, 1);
}

/// Star with five leaves: the hub takes all five links with it
#[test]
fn test_star_hub() {
    let twin = test_twin();
    twin.apply_topology(MeshBuilder::new(6).star());
    let result = twin.simulate_node_failure("node-0", 60.0);
    assert_eq!(result.links_affected, 5);
    assert_eq!(result.nodes_affected, 1);
}

/// Partition of a four-node chain severs exactly the middle link
#[test]
fn test_partition_chain() {
    let twin = test_twin();
    twin.apply_topology(MeshBuilder::with_ids(["A", "B", "C", "D"]).line());
    let result = twin.simulate_partition(&["A", "B"], &["C", "D"]);
    assert_eq!(result.links_affected, 1);
    assert_eq!(result.connectivity_maintained, 0.5);
    assert_eq!(twin.links_severed(&["A", "B"], &["C", "D"]), 1);
    assert_eq!(twin.links_severed(&["A"], &["B", "C", "D"]), 1);
    assert_eq!(twin.links_severed(&["A"], &["C"]), 0);
}

/// Recovery-time statistics over 1..=5
#[test]
fn test_mttr_statistics_one_to_five() {
    let stats = MttrStatistics::from_samples(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(stats.mean, 3.0);
    assert_eq!(stats.median, 3.0);
    assert_eq!(stats.p95, 5.0);
    assert_eq!(stats.min, 1.0);
    assert_eq!(stats.max, 5.0);
    assert_eq!(stats.samples, 5);
}

/// Node failures feed the twin's own statistics
#[test]
fn test_mttr_statistics_from_failures() {
    let twin = test_twin();
    assert_eq!(twin.mttr_statistics(), MttrStatistics::default());

    twin.apply_topology(MeshBuilder::new(10).ring());
    twin.simulate_node_failure("node-1", 1.0);
    twin.simulate_node_failure("node-2", 1.0);

    let stats = twin.mttr_statistics();
    assert_eq!(stats.samples, 2);
    // 2.0 + 0.1 * 10 + 1.0
    assert!((stats.mean - 4.0).abs() < 1e-9);
    assert_eq!(twin.recovery_times().len(), 2);
}

/// Nothing run yet: the summary is a bare zero count
#[test]
fn test_empty_runner_summary() {
    let runner = ChaosScenarioRunner::new(Arc::new(test_twin()));
    assert_eq!(runner.summary(), RunnerSummary::Empty { scenarios_run: 0 });
    assert_eq!(
        serde_json::to_string(&runner.summary()).unwrap(),
        r#"{"scenarios_run":0}"#
    );
}

/// Every injector hands back a fully healthy twin
#[test]
fn test_self_heal_after_every_scenario() {
    let twin = test_twin().with_random(Box::new(SeededRandom::new(9)));
    twin.create_test_topology(20, 0.25);
    let ids = twin.node_ids();

    twin.simulate_node_failure(&ids[0], 60.0);
    assert!(all_healthy(&twin));

    twin.simulate_partition(&ids[..10], &ids[10..]);
    assert!(all_healthy(&twin));

    twin.simulate_cascade(&ids[..3], 0.6);
    assert!(all_healthy(&twin));
    assert!(twin.is_consistent());
}

/// Pre-existing degraded state is overwritten by recovery
#[test]
fn test_recovery_restores_healthy_not_previous() {
    let twin = test_twin();
    twin.apply_topology(MeshBuilder::with_ids(["A", "B"]).line());
    twin.set_node_state("A", NodeState::Degraded);
    twin.simulate_node_failure("A", 1.0);
    assert_eq!(twin.node_state("A"), Some(NodeState::Healthy));
}

/// Removing twice is a no-op the second time
#[test]
fn test_idempotent_removal() {
    let twin = test_twin();
    twin.apply_topology(MeshBuilder::with_ids(["A", "B", "C"]).ring());
    let before = twin.link_count();

    assert!(twin.remove_link("A", "B"));
    assert!(!twin.remove_link("A", "B"));
    assert_eq!(twin.link_count(), before - 1);

    assert!(twin.remove_node("C"));
    let links_after_first = twin.link_count();
    assert!(!twin.remove_node("C"));
    assert_eq!(twin.link_count(), links_after_first);
    assert!(!twin.remove_node("does-not-exist"));
}

/// `a->b` plus `b->a` is one physical link when deduplicating
#[test]
fn test_bidirectional_dedup_law() {
    let twin = test_twin();
    for id in ["A", "B", "C"] {
        twin.add_node(TwinNode::new(id));
    }
    for (s, t) in [("A", "B"), ("B", "A"), ("B", "C")] {
        twin.add_link(TwinLink::new(s, t));
    }

    assert_eq!(twin.links_affected(&["B"], true), 2);
    assert_eq!(twin.links_affected(&["B"], false), 3);

    let result = twin.simulate_node_failure("B", 1.0);
    assert_eq!(result.links_affected, 2);
    assert_eq!(twin.link("B", "A").unwrap().state, LinkState::Up);
}

/// Guaranteed propagation on a long chain stops at ten waves
#[test]
fn test_cascade_wave_limit() {
    let twin = test_twin().with_random(Box::new(ScriptedRandom::constant(0.0)));
    twin.apply_topology(MeshBuilder::new(50).line());
    let result = twin.simulate_cascade(&["node-25"], 1.0);

    assert_eq!(result.count_events("cascade_wave"), 10);
    // two new failures per wave, one in each direction
    assert_eq!(result.nodes_affected, 21);
    let last_wave = result
        .events
        .iter()
        .filter(|e| e.kind.tag() == "cascade_wave")
        .map(|e| e.time)
        .fold(0.0, f64::max);
    assert_eq!(last_wave, 20.0);
}

/// connectivity = 1 - failed / total
#[test]
fn test_cascade_connectivity_formula() {
    let twin = test_twin().with_random(Box::new(ScriptedRandom::constant(0.99)));
    twin.apply_topology(MeshBuilder::new(10).full_mesh());
    let result = twin.simulate_cascade(&["node-0", "node-1"], 0.5);
    assert_eq!(result.nodes_affected, 2);
    assert!((result.connectivity_maintained - 0.8).abs() < 1e-9);
    assert!((result.packet_loss_total - 0.2).abs() < 1e-9);
    assert_eq!(result.mttr_seconds, 7.0);
    // node-0 and node-1 each touch 9 links, sharing one
    assert_eq!(result.links_affected, 17);
}

/// Same seed, same topology and same cascade
#[test]
fn test_seeded_determinism() {
    let build = || {
        let twin = test_twin().with_random(Box::new(SeededRandom::new(1234)));
        twin.create_test_topology(25, 0.2);
        let cascade = twin.simulate_cascade(&["node-0", "node-7"], 0.4);
        (twin.link_ids(), cascade.nodes_affected, cascade.events)
    };
    assert_eq!(build(), build());
}

/// A failing metric stops ingestion but keeps what was already counted
#[test]
fn test_ingestion_partial_count() {
    let source = StaticTelemetrySource::new()
        .with_series(
            "mesh_node_cpu_usage",
            MetricSeries::new([("node_id", "n1")])
                .with_sample(1.0, 20.0)
                .with_sample(2.0, 30.0)
                .with_sample(3.0, 40.0),
        )
        .with_series(
            "mesh_node_memory_usage",
            MetricSeries::new([("node_id", "n2")]).with_sample(1.0, 55.0),
        )
        .failing_on("mesh_node_uptime_seconds")
        .with_series(
            "mesh_link_latency_ms",
            MetricSeries::new([("source", "n1"), ("target", "n2")]).with_sample(1.0, 9.0),
        );

    let twin = test_twin().with_telemetry(Box::new(source));
    assert_eq!(twin.ingest_from_source(24), 4);
    assert_eq!(twin.node("n1").unwrap().cpu_usage, 40.0);
    assert_eq!(twin.node("n2").unwrap().memory_usage, 55.0);
    // link metrics come after the failure and are never reached
    assert!(twin.link("n1", "n2").is_none());
}

/// Runner drives all three scenario families and aggregates them
#[test]
fn test_chaos_runner_end_to_end() {
    let twin = Arc::new(test_twin());
    twin.create_test_topology(12, 0.3);
    let mut runner = ChaosScenarioRunner::new(Arc::clone(&twin)).with_random(Box::new(SeededRandom::new(5)));

    runner.run_pod_kill(25, 2);
    runner.run_partition(2);
    runner.run_cascade(2, 2);

    assert_eq!(runner.results().len(), 3 * 2 + 2 + 2);
    assert_eq!(runner.summary().scenarios_run(), 10);
    assert!(all_healthy(&twin));

    let json = serde_json::to_value(runner.summary()).unwrap();
    for key in ["avg_mttr", "p95_mttr", "total_nodes_affected", "avg_connectivity"] {
        assert!(json.get(key).is_some(), "summary missing {key}");
    }
    assert!(twin.events().len() > 10);
}
