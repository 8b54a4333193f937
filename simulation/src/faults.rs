//! Fault injection
//!
//! Three injectors, each a full fail -> detect -> recover cycle against the
//! in-memory model:
//!
//! - [`MeshDigitalTwin::simulate_node_failure`]: one node down, alternate
//!   routes planned around it
//! - [`MeshDigitalTwin::simulate_partition`]: links between two groups cut
//! - [`MeshDigitalTwin::simulate_cascade`]: seeds fail and spread to graph
//!   neighbors in waves
//!
//! Event times are deterministic offsets derived from topology size; only
//! the monitoring delay of a node failure spends real time. Every injector
//! leaves the twin fully restored when it returns.

use std::collections::BTreeSet;

use tracing::{debug, info, instrument, trace};

use crate::config::RouteMetric;
use crate::result::{
    CASCADE_FAILURE, EventKind, NETWORK_PARTITION, NODE_FAILURE, Route, SimEvent, SimulationResult,
};
use crate::twin::{MeshDigitalTwin, TwinState};
use crate::types::{LinkState, NodeState, canonical_link_id};

/// Base recovery cost of a node failure, in simulated seconds
const NODE_RECOVERY_BASE: f64 = 2.0;
/// Added per node in the twin
const NODE_RECOVERY_PER_NODE: f64 = 0.1;
const NODE_RECOVERY_CAP: f64 = 10.0;
/// Stabilization after recovery starts
const STABILIZATION: f64 = 1.0;

const PARTITION_RECOVERY_BASE: f64 = 5.0;
const PARTITION_RECOVERY_PER_LINK: f64 = 0.5;

const CASCADE_RECOVERY_BASE: f64 = 5.0;
const CASCADE_RECOVERY_PER_NODE: f64 = 1.0;
const CASCADE_WAVE_SPACING: f64 = 2.0;

fn push_event(events: &mut Vec<SimEvent>, time: f64, kind: EventKind) {
    trace!(event = kind.tag(), time, "Scenario event");
    events.push(SimEvent::new(time, kind));
}

impl TwinState {
    /// Links touching any known node in `failed`
    ///
    /// With `bidirectional`, `a->b` and `b->a` count once.
    pub(crate) fn links_affected(&self, failed: &BTreeSet<&str>, bidirectional: bool) -> usize {
        let mut affected: BTreeSet<String> = BTreeSet::new();
        for node_id in failed {
            if !self.nodes.contains_key(*node_id) {
                continue;
            }
            for (id, link) in &self.links {
                if link.touches(node_id) {
                    if bidirectional {
                        affected.insert(canonical_link_id(&link.source, &link.target));
                    } else {
                        affected.insert(id.clone());
                    }
                }
            }
        }
        affected.len()
    }

    /// Ids of links with one endpoint in each group
    fn severed_links(&self, group_a: &BTreeSet<&str>, group_b: &BTreeSet<&str>) -> Vec<String> {
        self.links
            .iter()
            .filter(|(_, link)| {
                let (s, t) = (link.source.as_str(), link.target.as_str());
                (group_a.contains(s) && group_b.contains(t)) || (group_b.contains(s) && group_a.contains(t))
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Alternate paths between former neighbors of `failed_node`
    pub(crate) fn plan_recovery(&self, failed_node: &str, metric: RouteMetric, max_routes: usize) -> Vec<Route> {
        let reduced = self.graph.without(failed_node);

        // Link-map order; a neighbor on both a->b and b->a appears twice
        let former_neighbors: Vec<&str> = self
            .links
            .values()
            .filter_map(|link| {
                if link.source == failed_node {
                    Some(link.target.as_str())
                } else if link.target == failed_node {
                    Some(link.source.as_str())
                } else {
                    None
                }
            })
            .collect();

        let mut routes = Vec::new();
        for (i, source) in former_neighbors.iter().enumerate() {
            for target in &former_neighbors[i + 1..] {
                if routes.len() >= max_routes {
                    return routes;
                }
                if source == target || !reduced.contains(source) || !reduced.contains(target) {
                    continue;
                }
                let path = match metric {
                    RouteMetric::Hops => reduced.shortest_path(source, target),
                    RouteMetric::Latency => reduced
                        .weighted_shortest_path(source, target)
                        .map(|(path, _)| path),
                };
                if let Some(path) = path {
                    routes.push(Route {
                        source: source.to_string(),
                        target: target.to_string(),
                        path,
                    });
                }
            }
        }
        routes
    }
}

impl MeshDigitalTwin {
    /// Count links touching the failed nodes; unknown ids contribute nothing
    pub fn links_affected<S: AsRef<str>>(&self, failed: &[S], bidirectional: bool) -> usize {
        let failed: BTreeSet<&str> = failed.iter().map(AsRef::as_ref).collect();
        self.state.lock().links_affected(&failed, bidirectional)
    }

    /// Count link records crossing between the two groups
    pub fn links_severed<S: AsRef<str>>(&self, group_a: &[S], group_b: &[S]) -> usize {
        let a: BTreeSet<&str> = group_a.iter().map(AsRef::as_ref).collect();
        let b: BTreeSet<&str> = group_b.iter().map(AsRef::as_ref).collect();
        self.state.lock().severed_links(&a, &b).len()
    }

    /// Alternate routes around a failed node, capped by configuration
    pub fn plan_recovery(&self, failed_node: &str) -> Vec<Route> {
        let config = self.config();
        self.state
            .lock()
            .plan_recovery(failed_node, config.route_metric, config.max_alternate_routes)
    }

    /// Fail one node, plan around it, then restore it and its links
    ///
    /// An unknown node yields a zero-impact result carrying an error event.
    /// The lock is released during the monitoring delay; a node removed in
    /// that window is not restored.
    #[instrument(skip(self), fields(twin_id = %self.twin_id()))]
    pub fn simulate_node_failure(&self, node_id: &str, failure_duration_seconds: f64) -> SimulationResult {
        let started = self.clock.timestamp();
        let mut events = Vec::new();

        let (links_affected, affected_link_ids) = {
            let mut state = self.state.lock();
            if !state.nodes.contains_key(node_id) {
                debug!(node_id, "Node failure target not found");
                let result = SimulationResult::not_found(NODE_FAILURE, node_id);
                state.log_events(NODE_FAILURE, &result.events);
                return result;
            }

            debug!(
                node_id,
                failure_duration_seconds,
                initial_connectivity = state.connectivity(),
                "Injecting node failure"
            );

            state.transition(node_id, NodeState::Failed, started);
            state.failure_start_times.insert(node_id.to_string(), started);
            push_event(&mut events, 0.0, EventKind::NodeFailed {
                node_id: node_id.to_string(),
            });

            let links_affected = state.links_affected(&BTreeSet::from([node_id]), true);
            let affected_link_ids: Vec<String> = state
                .links
                .iter()
                .filter(|(_, link)| link.touches(node_id))
                .map(|(id, _)| id.clone())
                .collect();
            state.set_link_states(&affected_link_ids, LinkState::Down);
            push_event(&mut events, 0.1, EventKind::LinksDown {
                count: links_affected,
            });

            (links_affected, affected_link_ids)
        };

        self.clock.sleep(self.config().monitoring_delay());

        let mut state = self.state.lock();
        push_event(&mut events, 1.0, EventKind::FailureDetected {
            node_id: node_id.to_string(),
        });

        let routes = state.plan_recovery(
            node_id,
            self.config().route_metric,
            self.config().max_alternate_routes,
        );
        push_event(&mut events, 2.0, EventKind::RecoveryPlanned {
            alternative_routes: routes.len(),
        });

        let recovery_time = (NODE_RECOVERY_BASE + NODE_RECOVERY_PER_NODE * state.nodes.len() as f64)
            .min(NODE_RECOVERY_CAP);
        let now = self.clock.timestamp();
        state.transition(node_id, NodeState::Recovering, now);
        push_event(&mut events, recovery_time, EventKind::RecoveryStarted {
            node_id: node_id.to_string(),
        });

        let mttr = recovery_time + STABILIZATION;
        state.transition(node_id, NodeState::Healthy, now);
        state.set_link_states(&affected_link_ids, LinkState::Up);
        state.recovery_times.push(mttr);
        push_event(&mut events, mttr, EventKind::RecoveryComplete {
            node_id: node_id.to_string(),
        });

        state.log_events(NODE_FAILURE, &events);
        let connectivity = state.connectivity();
        drop(state);

        info!(node_id, mttr, links_affected, routes = routes.len(), "Node failure recovered");

        SimulationResult {
            scenario_name: NODE_FAILURE.to_string(),
            duration_seconds: self.clock.timestamp() - started,
            mttr_seconds: mttr,
            nodes_affected: 1,
            links_affected,
            connectivity_maintained: connectivity,
            packet_loss_total: 0.05 * links_affected as f64,
            events,
        }
    }

    /// Cut every link between two groups, then heal
    #[instrument(skip_all, fields(twin_id = %self.twin_id(), group_a = group_a.len(), group_b = group_b.len()))]
    pub fn simulate_partition<S: AsRef<str>>(&self, group_a: &[S], group_b: &[S]) -> SimulationResult {
        let started = self.clock.timestamp();
        let mut events = Vec::new();

        let a: BTreeSet<&str> = group_a.iter().map(AsRef::as_ref).collect();
        let b: BTreeSet<&str> = group_b.iter().map(AsRef::as_ref).collect();

        let mut state = self.state.lock();
        let severed = state.severed_links(&a, &b);
        state.set_link_states(&severed, LinkState::Down);
        push_event(&mut events, 0.0, EventKind::PartitionCreated {
            group_a_size: group_a.len(),
            group_b_size: group_b.len(),
            links_severed: severed.len(),
        });

        let recovery_time = PARTITION_RECOVERY_BASE + PARTITION_RECOVERY_PER_LINK * severed.len() as f64;
        state.set_link_states(&severed, LinkState::Up);
        push_event(&mut events, recovery_time, EventKind::PartitionHealed);

        state.log_events(NETWORK_PARTITION, &events);
        drop(state);

        info!(links_severed = severed.len(), recovery_time, "Partition healed");

        SimulationResult {
            scenario_name: NETWORK_PARTITION.to_string(),
            duration_seconds: self.clock.timestamp() - started,
            mttr_seconds: recovery_time,
            nodes_affected: group_a.len() + group_b.len(),
            links_affected: severed.len(),
            connectivity_maintained: self
                .config()
                .partition_connectivity
                .evaluate(group_a.len(), group_b.len()),
            packet_loss_total: 0.2 * severed.len() as f64,
            events,
        }
    }

    /// Fail the seeds and let the failure spread along the graph
    ///
    /// Each wave, every healthy neighbor of a failed node fails with
    /// `propagation_probability` (one RNG draw per candidate). Propagation
    /// stops when a wave adds nothing or the wave limit is reached.
    #[instrument(skip_all, fields(twin_id = %self.twin_id(), seeds = initial_nodes.len(), propagation_probability = propagation_probability))]
    pub fn simulate_cascade<S: AsRef<str>>(&self, initial_nodes: &[S], propagation_probability: f64) -> SimulationResult {
        let started = self.clock.timestamp();
        let mut events = Vec::new();
        let max_waves = self.config().max_cascade_waves;

        let mut guard = self.state.lock();
        let state = &mut *guard;

        let mut failed: BTreeSet<String> = initial_nodes.iter().map(|s| s.as_ref().to_string()).collect();
        for node_id in &failed {
            state.transition(node_id, NodeState::Failed, started);
        }
        push_event(&mut events, 0.0, EventKind::InitialFailures {
            nodes: initial_nodes.iter().map(|s| s.as_ref().to_string()).collect(),
        });

        let mut wave: u32 = 1;
        while wave <= max_waves {
            let mut new_failures: BTreeSet<String> = BTreeSet::new();
            for node_id in &failed {
                if !state.graph.contains(node_id) {
                    continue;
                }
                for neighbor in state.graph.neighbors(node_id) {
                    if failed.contains(&neighbor) || new_failures.contains(&neighbor) {
                        continue;
                    }
                    if state.rng.chance(propagation_probability) {
                        new_failures.insert(neighbor);
                    }
                }
            }

            if new_failures.is_empty() {
                break;
            }

            let now = self.clock.timestamp();
            for node_id in &new_failures {
                state.transition(node_id, NodeState::Failed, now);
            }
            debug!(wave, new_failures = new_failures.len(), "Cascade wave");
            push_event(&mut events, CASCADE_WAVE_SPACING * f64::from(wave), EventKind::CascadeWave {
                wave,
                new_failures: new_failures.iter().cloned().collect(),
            });

            failed.extend(new_failures);
            wave += 1;
        }

        let recovery_time = CASCADE_RECOVERY_BASE + CASCADE_RECOVERY_PER_NODE * failed.len() as f64;
        let now = self.clock.timestamp();
        for node_id in &failed {
            state.transition(node_id, NodeState::Healthy, now);
        }
        push_event(&mut events, recovery_time, EventKind::CascadeRecoveryComplete {
            total_affected: failed.len(),
        });

        let failed_refs: BTreeSet<&str> = failed.iter().map(String::as_str).collect();
        let links_affected = state.links_affected(&failed_refs, true);
        let connectivity = if state.nodes.is_empty() {
            1.0
        } else {
            (1.0 - failed.len() as f64 / state.nodes.len() as f64).clamp(0.0, 1.0)
        };

        state.log_events(CASCADE_FAILURE, &events);
        drop(guard);

        info!(total_affected = failed.len(), waves = wave - 1, recovery_time, "Cascade recovered");

        SimulationResult {
            scenario_name: CASCADE_FAILURE.to_string(),
            duration_seconds: self.clock.timestamp() - started,
            mttr_seconds: recovery_time,
            nodes_affected: failed.len(),
            links_affected,
            connectivity_maintained: connectivity,
            packet_loss_total: 0.1 * failed.len() as f64,
            events,
        }
    }
}
