//! Chaos scenario runner
//!
//! Repeats randomized fault injections against one shared twin and folds
//! every result into a running summary. Each run opens a `chaos_run` span
//! carrying the twin id and a fresh run id from its [`TwinContextGuard`], so
//! every line logged during the run, including the injectors' own, can be
//! traced back to it.

use std::sync::Arc;

use meshtwin_core::{RandomSource, SeededRandom};
use meshtwin_logging::TwinContextGuard;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::result::SimulationResult;
use crate::stats::percentile_95;
use crate::twin::MeshDigitalTwin;

/// Aggregate over every result a runner has produced
///
/// Serializes to exactly `{"scenarios_run": 0}` when nothing has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunnerSummary {
    Populated {
        scenarios_run: usize,
        avg_mttr: f64,
        p95_mttr: f64,
        total_nodes_affected: usize,
        avg_connectivity: f64,
    },
    Empty {
        scenarios_run: usize,
    },
}

impl RunnerSummary {
    pub fn from_results(results: &[SimulationResult]) -> Self {
        if results.is_empty() {
            return RunnerSummary::Empty { scenarios_run: 0 };
        }

        let n = results.len() as f64;
        let mut mttr: Vec<f64> = results.iter().map(|r| r.mttr_seconds).collect();
        mttr.sort_by(f64::total_cmp);

        RunnerSummary::Populated {
            scenarios_run: results.len(),
            avg_mttr: mttr.iter().sum::<f64>() / n,
            p95_mttr: percentile_95(&mttr),
            total_nodes_affected: results.iter().map(|r| r.nodes_affected).sum(),
            avg_connectivity: results.iter().map(|r| r.connectivity_maintained).sum::<f64>() / n,
        }
    }

    pub fn scenarios_run(&self) -> usize {
        match self {
            RunnerSummary::Populated { scenarios_run, .. } | RunnerSummary::Empty { scenarios_run } => {
                *scenarios_run
            }
        }
    }
}

/// Drives repeated chaos experiments against a shared twin
pub struct ChaosScenarioRunner {
    twin: Arc<MeshDigitalTwin>,
    rng: Box<dyn RandomSource>,
    results: Vec<SimulationResult>,
}

impl ChaosScenarioRunner {
    /// Runner with its own RNG, seeded like the twin when a seed is configured
    pub fn new(twin: Arc<MeshDigitalTwin>) -> Self {
        let rng: Box<dyn RandomSource> = match twin.config().seed {
            Some(seed) => Box::new(SeededRandom::new(seed)),
            None => Box::new(SeededRandom::from_entropy()),
        };
        Self {
            twin,
            rng,
            results: Vec::new(),
        }
    }

    pub fn with_random(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    pub fn twin(&self) -> &Arc<MeshDigitalTwin> {
        &self.twin
    }

    /// Kill `max(1, n * pct / 100)` random nodes per iteration
    ///
    /// The node set is captured once, before the first iteration.
    pub fn run_pod_kill(&mut self, kill_percentage: u32, iterations: usize) -> Vec<SimulationResult> {
        let ctx = TwinContextGuard::for_run(self.twin.twin_id(), "pod_kill");
        let span = info_span!(
            "chaos_run",
            twin_id = %ctx.twin_id(),
            run_id = %ctx.run_id(),
            scenario = "pod_kill",
            kill_percentage, iterations
        );
        let _enter = span.enter();

        let node_ids = self.twin.node_ids();
        let kill_count = (node_ids.len() * kill_percentage as usize / 100).max(1);

        let mut results = Vec::new();
        for _ in 0..iterations {
            for target in self.rng.sample(&node_ids, kill_count) {
                results.push(self.twin.simulate_node_failure(&target, 60.0));
            }
        }

        info!(results = results.len(), "Pod-kill run complete");
        self.results.extend(results.iter().cloned());
        results
    }

    /// Shuffle the nodes and split them in half each iteration
    pub fn run_partition(&mut self, iterations: usize) -> Vec<SimulationResult> {
        let ctx = TwinContextGuard::for_run(self.twin.twin_id(), "partition");
        let span = info_span!(
            "chaos_run",
            twin_id = %ctx.twin_id(),
            run_id = %ctx.run_id(),
            scenario = "partition",
            iterations
        );
        let _enter = span.enter();

        let mut node_ids = self.twin.node_ids();
        let mid = node_ids.len() / 2;

        let mut results = Vec::with_capacity(iterations);
        for _ in 0..iterations {
            self.rng.shuffle(&mut node_ids);
            let (group_a, group_b) = node_ids.split_at(mid);
            results.push(self.twin.simulate_partition(group_a, group_b));
        }

        info!(results = results.len(), "Partition run complete");
        self.results.extend(results.iter().cloned());
        results
    }

    /// Cascade from `min(k, n)` random seeds each iteration
    ///
    /// Propagation probability comes from the twin's configuration.
    pub fn run_cascade(&mut self, num_initial_failures: usize, iterations: usize) -> Vec<SimulationResult> {
        let ctx = TwinContextGuard::for_run(self.twin.twin_id(), "cascade");
        let span = info_span!(
            "chaos_run",
            twin_id = %ctx.twin_id(),
            run_id = %ctx.run_id(),
            scenario = "cascade",
            num_initial_failures, iterations
        );
        let _enter = span.enter();

        let node_ids = self.twin.node_ids();
        let probability = self.twin.config().cascade_propagation_probability;

        let mut results = Vec::with_capacity(iterations);
        for _ in 0..iterations {
            let seeds = self.rng.sample(&node_ids, num_initial_failures);
            results.push(self.twin.simulate_cascade(&seeds, probability));
        }

        info!(results = results.len(), "Cascade run complete");
        self.results.extend(results.iter().cloned());
        results
    }

    pub fn results(&self) -> &[SimulationResult] {
        &self.results
    }

    pub fn summary(&self) -> RunnerSummary {
        RunnerSummary::from_results(&self.results)
    }
}
