//! Meshtwin - mesh network digital twin
//!
//! Builds a twin from configuration, runs one experiment against it and
//! prints the outcome as JSON on stdout. Logs go to stderr or a file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use meshtwin_core::RecordedPrometheusSource;
use meshtwin_logging::{LogConfig, TwinSubscriberBuilder};
use serde::Serialize;
use tracing::info;

use meshtwin_simulation::{ChaosScenarioRunner, MeshBuilder, MeshDigitalTwin, TwinConfig, scenarios};

#[derive(Parser)]
#[command(name = "meshtwin", about = "Mesh network digital twin and chaos simulator", version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// RNG seed (overrides the config file)
    #[arg(short, long, global = true)]
    seed: Option<u64>,

    /// Human-readable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Replay recorded Prometheus responses (`<metric>.json`) from this directory
    #[arg(long, global = true)]
    telemetry_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Shape {
    Random,
    Line,
    Ring,
    Star,
    Full,
}

#[derive(clap::Args)]
struct TopologyArgs {
    /// Topology shape
    #[arg(long, value_enum, default_value = "random")]
    shape: Shape,

    /// Number of nodes
    #[arg(short, long, default_value = "10")]
    nodes: usize,

    /// Link probability for the random shape
    #[arg(long, default_value = "0.3")]
    connectivity: f64,
}

#[derive(Clone, Copy, ValueEnum)]
enum Demo {
    Chain,
    Star,
    Partition,
    Cascade,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a topology and print its statistics
    Topology(TopologyArgs),

    /// Fail a single node and watch it recover
    NodeFailure {
        #[command(flatten)]
        topology: TopologyArgs,

        /// Node to fail
        #[arg(long, default_value = "node-0")]
        node: String,
    },

    /// Split the nodes in half and heal
    Partition {
        #[command(flatten)]
        topology: TopologyArgs,
    },

    /// Cascade failure seeded from the first `--seeds` nodes
    Cascade {
        #[command(flatten)]
        topology: TopologyArgs,

        /// Number of seed failures
        #[arg(long, default_value = "2")]
        seeds: usize,

        /// Propagation probability (defaults to the configured value)
        #[arg(long)]
        probability: Option<f64>,
    },

    /// Run pod-kill, partition and cascade chaos and print the summary
    Chaos {
        #[command(flatten)]
        topology: TopologyArgs,

        /// Percentage of nodes killed per pod-kill iteration
        #[arg(long, default_value = "20")]
        kill_percentage: u32,

        /// Iterations per scenario family
        #[arg(short, long, default_value = "5")]
        iterations: usize,
    },

    /// Export the full twin state as JSON
    Export {
        #[command(flatten)]
        topology: TopologyArgs,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run one of the canonical scenarios
    Demo {
        #[arg(value_enum)]
        scenario: Demo,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => TwinConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TwinConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    // Chaos runs from a config file log to a per-run file beside it
    let log_config = match (&cli.command, &cli.config) {
        _ if cli.verbose => LogConfig::development(),
        (Commands::Chaos { .. }, Some(path)) => {
            LogConfig::chaos_run(path.parent().unwrap_or(Path::new(".")), &config.twin_id)
        }
        _ => config.log.clone(),
    };
    let log_file = log_config.log_file();
    let _log_guard = TwinSubscriberBuilder::new().with_config(log_config).init()?;
    if let Some(file) = log_file {
        eprintln!("Logging to {}", file.display());
    }

    let mut twin = MeshDigitalTwin::from_config(config);
    if let Some(dir) = &cli.telemetry_dir {
        twin = twin.with_telemetry(Box::new(RecordedPrometheusSource::new(dir)));
    }
    let twin = Arc::new(twin);
    let ingest = cli.telemetry_dir.is_some();

    match cli.command {
        Commands::Topology(args) => {
            build(&twin, &args, ingest);
            print_json(&twin.topology_stats())?;
        }
        Commands::NodeFailure { topology, node } => {
            build(&twin, &topology, ingest);
            print_json(&twin.simulate_node_failure(&node, 60.0))?;
        }
        Commands::Partition { topology } => {
            build(&twin, &topology, ingest);
            let ids = twin.node_ids();
            let (group_a, group_b) = ids.split_at(ids.len() / 2);
            print_json(&twin.simulate_partition(group_a, group_b))?;
        }
        Commands::Cascade {
            topology,
            seeds,
            probability,
        } => {
            build(&twin, &topology, ingest);
            let ids = twin.node_ids();
            let initial = &ids[..seeds.min(ids.len())];
            let probability = probability.unwrap_or(twin.config().cascade_propagation_probability);
            print_json(&twin.simulate_cascade(initial, probability))?;
        }
        Commands::Chaos {
            topology,
            kill_percentage,
            iterations,
        } => {
            build(&twin, &topology, ingest);
            let mut runner = ChaosScenarioRunner::new(Arc::clone(&twin));
            runner.run_pod_kill(kill_percentage, iterations);
            runner.run_partition(iterations);
            runner.run_cascade(2, iterations);
            print_json(&runner.summary())?;
        }
        Commands::Export { topology, output } => {
            build(&twin, &topology, ingest);
            match output {
                Some(path) => twin
                    .write_json(&path)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{}", twin.to_json()?),
            }
        }
        Commands::Demo { scenario } => {
            let result = match scenario {
                Demo::Chain => scenarios::run_chain_failure(&twin),
                Demo::Star => scenarios::run_star_hub_failure(&twin),
                Demo::Partition => scenarios::run_split_partition(&twin),
                Demo::Cascade => scenarios::run_random_cascade(
                    &twin,
                    15,
                    0.3,
                    twin.config().cascade_propagation_probability,
                ),
            };
            print_json(&result)?;
        }
    }

    Ok(())
}

/// Load the requested topology, then overlay recorded telemetry if any
fn build(twin: &MeshDigitalTwin, args: &TopologyArgs, ingest: bool) {
    match args.shape {
        Shape::Random => twin.create_test_topology(args.nodes, args.connectivity),
        Shape::Line => twin.apply_topology(MeshBuilder::new(args.nodes).line()),
        Shape::Ring => twin.apply_topology(MeshBuilder::new(args.nodes).ring()),
        Shape::Star => twin.apply_topology(MeshBuilder::new(args.nodes).star()),
        Shape::Full => twin.apply_topology(MeshBuilder::new(args.nodes).full_mesh()),
    }

    let ingested = if ingest { twin.ingest() } else { 0 };
    info!(
        nodes = twin.node_count(),
        links = twin.link_count(),
        ingested,
        "Twin ready"
    );
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
