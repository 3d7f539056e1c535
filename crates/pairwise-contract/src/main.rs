//! Witness-chain planner CLI.
//!
//! # Usage
//!
//! ```bash
//! # Plan from an empty resource state
//! pairwise-plan --contracts contracts.json --target post_send
//!
//! # Plan from a peer's current snapshot
//! pairwise-plan --contracts contracts.json --snapshot resources.json --target post_send
//! ```
//!
//! Prints one operation name per line. Exits non-zero when no chain exists.

use std::{
    io::{self, Write},
    path::PathBuf,
};

use clap::Parser;
use pairwise_contract::{ContractGraph, ResourceSnapshot, plan_chain_to_enable_named};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Plan a chain of operations that enables a target operation
#[derive(Parser, Debug)]
#[command(name = "pairwise-plan")]
#[command(about = "Search the contract graph for a chain enabling an operation")]
#[command(version)]
struct Args {
    /// Path to the JSON contract list
    #[arg(long)]
    contracts: PathBuf,

    /// Path to a `{type: {instance: state}}` resource snapshot
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Operation to enable
    #[arg(long)]
    target: String,

    /// Maximum number of operations in the chain
    #[arg(long, default_value = "8")]
    max_depth: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let graph = ContractGraph::from_path(&args.contracts)?;
    let snapshot = match &args.snapshot {
        Some(path) => ResourceSnapshot::from_path(path)?,
        None => ResourceSnapshot::new(),
    };

    tracing::info!(operations = graph.len(), resources = snapshot.len(), "contract graph loaded");

    let chain =
        plan_chain_to_enable_named(&args.target, &graph, &snapshot.availability(), args.max_depth)?;

    let mut stdout = io::stdout().lock();
    for op in chain {
        writeln!(stdout, "{}", op.name)?;
    }

    Ok(())
}
