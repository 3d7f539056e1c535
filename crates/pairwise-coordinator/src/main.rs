//! View coordinator binary.
//!
//! # Usage
//!
//! ```bash
//! # Poll every 100ms until Ctrl-C
//! pairwise-coordinator
//!
//! # Single round, then exit
//! pairwise-coordinator --once --server-update s.json --client-update c.json
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use pairwise_coordinator::{Coordinator, CoordinatorConfig, wall_clock_ms};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// View coordinator
#[derive(Parser, Debug)]
#[command(name = "pairwise-coordinator")]
#[command(about = "Merge two peers' update documents into per-peer views")]
#[command(version)]
struct Args {
    /// Server peer's update document
    #[arg(long, default_value = "server_update.json")]
    server_update: PathBuf,

    /// Client peer's update document
    #[arg(long, default_value = "client_update.json")]
    client_update: PathBuf,

    /// Where to publish the server's view
    #[arg(long, default_value = "server_view.json")]
    server_view: PathBuf,

    /// Where to publish the client's view
    #[arg(long, default_value = "client_view.json")]
    client_view: PathBuf,

    /// Run a single round and exit
    #[arg(long)]
    once: bool,

    /// Polling interval in milliseconds
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mut coordinator = Coordinator::new(CoordinatorConfig {
        server_update: args.server_update,
        client_update: args.client_update,
        server_view: args.server_view,
        client_view: args.client_view,
        interval: Duration::from_millis(args.interval_ms.max(1)),
    });

    if args.once {
        coordinator.round(wall_clock_ms())?;
        return Ok(());
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    coordinator.run(shutdown).await?;

    Ok(())
}
