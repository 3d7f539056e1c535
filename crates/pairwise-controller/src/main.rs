//! Rendezvous controller binary.
//!
//! # Usage
//!
//! ```bash
//! pairwise-controller --bind 0.0.0.0:12345
//! ```
//!
//! Exits once both the server and the client peer have disconnected.

use clap::Parser;
use pairwise_controller::{Controller, ControllerConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Rendezvous controller
#[derive(Parser, Debug)]
#[command(name = "pairwise-controller")]
#[command(about = "Broker connection-setup metadata between a server and a client peer")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:12345")]
    bind: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Rendezvous controller starting");
    tracing::info!("Binding to {}", args.bind);

    let controller = Controller::bind(ControllerConfig { bind_address: args.bind }).await?;
    controller.run().await?;

    Ok(())
}
