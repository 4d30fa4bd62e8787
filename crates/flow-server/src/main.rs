//! Flow automation daemon
//!
//! Loads a deployment configuration, starts every configured flow and runs
//! until all flows have ended or the process is interrupted.

mod host;
mod mirror;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use flow_config::load_config;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::host::FlowHost;

/// Run automation flows from a configuration file
#[derive(Parser, Debug)]
#[command(name = "flowd", version, about)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "flows.yaml")]
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let config = load_config(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;

    if args.check {
        info!(flows = config.flows.len(), "Configuration is valid");
        return Ok(());
    }

    info!("Starting flow daemon");

    let host = FlowHost::from_config(&config);
    let handles = host.start_flows(&config)?;
    if handles.is_empty() {
        warn!("No flows configured");
    }

    let all_finished = futures::future::join_all(handles.iter().map(|handle| handle.wait()));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("waiting for interrupt")?;
            info!("Shutting down...");
        }
        _ = all_finished => {
            info!("All flows finished");
        }
    }

    host.shutdown().await;

    for handle in &handles {
        info!(
            flow = %handle.name(),
            flow_id = %handle.id(),
            status = %handle.status(),
            "Final flow status"
        );
    }

    Ok(())
}
