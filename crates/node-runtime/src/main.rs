//! # DPoS Node
//!
//! Single-process devnet node. `RUST_LOG` overrides the default `info`
//! filter; `DP_*` variables override the configuration.

use anyhow::{Context, Result};
use node_runtime::{load_config, NodeRuntime};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config().context("loading configuration")?;
    let runtime = NodeRuntime::new(config).context("building node runtime")?;
    runtime.start().await.context("starting node runtime")?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
