//! # NHB Node Runtime
//!
//! The main entry point for an NHB permissioned chain node: loads genesis
//! and configuration, wires the mempool/state-processor/block-producer/p2p
//! subsystems, and runs until `Ctrl+C` or the configured shutdown budget
//! elapses.

use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use nhb_node::{Node, NodeConfig};

const SHUTDOWN_BUDGET: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("===========================================");
    info!("  NHB Node Runtime");
    info!("===========================================");

    let config = NodeConfig::default();
    let node = Node::new(config)?;
    info!(chain_id = node.chain_id().0, "node wired, starting subsystems");

    let run_handle = tokio::spawn(node.clone().run());

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested, stopping subsystems (budget {:?})", SHUTDOWN_BUDGET);
    node.request_shutdown();

    match tokio::time::timeout(SHUTDOWN_BUDGET, run_handle).await {
        Ok(Ok(Ok(()))) => info!("shut down cleanly"),
        Ok(Ok(Err(e))) => warn!("subsystems returned an error during shutdown: {e}"),
        Ok(Err(e)) => warn!("subsystem task panicked during shutdown: {e}"),
        Err(_) => warn!("shutdown budget exceeded, exiting anyway"),
    }

    Ok(())
}
