//! Node binary entry point: open the store, assemble the core context, and
//! idle — block connection itself is driven by whatever chain-sync process
//! calls into this core; this binary's job ends at wiring it up.

use cvm_node::config::CoreConfig;
use cvm_node::startup::{init_logging, open_core};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    info!("===========================================");
    info!("  Cascoin Smart-Contract Core v0.1.0");
    info!("===========================================");

    let config = CoreConfig::default();
    let core = open_core(&config)?;
    info!(
        activation_height = core.config.activation_height,
        max_code_size = core.config.max_code_size,
        "core context ready"
    );

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down gracefully...");

    Ok(())
}
