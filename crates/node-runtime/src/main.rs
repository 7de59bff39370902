//! # Quorum-Ledger Node Runtime
//!
//! ## Startup Sequence
//!
//! 1. Install logging (`RUST_LOG`, default `info`)
//! 2. Load configuration from the environment and validate it
//! 3. Open the storage backend and wire the container
//! 4. Start the transaction feed daemon
//! 5. Queue transactions read from stdin, one `<from-hex> <path> [payload]` per line
//! 6. Run until Ctrl+C, then stop the daemon cooperatively

use std::sync::Arc;

use anyhow::{Context, Result};
use node_runtime::container::{NodeConfig, NodeContainer};
use node_runtime::daemon::{Daemon, QueuedTransaction, TransactionFeed};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Queue every well-formed stdin line until stdin closes.
async fn read_transactions(feed: Arc<TransactionFeed>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match QueuedTransaction::parse_line(&line) {
            Ok(tx) => feed.push(tx.pointer, tx.payload),
            Err(e) => warn!(error = %e, "Ignoring malformed transaction line"),
        }
    }
    info!("stdin closed, no more transactions will be queued");
    Ok(())
}

/// Load configuration from environment.
fn load_config() -> Result<NodeConfig> {
    let config = NodeConfig::from_env().context("Invalid environment configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("===========================================");
    info!("  Quorum-Ledger Node Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let config = load_config()?;
    let daemon = Daemon::new(&config.daemon);
    let batch_size = config.daemon.batch_size;
    let node = NodeContainer::new(config).context("Failed to build node")?;

    let feed = Arc::new(TransactionFeed::new(node.router(), batch_size));
    let stop = daemon.stop_handle();
    let worker = {
        let feed = Arc::clone(&feed);
        tokio::spawn(async move { daemon.run(feed.as_ref()).await })
    };
    let reader = tokio::spawn(read_transactions(Arc::clone(&feed)));

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("Initiating graceful shutdown...");
    stop.stop();
    reader.abort();
    let stats = worker.await.context("Daemon task panicked")?;

    let state_hash = node.store().state_hash()?;
    info!(
        iterations = stats.iterations,
        submitted = stats.submitted,
        skipped = stats.skipped,
        pending = feed.pending(),
        state_hash = %hex::encode(state_hash),
        "Shutdown complete"
    );
    Ok(())
}
