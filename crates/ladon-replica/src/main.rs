//! ladon replica demo process.
//!
//! - Strict YAML config (`ladon.yaml`, or the path given as first argument)
//! - In-memory store, cold start, then live change feed
//! - Ctrl-C stops the consumer gracefully and dumps metrics

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use ladon_core::error::{Error, Result};
use ladon_core::{PolicyCodec, WildcardMatcher};
use ladon_replica::{config, MemoryStore, ReplicatedManager};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, kind = e.kind().as_str(), "ladon-replica failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "ladon.yaml".to_string());
    let cfg = config::load_from_file(&path)?;

    let store = Arc::new(MemoryStore::new());
    let manager = ReplicatedManager::new(
        store,
        PolicyCodec::default(),
        Arc::new(WildcardMatcher::new()),
        cfg.feed,
    );

    let n = manager.cold_start().await?;
    let handle = manager.watch().await?;
    tracing::info!(config = %path, policies = n, "ladon-replica running");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| Error::Internal(format!("failed to listen for ctrl-c: {e}")))?;
    tracing::info!("signal received, stopping change feed consumer");

    let exit = handle.shutdown().await?;
    tracing::info!(?exit, "change feed consumer stopped");
    println!("{}", manager.metrics().render());
    Ok(())
}
