//! netmon — samples host network throughput and serves it to a live dashboard.
//!
//! Run with:  `RUST_LOG=info PORT=5000 netmon`

use anyhow::{Context, Result};
use netmon_monitor::Monitor;
use netmon_server::ServerState;
use netmon_system::SysinfoSource;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Structured logging — RUST_LOG controls verbosity (default: info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("netmon v{} starting", env!("CARGO_PKG_VERSION"));

    let config = netmon_config::resolve().context("loading configuration")?;

    let monitor = Arc::new(Monitor::new(Arc::new(SysinfoSource::new()), &config));
    let scheduler = monitor.scheduler();
    let state = Arc::new(ServerState::new(Arc::clone(&monitor), &config));

    scheduler.start(config.sampler.interval());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutting down gracefully...");
    };

    let served = netmon_server::serve(&config.server, state, shutdown).await;
    scheduler.stop().await;

    served.with_context(|| format!("serving on {}", config.server.bind_addr()))?;
    tracing::info!("Server closed");
    Ok(())
}
