//! Cloud storage service - HTTP façade over an object storage bucket
//!
//! Exposes upload, download, list, move and delete as JSON REST endpoints.
//! Every object name is scoped under a configured key prefix and every
//! storage call is bounded by a configured timeout.

mod config;
mod errors;
mod metrics;
mod routes;
mod server;
mod storage;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with JSON output for structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    crate::metrics::init_metrics().context("failed to register metrics")?;

    info!("Starting cloud storage service");

    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;
    info!(?config, "Configuration loaded");

    let storage = storage::create_backend(&config.storage).context("failed to create storage session")?;

    let server = Server::new(config.server.clone(), storage);

    // Handle graceful shutdown
    let shutdown_signal = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => {
                error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        }
    };

    info!("Server starting on {}", config.server.bind_address);
    if let Err(e) = server.start(shutdown_signal).await {
        error!(error = %e, "Server error");
        return Err(e).context("server failed");
    }

    info!("Server shutdown complete");
    Ok(())
}
