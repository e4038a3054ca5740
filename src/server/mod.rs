//! HTTP server implementation
//!
//! Sets up the Axum HTTP server with:
//! - Storage API routes
//! - Middleware (tracing, metrics, body limit, compression)
//! - Graceful shutdown

use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::info;

use crate::config::ServerConfig;
use crate::metrics;
use crate::routes::{self, AppState};
use crate::storage::StorageBackend;

/// HTTP server for the storage API
pub struct Server {
    config: ServerConfig,
    storage: Arc<dyn StorageBackend>,
}

impl Server {
    pub fn new(config: ServerConfig, storage: Arc<dyn StorageBackend>) -> Self {
        Self { config, storage }
    }

    /// Build the Axum router with all middleware
    fn build_router(&self) -> Router {
        let state = AppState::new(self.storage.clone(), &self.config.file_field);
        routes::create_router(state).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(metrics::track_http_requests))
                // Uploads are streamed, so the default 2MB limit is lifted to the configured size
                .layer(DefaultBodyLimit::max(self.config.max_body_size))
                .layer(CompressionLayer::new())
                .into_inner(),
        )
    }

    /// Start the server and run until shutdown signal
    pub async fn start<F>(&self, shutdown: F) -> std::io::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let app = self.build_router();

        let listener = tokio::net::TcpListener::bind(self.config.bind_address).await?;
        info!(address = %self.config.bind_address, "Server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
