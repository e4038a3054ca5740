//! HTTP routes for the storage API
//!
//! Implements the object operations:
//! - POST /upload - multipart upload
//! - GET /download/:filename - raw object bytes
//! - GET /list - every key in the bucket
//! - PUT /move/:filename?folder=... - copy under a new prefix, then delete
//! - DELETE /delete/:filename - delete an object

mod handlers;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::storage::StorageBackend;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageBackend>,
    /// Multipart field that carries uploads
    pub file_field: Arc<str>,
}

impl AppState {
    pub fn new(storage: Arc<dyn StorageBackend>, file_field: &str) -> Self {
        Self {
            storage,
            file_field: Arc::from(file_field),
        }
    }
}

/// Query parameters for the move operation
#[derive(Debug, serde::Deserialize)]
pub struct MoveQuery {
    /// Prefix the object is moved under; missing means the bucket root
    #[serde(default)]
    pub folder: String,
}

/// Create the storage API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/metrics", get(handlers::metrics))
        .route("/upload", post(handlers::upload))
        .route("/download/:filename", get(handlers::download))
        .route("/list", get(handlers::list))
        .route("/move/:filename", put(handlers::move_file))
        .route("/delete/:filename", delete(handlers::delete))
        .with_state(state)
}
