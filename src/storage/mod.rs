//! Storage session abstraction layer
//!
//! Every HTTP handler talks to the bucket through [`StorageBackend`]. The
//! production implementation is [`StorageSession`], which wraps an
//! `object_store` handle and adds name validation, the configured key prefix
//! and a per-operation deadline.

mod gcp;
mod session;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::info;

use crate::config::{StorageConfig, StorageProvider};
use crate::errors::StorageError;

pub use session::StorageSession;

/// Byte stream of an uploaded file
pub type FileStream<'a> = BoxStream<'a, std::io::Result<Bytes>>;

/// Object operations against a single bucket
///
/// Object names are relative to the session's key prefix, except for the
/// target prefix of [`StorageBackend::move_object`] and the names returned by
/// [`StorageBackend::list`], which are full bucket keys.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Stream `file` into the bucket, replacing any existing object
    async fn upload(&self, object: &str, file: Option<FileStream<'_>>) -> Result<(), StorageError>;

    /// Read an object fully into memory
    async fn get(&self, object: &str) -> Result<Bytes, StorageError>;

    /// Every key in the bucket, in provider order
    async fn list(&self) -> Result<Vec<String>, StorageError>;

    /// Copy an object under `new_prefix` and delete the original
    async fn move_object(&self, object: &str, new_prefix: &str) -> Result<(), StorageError>;

    /// Delete an object
    async fn delete(&self, object: &str) -> Result<(), StorageError>;
}

/// Create the storage session for the configured provider
pub fn create_backend(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>, StorageError> {
    let store: Arc<dyn ObjectStore> = match config.provider {
        StorageProvider::Gcs => Arc::new(gcp::build_store(config)?),
        StorageProvider::Memory => Arc::new(InMemory::new()),
    };

    let session = StorageSession::new(store, config);
    info!(
        provider = ?config.provider,
        bucket = session.bucket_name(),
        project = session.project_id(),
        path = session.path(),
        "Storage session created"
    );
    Ok(Arc::new(session))
}
