//! Storage session over an `object_store` handle
//!
//! Each operation takes its deadline from the configured maximum timeout when
//! it starts. Provider futures are dropped once the deadline passes or the
//! calling request goes away, which cancels the in-flight request.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use object_store::buffered::BufWriter;
use object_store::path::Path;
use object_store::ObjectStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::config::StorageConfig;
use crate::errors::StorageError;
use crate::metrics;
use crate::storage::{FileStream, StorageBackend};

/// Bytes buffered before an upload switches to a multipart upload
const UPLOAD_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// Bucket handle plus the per-session settings applied to every call
#[derive(Debug)]
pub struct StorageSession {
    store: Arc<dyn ObjectStore>,
    bucket_name: String,
    project_id: String,
    path: String,
    max_name_length: usize,
    max_timeout: Duration,
    upload_buffer: usize,
}

impl StorageSession {
    pub fn new(store: Arc<dyn ObjectStore>, config: &StorageConfig) -> Self {
        Self {
            store,
            bucket_name: config.bucket_name.clone(),
            project_id: config.project_id.clone(),
            path: config.object_path.clone(),
            max_name_length: config.max_name_length,
            max_timeout: config.max_timeout(),
            upload_buffer: UPLOAD_BUFFER_SIZE,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_upload_buffer(mut self, upload_buffer: usize) -> Self {
        self.upload_buffer = upload_buffer;
        self
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full bucket key for a user-supplied object name
    fn key(&self, object: &str) -> Result<Path, StorageError> {
        parse_key(&format!("{}{}", self.path, object))
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.max_timeout
    }

    fn timed_out(&self, operation: &'static str) -> StorageError {
        warn!(operation, timeout_secs = self.max_timeout.as_secs(), "Storage operation timed out");
        StorageError::Timeout {
            operation,
            timeout: self.max_timeout,
        }
    }

    fn validate_upload(&self, object: &str) -> Result<(), StorageError> {
        if object.is_empty() {
            return Err(StorageError::EmptyName);
        }
        // Limits the length of the name, not of the payload
        if object.len() > self.max_name_length {
            return Err(StorageError::NameTooLong);
        }
        if object.ends_with('/') {
            return Err(StorageError::IsDirectory);
        }
        Ok(())
    }

    async fn upload_object(&self, object: &str, file: Option<FileStream<'_>>) -> Result<(), StorageError> {
        let mut file = file.ok_or(StorageError::MissingFile)?;
        self.validate_upload(object)?;

        let deadline = self.deadline();
        let location = self.key(object)?;
        debug!(bucket = %self.bucket_name, key = %location, "Uploading object");

        let mut writer = BufWriter::with_capacity(Arc::clone(&self.store), location, self.upload_buffer);
        let copied = timeout_at(deadline, async {
            while let Some(chunk) = file.next().await {
                writer.write_all(&chunk?).await?;
            }
            Ok::<_, std::io::Error>(())
        })
        .await;

        let failed = match copied {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(StorageError::Upload(e)),
            Err(_) => Some(self.timed_out("upload")),
        };
        if let Some(err) = failed {
            self.abort_upload(&mut writer).await;
            return Err(err);
        }

        timeout_at(deadline, writer.shutdown())
            .await
            .map_err(|_| self.timed_out("upload"))?
            .map_err(StorageError::Finalize)
    }

    /// Drop any multipart upload already started for a failed write
    async fn abort_upload(&self, writer: &mut BufWriter) {
        match tokio::time::timeout(self.max_timeout, writer.abort()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to abort upload"),
            Err(_) => warn!("Aborting upload timed out"),
        }
    }

    async fn read_object(&self, object: &str) -> Result<Bytes, StorageError> {
        let deadline = self.deadline();
        let location = self.key(object)?;
        debug!(bucket = %self.bucket_name, key = %location, "Reading object");

        let data = timeout_at(deadline, async {
            let result = self.store.get(&location).await?;
            result.bytes().await
        })
        .await
        .map_err(|_| self.timed_out("get"))??;
        Ok(data)
    }

    async fn list_keys(&self) -> Result<Vec<String>, StorageError> {
        let deadline = self.deadline();
        debug!(bucket = %self.bucket_name, "Listing objects");

        // The provider pages through the bucket; drain every page here
        let mut files = Vec::new();
        let drained = timeout_at(deadline, async {
            let mut objects = self.store.list(None);
            while let Some(meta) = objects.next().await {
                files.push(meta?.location.to_string());
            }
            Ok::<_, object_store::Error>(())
        })
        .await;

        match drained {
            Ok(Ok(())) => Ok(files),
            Ok(Err(source)) => Err(StorageError::List { partial: files, source }),
            Err(_) => Err(self.timed_out("list")),
        }
    }

    async fn move_key(&self, object: &str, new_prefix: &str) -> Result<(), StorageError> {
        let from = self.key(object)?;
        // The target does not carry the session prefix
        let to = parse_key(&format!("{new_prefix}{object}"))?;

        // Listed keys come back in the same form `Path::parse` produces
        let target = to.to_string();
        let files = self.list_keys().await?;
        if files.iter().any(|file| *file == target) {
            return Err(StorageError::SamePath);
        }

        let deadline = self.deadline();
        debug!(bucket = %self.bucket_name, from = %from, to = %to, "Moving object");

        timeout_at(deadline, self.store.copy(&from, &to))
            .await
            .map_err(|_| self.timed_out("move"))??;

        let deleted = match timeout_at(deadline, self.store.delete(&from)).await {
            Ok(result) => result.map_err(StorageError::from),
            Err(_) => Err(self.timed_out("move")),
        };
        deleted.map_err(|source| {
            warn!(from = %from, to = %to, error = %source, "Object copied but original was not deleted");
            StorageError::PartialMove {
                from: from.to_string(),
                to: to.to_string(),
                source: Box::new(source),
            }
        })
    }

    async fn delete_object(&self, object: &str) -> Result<(), StorageError> {
        let deadline = self.deadline();
        let location = self.key(object)?;
        debug!(bucket = %self.bucket_name, key = %location, "Deleting object");

        // GCS already answers NotFound on delete, but the local and in-memory
        // stores treat a missing key as deleted, so check first
        timeout_at(deadline, async {
            self.store.head(&location).await?;
            self.store.delete(&location).await
        })
        .await
        .map_err(|_| self.timed_out("delete"))??;
        Ok(())
    }
}

/// Keys are kept verbatim; `Path::from` would percent-encode characters such as
/// `#` and `%`, so listed names would no longer match uploaded ones
fn parse_key(key: &str) -> Result<Path, StorageError> {
    Path::parse(key).map_err(StorageError::InvalidKey)
}

#[async_trait]
impl StorageBackend for StorageSession {
    async fn upload(&self, object: &str, file: Option<FileStream<'_>>) -> Result<(), StorageError> {
        let started = std::time::Instant::now();
        let result = self.upload_object(object, file).await;
        metrics::record_storage_operation("upload", started, &result);
        result
    }

    async fn get(&self, object: &str) -> Result<Bytes, StorageError> {
        let started = std::time::Instant::now();
        let result = self.read_object(object).await;
        metrics::record_storage_operation("get", started, &result);
        result
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        let started = std::time::Instant::now();
        let result = self.list_keys().await;
        metrics::record_storage_operation("list", started, &result);
        result
    }

    async fn move_object(&self, object: &str, new_prefix: &str) -> Result<(), StorageError> {
        let started = std::time::Instant::now();
        let result = self.move_key(object, new_prefix).await;
        metrics::record_storage_operation("move", started, &result);
        result
    }

    async fn delete(&self, object: &str) -> Result<(), StorageError> {
        let started = std::time::Instant::now();
        let result = self.delete_object(object).await;
        metrics::record_storage_operation("delete", started, &result);
        result
    }
}
