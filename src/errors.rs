//! Error types for the cloud storage service
//!
//! Storage operations return [`StorageError`], startup configuration returns
//! [`ConfigError`], and HTTP handlers convert failures into [`ApiError`],
//! which renders as a single-entry JSON object keyed by the failing step.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned by storage session operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Upload was called without a file stream
    #[error("file is nil")]
    MissingFile,

    /// Upload was called with an empty object name
    #[error("object is empty")]
    EmptyName,

    /// Object name is longer than the configured limit
    #[error("object is larger than the configured max size")]
    NameTooLong,

    /// Object name ends in a path separator
    #[error("object is a directory")]
    IsDirectory,

    /// Object name does not form a valid bucket key (empty or relative segments)
    #[error("invalid object name: {0}")]
    InvalidKey(#[source] object_store::path::Error),

    /// Copying the request stream into the bucket failed
    #[error("error uploading file: {0}")]
    Upload(#[source] std::io::Error),

    /// Completing the object write failed
    #[error("error closing stream: {0}")]
    Finalize(#[source] std::io::Error),

    /// Move target already exists in the bucket
    #[error("the new path can not be the same as the old path")]
    SamePath,

    /// The object does not exist
    #[error("{0}")]
    NotFound(#[source] object_store::Error),

    /// The operation did not finish before its deadline
    #[error("{operation} timed out after {}s", .timeout.as_secs())]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// Listing failed part way; `partial` holds the keys read before the failure
    #[error("{source}")]
    List {
        partial: Vec<String>,
        #[source]
        source: object_store::Error,
    },

    /// The copy succeeded but the original could not be removed, so both keys exist
    #[error("copied {from} to {to} but failed to delete the original: {source}")]
    PartialMove {
        from: String,
        to: String,
        #[source]
        source: Box<StorageError>,
    },

    /// Any other provider failure
    #[error(transparent)]
    Provider(object_store::Error),
}

impl StorageError {
    /// Whether the provider reported the target object as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    /// Keys read before a listing failed part way
    pub fn partial_listing(&self) -> Option<&[String]> {
        match self {
            StorageError::List { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

impl From<object_store::Error> for StorageError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { .. } => StorageError::NotFound(err),
            other => StorageError::Provider(other),
        }
    }
}

/// Startup configuration errors. Any of these aborts the process.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("unknown storage provider: {0}")]
    UnknownProvider(String),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// HTTP error response: `{"<context>": "<message>"}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    context: &'static str,
    message: String,
}

impl ApiError {
    /// A 500 response regardless of the error kind
    pub fn internal(context: &'static str, message: impl ToString) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            context,
            message: message.to_string(),
        }
    }

    /// 404 for a missing object, 500 for everything else
    pub fn from_storage(context: &'static str, err: &StorageError) -> Self {
        let status = if err.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            context,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = Map::new();
        body.insert(self.context.to_string(), Value::String(self.message));
        (self.status, Json(Value::Object(body))).into_response()
    }
}
