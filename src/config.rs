//! Configuration management for the cloud storage service
//!
//! Supports configuration via:
//! - Environment variables (primary)
//! - Optional TOML config file named by `CONFIG_FILE` (secondary)
//!
//! Environment variables take precedence over config file values. The storage
//! settings have no defaults: a missing or malformed value is fatal at startup.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;

/// Object storage provider behind the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    /// Google Cloud Storage
    #[default]
    Gcs,
    /// Process-local store, for development and tests
    Memory,
}

impl FromStr for StorageProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gcs" | "gcp" | "google" => Ok(StorageProvider::Gcs),
            "memory" | "mem" => Ok(StorageProvider::Memory),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

/// Storage session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub provider: StorageProvider,

    /// Bucket holding every object
    pub bucket_name: String,

    /// Provider project identifier
    pub project_id: String,

    /// Prefix prepended to every object name; may be empty
    pub object_path: String,

    /// Longest object name accepted on upload
    pub max_name_length: usize,

    /// Upper bound on a single storage operation, in seconds
    pub max_timeout_secs: u64,
}

impl StorageConfig {
    pub fn max_timeout(&self) -> Duration {
        Duration::from_secs(self.max_timeout_secs)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (default: 0.0.0.0:8080)
    pub bind_address: SocketAddr,

    /// Max request body size in bytes (default: 5GB)
    pub max_body_size: usize,

    /// Multipart form field carrying the uploaded file
    pub file_field: String,
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_body_size() -> usize {
    5 * 1024 * 1024 * 1024 // 5GB
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

/// Values accepted in the optional TOML file; keys mirror the environment
/// variable names in lower case.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    bucket_name: Option<String>,
    project_id: Option<String>,
    object_path: Option<String>,
    file_input: Option<String>,
    max_file_size: Option<usize>,
    max_timeout: Option<u64>,
    bind_address: Option<SocketAddr>,
    max_body_size: Option<usize>,
    storage_provider: Option<StorageProvider>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - BUCKET_NAME: bucket name (required)
    /// - PROJECT_ID: provider project identifier (required)
    /// - OBJECT_PATH: key prefix for every object (required, may be empty)
    /// - FILE_INPUT: multipart field name for uploads (required)
    /// - MAX_FILE_SIZE: maximum object name length (required)
    /// - MAX_TIMEOUT: per-operation timeout in seconds (required)
    /// - BIND_ADDRESS: server bind address (default: 0.0.0.0:8080)
    /// - MAX_BODY_SIZE: max request size in bytes (default: 5GB)
    /// - STORAGE_PROVIDER: gcs|memory (default: gcs)
    /// - CONFIG_FILE: optional path to TOML config file
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match lookup("CONFIG_FILE") {
            Some(path) => Self::read_file(&path)?,
            None => FileConfig::default(),
        };
        Self::from_sources(lookup, file)
    }

    fn read_file(path: &str) -> Result<FileConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    fn from_sources<F>(lookup: F, file: FileConfig) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &'static str, fallback: Option<String>| {
            lookup(key).or(fallback).ok_or(ConfigError::Missing(key))
        };

        let storage = StorageConfig {
            provider: match lookup("STORAGE_PROVIDER") {
                Some(value) => value.parse()?,
                None => file.storage_provider.unwrap_or_default(),
            },
            bucket_name: text("BUCKET_NAME", file.bucket_name)?,
            project_id: text("PROJECT_ID", file.project_id)?,
            object_path: text("OBJECT_PATH", file.object_path)?,
            max_name_length: parse_or(&lookup, "MAX_FILE_SIZE", file.max_file_size)?
                .ok_or(ConfigError::Missing("MAX_FILE_SIZE"))?,
            max_timeout_secs: parse_or(&lookup, "MAX_TIMEOUT", file.max_timeout)?
                .ok_or(ConfigError::Missing("MAX_TIMEOUT"))?,
        };

        let server = ServerConfig {
            bind_address: parse_or(&lookup, "BIND_ADDRESS", file.bind_address)?
                .unwrap_or_else(default_bind_address),
            max_body_size: parse_or(&lookup, "MAX_BODY_SIZE", file.max_body_size)?
                .unwrap_or_else(default_max_body_size),
            file_field: text("FILE_INPUT", file.file_input)?,
        };

        Ok(Config { server, storage })
    }
}

/// Parse `key` from the lookup if present, otherwise take the file value
fn parse_or<F, T>(lookup: &F, key: &'static str, fallback: Option<T>) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        None => Ok(fallback),
    }
}
