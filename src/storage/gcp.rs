//! Google Cloud Storage provider
//!
//! Uses object_store::gcp::GoogleCloudStorage. Credentials follow the
//! provider's default chain (GOOGLE_APPLICATION_CREDENTIALS, Workload
//! Identity, GCE metadata server); this crate never handles them directly.

use object_store::gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder};

use crate::config::StorageConfig;

/// Build the GCS client for the configured bucket
pub fn build_store(config: &StorageConfig) -> object_store::Result<GoogleCloudStorage> {
    // from_env picks up GOOGLE_* overrides such as a service account path
    GoogleCloudStorageBuilder::from_env()
        .with_bucket_name(&config.bucket_name)
        .build()
}
