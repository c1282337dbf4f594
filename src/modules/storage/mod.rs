//! Storage module for report attachments
//!
//! Provides the [`BlobStorage`] seam and an S3-compatible implementation for
//! uploads, deletes, metadata reads and time-limited signed download URLs.
//! Every operation returns a [`StorageError`] on failure so callers decide
//! whether a missing storage backend is fatal for them.

mod blob_client;
mod connection_string;
mod error;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

pub use blob_client::ObjectStorageClient;
pub use connection_string::BlobConnectionString;
pub use error::StorageError;

/// Properties of a stored object
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlobMetadata {
    pub size: i64,
    pub content_type: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, String>,
}

/// Blob storage operations used by the attachment service
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `data` under a fresh collision-resistant name and return its URL
    async fn upload(
        &self,
        data: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Delete the object a stored URL points to
    async fn delete(&self, url: &str) -> Result<(), StorageError>;

    /// Derive a read-only URL for a stored object that expires after `expiry_hours`
    async fn generate_download_url(
        &self,
        url: &str,
        expiry_hours: u32,
    ) -> Result<String, StorageError>;

    async fn get_metadata(&self, url: &str) -> Result<BlobMetadata, StorageError>;
}

/// Stand-in used when no blob connection string is configured
pub struct DisabledBlobStorage;

#[async_trait]
impl BlobStorage for DisabledBlobStorage {
    async fn upload(&self, _: Vec<u8>, _: &str, _: &str) -> Result<String, StorageError> {
        Err(StorageError::NotConfigured)
    }

    async fn delete(&self, _: &str) -> Result<(), StorageError> {
        Err(StorageError::NotConfigured)
    }

    async fn generate_download_url(&self, _: &str, _: u32) -> Result<String, StorageError> {
        Err(StorageError::NotConfigured)
    }

    async fn get_metadata(&self, _: &str) -> Result<BlobMetadata, StorageError> {
        Err(StorageError::NotConfigured)
    }
}
