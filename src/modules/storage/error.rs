use thiserror::Error;

/// Errors that can occur during blob storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Blob storage is not configured")]
    NotConfigured,

    #[error("Invalid blob storage connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Could not extract account key from connection string")]
    MissingAccountKey,

    #[error("Invalid blob URL: {0}")]
    InvalidUrl(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Blob storage request failed: {0}")]
    Backend(String),
}
