//! Opaque storage for uploaded image bytes.

pub mod fs;

pub use fs::FsBlobStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob '{0}' not found")]
    NotFound(String),
    #[error("invalid blob reference '{0}'")]
    InvalidRef(String),
    #[error("blob storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under a fresh reference, suffixed with `extension` when given.
    async fn put(&self, bytes: Bytes, extension: Option<&str>) -> Result<String, BlobError>;

    async fn get(&self, blob_ref: &str) -> Result<Bytes, BlobError>;

    /// Fails with `NotFound` when nothing is stored under `blob_ref`.
    async fn delete(&self, blob_ref: &str) -> Result<(), BlobError>;
}

/// Accepts flat file names only: ASCII alphanumerics, `-`, `_` and inner dots.
pub fn validate_ref(blob_ref: &str) -> Result<(), BlobError> {
    let valid = !blob_ref.is_empty()
        && blob_ref.len() <= 128
        && !blob_ref.starts_with('.')
        && !blob_ref.contains("..")
        && blob_ref
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(BlobError::InvalidRef(blob_ref.to_string()))
    }
}
