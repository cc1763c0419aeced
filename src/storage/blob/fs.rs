//! Blob store backed by a local directory.

use crate::storage::blob::{validate_ref, BlobError, BlobStore};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Uses `root` as the blob directory, creating it if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, BlobError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn path_for(&self, blob_ref: &str) -> Result<PathBuf, BlobError> {
        validate_ref(blob_ref)?;
        Ok(self.root.join(blob_ref))
    }
}

fn not_found_as(blob_ref: &str, err: std::io::Error) -> BlobError {
    if err.kind() == ErrorKind::NotFound {
        BlobError::NotFound(blob_ref.to_string())
    } else {
        BlobError::Io(err)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, bytes: Bytes, extension: Option<&str>) -> Result<String, BlobError> {
        let id = Uuid::new_v4().simple().to_string();
        let blob_ref = match extension {
            Some(ext) if !ext.is_empty() => format!("{}.{}", id, ext.to_ascii_lowercase()),
            _ => id,
        };
        let path = self.path_for(&blob_ref)?;
        tokio::fs::write(&path, &bytes).await?;
        tracing::debug!(blob = %blob_ref, size = bytes.len(), "stored blob");
        Ok(blob_ref)
    }

    async fn get(&self, blob_ref: &str) -> Result<Bytes, BlobError> {
        let path = self.path_for(blob_ref)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| not_found_as(blob_ref, e))?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, blob_ref: &str) -> Result<(), BlobError> {
        let path = self.path_for(blob_ref)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| not_found_as(blob_ref, e))?;
        tracing::debug!(blob = %blob_ref, "deleted blob");
        Ok(())
    }
}
