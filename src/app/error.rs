use crate::domain::search::RankError;
use crate::infra::encoder::EncodeError;
use crate::storage::blob::BlobError;
use thiserror::Error;

/// Failure of a catalog operation, as reported to callers.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("{0}")]
    Validation(String),
    #[error("product {0} not found")]
    NotFound(i32),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Rank(#[from] RankError),
    #[error("failed to delete image '{blob_ref}': {source}")]
    BlobCleanup {
        blob_ref: String,
        #[source]
        source: BlobError,
    },
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl CatalogError {
    /// Stable machine-readable error kind.
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::InvalidImage(_) | CatalogError::Encode(EncodeError::InvalidImage(_)) => {
                "invalid_image"
            }
            CatalogError::UnsupportedMediaType(_) => "unsupported_media_type",
            CatalogError::Validation(_) => "validation",
            CatalogError::NotFound(_) | CatalogError::Blob(BlobError::NotFound(_)) => "not_found",
            CatalogError::Encode(EncodeError::DegenerateEmbedding(_)) => "degenerate_embedding",
            CatalogError::Encode(EncodeError::ModelUnavailable(_)) => "model_unavailable",
            CatalogError::Encode(EncodeError::EncodingFailure(_)) => "encoding_failure",
            CatalogError::Rank(RankError::DimensionMismatch { .. }) => "dimension_mismatch",
            CatalogError::BlobCleanup { .. } => "blob_cleanup",
            CatalogError::Blob(_) | CatalogError::Storage(_) => "storage",
        }
    }
}
