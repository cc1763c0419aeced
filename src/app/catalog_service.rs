//! The catalog service.
//!
//! Coordinates the three collaborators behind every product operation:
//! 1.  The `ImageEncoder`, which turns uploaded images into unit embeddings.
//! 2.  The `BlobStore`, which keeps the uploaded image bytes.
//! 3.  The `ProductStore`, which persists product fields together with their embedding.
//!
//! Every image is encoded before anything is written, so a failed encode leaves no trace.

use crate::app::error::CatalogError;
use crate::domain::embedding::UnitVector;
use crate::domain::product::{ImageUpload, NewProduct, Product, ProductPatch};
use crate::domain::search::{rank, SearchHit, DEFAULT_SEARCH_LIMIT};
use crate::infra::encoder::{encode_blocking, ImageEncoder};
use crate::storage::blob::{BlobError, BlobStore};
use crate::storage::products::{ProductStore, StoredImage};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Embedding of a single uploaded image.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImageEmbedding {
    pub embedding: Vec<f32>,
    pub dims: usize,
    pub model: String,
}

/// Stored bytes of a product image.
#[derive(Debug, Clone)]
pub struct ProductImage {
    pub bytes: Bytes,
    pub content_type: &'static str,
}

pub struct CatalogService {
    store: Arc<dyn ProductStore>,
    blobs: Arc<dyn BlobStore>,
    encoder: Arc<dyn ImageEncoder>,
    search_limit: usize,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn ProductStore>,
        blobs: Arc<dyn BlobStore>,
        encoder: Arc<dyn ImageEncoder>,
    ) -> Self {
        Self {
            store,
            blobs,
            encoder,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn ProductStore> {
        &self.store
    }

    pub fn encoder(&self) -> &Arc<dyn ImageEncoder> {
        &self.encoder
    }

    /// Encodes an image without touching storage.
    pub async fn embed(&self, upload: ImageUpload) -> Result<ImageEmbedding, CatalogError> {
        let embedding = self.embed_upload(&upload).await?;
        Ok(ImageEmbedding {
            dims: embedding.dims(),
            embedding: embedding.into_inner(),
            model: self.encoder.model_id().to_string(),
        })
    }

    pub async fn create(
        &self,
        draft: NewProduct,
        image: Option<ImageUpload>,
    ) -> Result<Product, CatalogError> {
        let image = image
            .ok_or_else(|| CatalogError::InvalidImage("an image is required".to_string()))?;
        let embedding = self.embed_upload(&image).await?;
        let image_ref = self.blobs.put(image.bytes.clone(), image.extension()).await?;

        let stored = StoredImage {
            image_ref: image_ref.clone(),
            embedding,
        };
        match self.store.insert(draft, Some(stored)).await {
            Ok(product) => {
                tracing::info!(id = product.id, image = %image_ref, "created product");
                Ok(product)
            }
            Err(e) => {
                self.discard_blob(&image_ref).await;
                Err(e.into())
            }
        }
    }

    /// Applies a partial update; a supplied image replaces image and embedding together.
    pub async fn update(
        &self,
        id: i32,
        patch: ProductPatch,
        image: Option<ImageUpload>,
    ) -> Result<Product, CatalogError> {
        let patch = patch.validated().map_err(CatalogError::Validation)?;
        if self.store.get(id).await?.is_none() {
            return Err(CatalogError::NotFound(id));
        }

        let stored = match image {
            Some(upload) => {
                let embedding = self.embed_upload(&upload).await?;
                let image_ref = self
                    .blobs
                    .put(upload.bytes.clone(), upload.extension())
                    .await?;
                Some(StoredImage {
                    image_ref,
                    embedding,
                })
            }
            None => None,
        };
        let new_ref = stored.as_ref().map(|s| s.image_ref.clone());

        let outcome = match self.store.update(id, &patch, stored).await {
            Ok(Some(outcome)) => outcome,
            Ok(None) => {
                if let Some(new_ref) = &new_ref {
                    self.discard_blob(new_ref).await;
                }
                return Err(CatalogError::NotFound(id));
            }
            Err(e) => {
                if let Some(new_ref) = &new_ref {
                    self.discard_blob(new_ref).await;
                }
                return Err(e.into());
            }
        };

        if let Some(old_ref) = &outcome.replaced_image {
            self.discard_blob(old_ref).await;
        }

        tracing::info!(id, image_replaced = new_ref.is_some(), "updated product");
        Ok(outcome.product)
    }

    /// Deletes the image blob, then the record.
    ///
    /// A blob that is already gone is not an error. Any other blob failure keeps the record.
    /// An image swapped in by an update that lands between the two steps is removed after the
    /// record.
    pub async fn delete(&self, id: i32) -> Result<(), CatalogError> {
        let product = self.get(id).await?;

        if let Some(blob_ref) = &product.image_path {
            match self.blobs.delete(blob_ref).await {
                Ok(()) => {}
                Err(BlobError::NotFound(_)) => {
                    tracing::debug!(id, blob = %blob_ref, "image blob already gone");
                }
                Err(source) => {
                    return Err(CatalogError::BlobCleanup {
                        blob_ref: blob_ref.clone(),
                        source,
                    });
                }
            }
        }

        let Some(deleted) = self.store.delete(id).await? else {
            return Err(CatalogError::NotFound(id));
        };
        if let Some(latest) = deleted.image_path.as_deref() {
            if product.image_path.as_deref() != Some(latest) {
                self.discard_blob(latest).await;
            }
        }
        tracing::info!(id, "deleted product");
        Ok(())
    }

    pub async fn get(&self, id: i32) -> Result<Product, CatalogError> {
        self.store
            .get(id)
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    pub async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.store.list().await?)
    }

    /// Ranks stored products by similarity to the query image.
    pub async fn search(&self, upload: ImageUpload) -> Result<Vec<SearchHit>, CatalogError> {
        let query = self.embed_upload(&upload).await?;
        let candidates = self.store.embedded_candidates().await?;
        let hits = rank(&query, &candidates, self.search_limit)?;
        tracing::debug!(
            candidates = candidates.len(),
            hits = hits.len(),
            "similarity search"
        );
        Ok(hits)
    }

    pub async fn image(&self, id: i32) -> Result<ProductImage, CatalogError> {
        let product = self.get(id).await?;
        let blob_ref = product.image_path.ok_or(CatalogError::NotFound(id))?;
        let bytes = self.blobs.get(&blob_ref).await?;
        let content_type = image::guess_format(&bytes)
            .map(|format| format.to_mime_type())
            .unwrap_or("application/octet-stream");
        Ok(ProductImage {
            bytes,
            content_type,
        })
    }

    async fn embed_upload(&self, upload: &ImageUpload) -> Result<UnitVector, CatalogError> {
        if !upload.has_image_media_type() {
            return Err(CatalogError::UnsupportedMediaType(
                upload
                    .content_type
                    .clone()
                    .unwrap_or_else(|| "missing content type".to_string()),
            ));
        }
        let embedding = encode_blocking(self.encoder.clone(), upload.bytes.clone()).await?;
        Ok(embedding)
    }

    async fn discard_blob(&self, blob_ref: &str) {
        match self.blobs.delete(blob_ref).await {
            Ok(()) | Err(BlobError::NotFound(_)) => {}
            Err(e) => {
                tracing::warn!(blob = %blob_ref, error = %e, "failed to remove image blob");
            }
        }
    }
}
