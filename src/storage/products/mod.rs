//! Product persistence, including each product's embedding.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryProductStore;
pub use postgres::PgProductStore;

use crate::domain::embedding::UnitVector;
use crate::domain::product::{NewProduct, Product, ProductPatch};
use crate::domain::search::Candidate;
use anyhow::Result;
use async_trait::async_trait;

/// Image reference and embedding, always written together.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub image_ref: String,
    pub embedding: UnitVector,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub product: Product,
    /// Blob reference the update displaced, if any.
    pub replaced_image: Option<String>,
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert(&self, draft: NewProduct, image: Option<StoredImage>) -> Result<Product>;

    async fn get(&self, id: i32) -> Result<Option<Product>>;

    /// All products ordered by id.
    async fn list(&self) -> Result<Vec<Product>>;

    /// Applies `patch` and, when given, swaps image and embedding in the same write.
    ///
    /// Returns `None` when no product has `id`.
    async fn update(
        &self,
        id: i32,
        patch: &ProductPatch,
        image: Option<StoredImage>,
    ) -> Result<Option<UpdateOutcome>>;

    /// Removes the product and returns the row as it was at deletion time, or `None` when no
    /// product has `id`.
    async fn delete(&self, id: i32) -> Result<Option<Product>>;

    /// Products holding an embedding, ordered by ascending id.
    async fn embedded_candidates(&self) -> Result<Vec<Candidate>>;

    async fn ping(&self) -> Result<()>;
}
