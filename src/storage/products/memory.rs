//! In-process product store used by tests and database-less runs.

use crate::domain::product::{NewProduct, Product, ProductPatch};
use crate::domain::search::Candidate;
use crate::storage::products::{ProductStore, StoredImage, UpdateOutcome};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    next_id: i32,
    rows: BTreeMap<i32, Product>,
}

#[derive(Default)]
pub struct InMemoryProductStore {
    inner: RwLock<Inner>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn insert(&self, draft: NewProduct, image: Option<StoredImage>) -> Result<Product> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let now = Utc::now();
        let (image_path, embedding) = match image {
            Some(image) => (Some(image.image_ref), Some(image.embedding.into_inner())),
            None => (None, None),
        };
        let product = Product {
            id: inner.next_id,
            name: draft.name,
            description: draft.description,
            price: draft.price,
            image_path,
            embedding,
            created_at: now,
            updated_at: now,
        };
        inner.rows.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get(&self, id: i32) -> Result<Option<Product>> {
        Ok(self.inner.read().await.rows.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Product>> {
        Ok(self.inner.read().await.rows.values().cloned().collect())
    }

    async fn update(
        &self,
        id: i32,
        patch: &ProductPatch,
        image: Option<StoredImage>,
    ) -> Result<Option<UpdateOutcome>> {
        let mut inner = self.inner.write().await;
        let Some(product) = inner.rows.get_mut(&id) else {
            return Ok(None);
        };

        patch.apply_to(product);
        let replaced_image = match image {
            Some(image) => {
                product.embedding = Some(image.embedding.into_inner());
                product
                    .image_path
                    .replace(image.image_ref)
                    .filter(|old| product.image_path.as_deref() != Some(old.as_str()))
            }
            None => None,
        };
        product.updated_at = Utc::now();

        Ok(Some(UpdateOutcome {
            product: product.clone(),
            replaced_image,
        }))
    }

    async fn delete(&self, id: i32) -> Result<Option<Product>> {
        Ok(self.inner.write().await.rows.remove(&id))
    }

    async fn embedded_candidates(&self) -> Result<Vec<Candidate>> {
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .values()
            .filter(|p| p.embedding.is_some())
            .map(|p| Candidate {
                id: p.id,
                name: p.name.clone(),
                embedding: p.embedding.clone(),
            })
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
