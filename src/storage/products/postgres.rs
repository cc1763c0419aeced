//! PostgreSQL product store. Embeddings live in a JSONB column next to the product fields.

use crate::domain::embedding::UnitVector;
use crate::domain::product::{NewProduct, Patch, Product, ProductPatch};
use crate::domain::search::Candidate;
use crate::infra::config::DatabaseConfig;
use crate::storage::products::{ProductStore, StoredImage, UpdateOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, image_path, embedding, created_at, updated_at";

const CREATE_PRODUCTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS products (
    id SERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    price NUMERIC(10, 2) NOT NULL DEFAULT 0,
    image_path TEXT,
    embedding JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

#[derive(Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    /// Connects and makes sure the `products` table exists.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .context("failed to connect to PostgreSQL")?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_PRODUCTS_TABLE)
            .execute(&self.pool)
            .await
            .context("failed to create products table")?;
        Ok(())
    }
}

fn product_from_row(row: &PgRow) -> Result<Product> {
    let embedding: Option<Json<Vec<f32>>> = row.try_get("embedding")?;
    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        image_path: row.try_get("image_path")?,
        embedding: embedding.map(|Json(v)| v),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn embedding_json(embedding: &UnitVector) -> Json<Vec<f32>> {
    Json(embedding.as_slice().to_vec())
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn insert(&self, draft: NewProduct, image: Option<StoredImage>) -> Result<Product> {
        let (image_ref, embedding) = match image {
            Some(StoredImage {
                image_ref,
                embedding,
            }) => (Some(image_ref), Some(embedding_json(&embedding))),
            None => (None, None),
        };

        let sql = format!(
            "INSERT INTO products (name, description, price, image_path, embedding)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            PRODUCT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(draft.price)
            .bind(image_ref)
            .bind(embedding)
            .fetch_one(&self.pool)
            .await?;
        product_from_row(&row)
    }

    async fn get(&self, id: i32) -> Result<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Product>> {
        let sql = format!("SELECT {} FROM products ORDER BY id", PRODUCT_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(product_from_row).collect()
    }

    async fn update(
        &self,
        id: i32,
        patch: &ProductPatch,
        image: Option<StoredImage>,
    ) -> Result<Option<UpdateOutcome>> {
        let mut tx = self.pool.begin().await?;

        // Lock the row so the displaced image reference is the one this update overwrites.
        let current = sqlx::query("SELECT image_path FROM products WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(tx.as_mut())
            .await?;
        let Some(current) = current else {
            return Ok(None);
        };
        let previous_image: Option<String> = current.try_get("image_path")?;

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE products SET updated_at = now()");
        if let Patch::Set(name) = &patch.name {
            qb.push(", name = ").push_bind(name.clone());
        }
        if let Patch::Set(description) = &patch.description {
            qb.push(", description = ").push_bind(description.clone());
        }
        if let Patch::Set(price) = &patch.price {
            qb.push(", price = ").push_bind(*price);
        }
        let replaces_image = image.is_some();
        if let Some(image) = &image {
            qb.push(", image_path = ")
                .push_bind(image.image_ref.clone())
                .push(", embedding = ")
                .push_bind(embedding_json(&image.embedding));
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(PRODUCT_COLUMNS);

        let row = qb.build().fetch_one(tx.as_mut()).await?;
        let product = product_from_row(&row)?;
        tx.commit().await?;

        let replaced_image = if replaces_image {
            previous_image.filter(|old| product.image_path.as_deref() != Some(old.as_str()))
        } else {
            None
        };

        Ok(Some(UpdateOutcome {
            product,
            replaced_image,
        }))
    }

    async fn delete(&self, id: i32) -> Result<Option<Product>> {
        let sql = format!("DELETE FROM products WHERE id = $1 RETURNING {}", PRODUCT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn embedded_candidates(&self) -> Result<Vec<Candidate>> {
        let rows = sqlx::query(
            "SELECT id, name, embedding FROM products WHERE embedding IS NOT NULL ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            let embedding: Option<Json<Vec<f32>>> = row.try_get("embedding")?;
            candidates.push(Candidate {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                embedding: embedding.map(|Json(v)| v),
            });
        }
        Ok(candidates)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
