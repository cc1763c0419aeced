//! PostgreSQL store round-trip. Runs only when `DATABASE_URL` is set.

use image_catalog_search::domain::product::{NewProduct, Patch, ProductPatch};
use image_catalog_search::domain::UnitVector;
use image_catalog_search::infra::config::DatabaseConfig;
use image_catalog_search::storage::products::{PgProductStore, ProductStore, StoredImage};
use rust_decimal::Decimal;
use std::env;

async fn connect() -> Option<PgProductStore> {
    dotenv::dotenv().ok();
    let Ok(url) = env::var("DATABASE_URL") else {
        println!("DATABASE_URL not set, skipping PostgreSQL test");
        return None;
    };
    let config = DatabaseConfig {
        url,
        max_connections: 2,
    };
    Some(PgProductStore::connect(&config).await.unwrap())
}

fn stored(image_ref: &str, raw: Vec<f32>) -> StoredImage {
    StoredImage {
        image_ref: image_ref.to_string(),
        embedding: UnitVector::normalize(raw).unwrap(),
    }
}

#[tokio::test]
async fn postgres_product_round_trip() {
    let Some(store) = connect().await else {
        return;
    };
    store.ping().await.unwrap();

    let marker = format!("pg-test-{}", uuid::Uuid::new_v4().simple());
    let draft = NewProduct::new(&marker, Some("from test"), Decimal::new(1999, 2)).unwrap();
    let created = store
        .insert(draft, Some(stored("a.png", vec![3.0, 4.0])))
        .await
        .unwrap();
    assert_eq!(created.name, marker);
    assert_eq!(created.price, Decimal::new(1999, 2));
    assert_eq!(created.embedding, Some(vec![0.6, 0.8]));
    assert_eq!(created.image_path.as_deref(), Some("a.png"));

    let fetched = store.get(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.embedding, created.embedding);

    // Fields only: embedding and image untouched.
    let patch = ProductPatch {
        price: Patch::Set(Decimal::new(500, 2)),
        description: Patch::Set(None),
        ..Default::default()
    };
    let outcome = store.update(created.id, &patch, None).await.unwrap().unwrap();
    assert_eq!(outcome.product.price, Decimal::new(500, 2));
    assert_eq!(outcome.product.description, None);
    assert_eq!(outcome.product.embedding, created.embedding);
    assert_eq!(outcome.replaced_image, None);
    assert!(outcome.product.updated_at >= created.updated_at);

    // Image swap reports the displaced reference.
    let outcome = store
        .update(
            created.id,
            &ProductPatch::default(),
            Some(stored("b.png", vec![0.0, 2.0])),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.replaced_image.as_deref(), Some("a.png"));
    assert_eq!(outcome.product.image_path.as_deref(), Some("b.png"));
    assert_eq!(outcome.product.embedding, Some(vec![0.0, 1.0]));

    let candidates = store.embedded_candidates().await.unwrap();
    assert!(candidates.windows(2).all(|w| w[0].id < w[1].id));
    assert!(candidates.iter().any(|c| c.id == created.id && c.name == marker));

    let deleted = store.delete(created.id).await.unwrap().unwrap();
    assert_eq!(deleted.image_path.as_deref(), Some("b.png"));
    assert!(store.get(created.id).await.unwrap().is_none());
    assert!(store.delete(created.id).await.unwrap().is_none());
    assert!(store
        .update(created.id, &ProductPatch::default(), None)
        .await
        .unwrap()
        .is_none());
}
