//! Shared fixtures: a deterministic encoder double, image helpers and a wired-up catalog.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, Rgb, RgbImage};
use image_catalog_search::domain::product::{ImageUpload, NewProduct, Product, ProductPatch};
use image_catalog_search::domain::search::Candidate;
use image_catalog_search::domain::UnitVector;
use image_catalog_search::infra::encoder::{decode_rgb, EncodeError, ImageEncoder};
use image_catalog_search::storage::blob::{BlobError, BlobStore, FsBlobStore};
use image_catalog_search::storage::products::{
    InMemoryProductStore, ProductStore, StoredImage, UpdateOutcome,
};
use image_catalog_search::CatalogService;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Embeds an image as its normalized mean RGB colour. Pure black is degenerate.
#[derive(Default)]
pub struct MeanColorEncoder {
    calls: AtomicUsize,
}

impl MeanColorEncoder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageEncoder for MeanColorEncoder {
    fn model_id(&self) -> &str {
        "test/mean-color"
    }

    fn dimensions(&self) -> usize {
        3
    }

    fn encode(&self, image_bytes: &[u8]) -> Result<UnitVector, EncodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rgb = decode_rgb(image_bytes)?;
        let mut sums = [0f64; 3];
        for pixel in rgb.pixels() {
            for (sum, channel) in sums.iter_mut().zip(pixel.0) {
                *sum += f64::from(channel);
            }
        }
        let count = f64::from(rgb.width() * rgb.height()) * 255.0;
        let mean: Vec<f32> = sums.iter().map(|s| (s / count) as f32).collect();
        Ok(UnitVector::normalize(mean)?)
    }
}

pub fn png(r: u8, g: u8, b: u8) -> Vec<u8> {
    let img = RgbImage::from_pixel(8, 8, Rgb([r, g, b]));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

pub fn upload(r: u8, g: u8, b: u8) -> ImageUpload {
    ImageUpload::new(png(r, g, b), Some("image/png"))
}

pub fn draft(name: &str, price: &str) -> NewProduct {
    let price = image_catalog_search::domain::product::parse_price(price).unwrap();
    NewProduct::new(name, None, price).unwrap()
}

pub fn blob_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

/// Blob store whose deletes can be made to fail with an I/O error.
pub struct FlakyBlobStore {
    inner: FsBlobStore,
    pub fail_deletes: AtomicBool,
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    async fn put(&self, bytes: Bytes, extension: Option<&str>) -> Result<String, BlobError> {
        self.inner.put(bytes, extension).await
    }

    async fn get(&self, blob_ref: &str) -> Result<Bytes, BlobError> {
        self.inner.get(blob_ref).await
    }

    async fn delete(&self, blob_ref: &str) -> Result<(), BlobError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BlobError::Io(std::io::Error::other("disk unavailable")));
        }
        self.inner.delete(blob_ref).await
    }
}

/// Product store whose writes can be made to fail.
#[derive(Default)]
pub struct FlakyProductStore {
    inner: InMemoryProductStore,
    pub fail_writes: AtomicBool,
    /// Image committed right before the next delete, as a concurrent update would.
    pub image_before_delete: Mutex<Option<StoredImage>>,
}

impl FlakyProductStore {
    fn check(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("database unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl ProductStore for FlakyProductStore {
    async fn insert(&self, draft: NewProduct, image: Option<StoredImage>) -> Result<Product> {
        self.check()?;
        self.inner.insert(draft, image).await
    }

    async fn get(&self, id: i32) -> Result<Option<Product>> {
        self.inner.get(id).await
    }

    async fn list(&self) -> Result<Vec<Product>> {
        self.inner.list().await
    }

    async fn update(
        &self,
        id: i32,
        patch: &ProductPatch,
        image: Option<StoredImage>,
    ) -> Result<Option<UpdateOutcome>> {
        self.check()?;
        self.inner.update(id, patch, image).await
    }

    async fn delete(&self, id: i32) -> Result<Option<Product>> {
        self.check()?;
        let racing = self.image_before_delete.lock().unwrap().take();
        if let Some(image) = racing {
            self.inner
                .update(id, &ProductPatch::default(), Some(image))
                .await?;
        }
        self.inner.delete(id).await
    }

    async fn embedded_candidates(&self) -> Result<Vec<Candidate>> {
        self.inner.embedded_candidates().await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}

pub struct TestCatalog {
    pub service: Arc<CatalogService>,
    pub store: Arc<FlakyProductStore>,
    pub blobs: Arc<FlakyBlobStore>,
    pub encoder: Arc<MeanColorEncoder>,
    pub dir: TempDir,
}

impl TestCatalog {
    pub async fn new() -> Self {
        Self::with_search_limit(5).await
    }

    pub async fn with_search_limit(limit: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FlakyProductStore::default());
        let blobs = Arc::new(FlakyBlobStore {
            inner: FsBlobStore::open(dir.path()).await.unwrap(),
            fail_deletes: AtomicBool::new(false),
        });
        let encoder = Arc::new(MeanColorEncoder::default());
        let service = CatalogService::new(store.clone(), blobs.clone(), encoder.clone())
            .with_search_limit(limit);
        Self {
            service: Arc::new(service),
            store,
            blobs,
            encoder,
            dir,
        }
    }

    pub fn blob_count(&self) -> usize {
        blob_count(self.dir.path())
    }

    pub fn blob_exists(&self, blob_ref: &str) -> bool {
        self.dir.path().join(blob_ref).exists()
    }
}
