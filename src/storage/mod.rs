pub mod blob;
pub mod products;

pub use blob::{BlobError, BlobStore, FsBlobStore};
pub use products::{InMemoryProductStore, PgProductStore, ProductStore, StoredImage, UpdateOutcome};
