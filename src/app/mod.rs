pub mod catalog_service;
pub mod error;

pub use catalog_service::{CatalogService, ImageEmbedding, ProductImage};
pub use error::CatalogError;
