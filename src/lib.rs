pub mod app;
pub mod domain;
pub mod infra;
pub mod storage;
pub mod transport {
    pub mod http;
}

// Convenience re-exports (keeps call-sites clean)
pub use app::{CatalogError, CatalogService};
pub use domain::{rank, Candidate, Product, SearchHit, UnitVector};
pub use infra::config::AppConfig;
pub use infra::encoder::{ClipConfig, ClipEncoder, ImageEncoder};
pub use storage::{FsBlobStore, InMemoryProductStore, PgProductStore};
