//! Catalog domain: products, embeddings and similarity ranking.

pub mod embedding;
pub mod product;
pub mod search;

pub use embedding::{cosine_similarity, DegenerateEmbedding, UnitVector};
pub use product::{ImageUpload, NewProduct, Patch, Product, ProductPatch};
pub use search::{rank, Candidate, RankError, SearchHit, DEFAULT_SEARCH_LIMIT};
