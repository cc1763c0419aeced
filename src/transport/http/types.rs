use crate::app::CatalogService;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    /// Largest accepted image upload, in bytes.
    pub max_upload_bytes: usize,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `multipart/form-data` body of `POST /products`.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct CreateProductForm {
    pub name: String,
    pub description: Option<String>,
    /// Non-negative decimal with at most two fractional digits.
    #[schema(example = "19.99")]
    pub price: String,
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

/// `multipart/form-data` body of `PATCH /products/{id}`. Every field is optional; an empty
/// `description` clears it.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UpdateProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(example = "24.50")]
    pub price: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
}

/// `multipart/form-data` body carrying a single `image` file.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct ImageForm {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct DeletedProduct {
    pub id: i32,
    pub deleted: bool,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct CurrentDateTime {
    /// UTC timestamp, RFC 3339.
    pub datetime: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub database: bool,
    pub encoder_ready: bool,
    pub model: String,
}
