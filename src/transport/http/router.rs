use crate::app::ImageEmbedding;
use crate::domain::product::Product;
use crate::domain::search::SearchHit;
use crate::transport::http::handlers::{embed, health, products, search};
use crate::transport::http::types::{
    ApiResponse, AppState, CreateProductForm, CurrentDateTime, DeletedProduct, HealthStatus,
    ImageForm, UpdateProductForm,
};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Allowance for multipart boundaries and text fields on top of the image itself.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        health::datetime_handler,
        embed::embed_handler,
        products::create_product_handler,
        products::list_products_handler,
        products::get_product_handler,
        products::update_product_handler,
        products::delete_product_handler,
        products::product_image_handler,
        search::search_handler
    ),
    components(schemas(
        ApiResponse,
        HealthStatus,
        CurrentDateTime,
        ImageForm,
        CreateProductForm,
        UpdateProductForm,
        DeletedProduct,
        Product,
        SearchHit,
        ImageEmbedding
    ))
)]
pub struct ApiDoc;

pub fn create_router(app_state: AppState) -> Router {
    let body_limit = app_state.max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route("/datetime", get(health::datetime_handler))
        .route("/embed", post(embed::embed_handler))
        .route(
            "/products",
            post(products::create_product_handler).get(products::list_products_handler),
        )
        .route("/products/search", post(search::search_handler))
        .route(
            "/products/:id",
            get(products::get_product_handler)
                .patch(products::update_product_handler)
                .delete(products::delete_product_handler),
        )
        .route("/products/:id/image", get(products::product_image_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state)
}
