use crate::transport::http::handlers::common::{catalog_failure, ok, read_upload_form};
use crate::transport::http::types::{ApiResponse, AppState, ImageForm};
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Returns the stored products most similar to the uploaded image, best first.
#[utoipa::path(
    post,
    path = "/products/search",
    request_body(content = ImageForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Up to the configured number of matches", body = ApiResponse),
        (status = 400, description = "Missing or undecodable image", body = ApiResponse),
        (status = 415, description = "Not an image/* upload", body = ApiResponse),
        (status = 422, description = "Degenerate embedding", body = ApiResponse),
        (status = 500, description = "Internal server error", body = ApiResponse)
    )
)]
pub async fn search_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let mut form = match read_upload_form(multipart).await {
        Ok(form) => form,
        Err(resp) => return resp,
    };
    let image = match form.require_image() {
        Ok(image) => image,
        Err(resp) => return resp,
    };

    match state.catalog.search(image).await {
        Ok(hits) => ok(StatusCode::OK, hits),
        Err(e) => catalog_failure(e),
    }
}
