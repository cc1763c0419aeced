use crate::transport::http::handlers::common::{catalog_failure, ok, read_upload_form};
use crate::transport::http::types::{ApiResponse, AppState, ImageForm};
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[utoipa::path(
    post,
    path = "/embed",
    request_body(content = ImageForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Unit-length image embedding", body = ApiResponse),
        (status = 400, description = "Missing or undecodable image", body = ApiResponse),
        (status = 413, description = "Upload too large", body = ApiResponse),
        (status = 415, description = "Not an image/* upload", body = ApiResponse),
        (status = 422, description = "Degenerate embedding", body = ApiResponse),
        (status = 503, description = "Encoder model unavailable", body = ApiResponse)
    )
)]
pub async fn embed_handler(
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

    match state.catalog.embed(image).await {
        Ok(embedding) => ok(StatusCode::OK, embedding),
        Err(e) => catalog_failure(e),
    }
}
