use crate::domain::product::{parse_price, NewProduct, Patch, ProductPatch};
use crate::transport::http::handlers::common::{
    catalog_failure, failure, ok, read_upload_form, UploadForm,
};
use crate::transport::http::types::{
    ApiResponse, AppState, CreateProductForm, DeletedProduct, UpdateProductForm,
};
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

fn product_id(path: Result<Path<i32>, PathRejection>) -> Result<i32, Response> {
    path.map(|Path(id)| id).map_err(|e| {
        failure(
            StatusCode::BAD_REQUEST,
            format!("Invalid product id: {}", e.body_text()),
        )
    })
}

fn bad_request(message: String) -> Response {
    failure(StatusCode::BAD_REQUEST, message)
}

fn new_product_from(form: &UploadForm) -> Result<NewProduct, Response> {
    let name = form
        .text("name")
        .ok_or_else(|| bad_request("Missing 'name' field".to_string()))?;
    let price = form
        .text("price")
        .ok_or_else(|| bad_request("Missing 'price' field".to_string()))
        .and_then(|raw| parse_price(raw).map_err(bad_request))?;
    NewProduct::new(name, form.text("description"), price).map_err(bad_request)
}

fn patch_from(form: &UploadForm) -> Result<ProductPatch, Response> {
    let mut patch = ProductPatch::default();
    if let Some(name) = form.text("name") {
        patch.name = Patch::Set(name.to_string());
    }
    if let Some(description) = form.text("description") {
        patch.description = Patch::Set(Some(description.to_string()));
    }
    if let Some(raw) = form.text("price") {
        patch.price = Patch::Set(parse_price(raw).map_err(bad_request)?);
    }
    patch.validated().map_err(bad_request)
}

#[utoipa::path(
    post,
    path = "/products",
    request_body(content = CreateProductForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Product created with its image embedding", body = ApiResponse),
        (status = 400, description = "Invalid fields or image", body = ApiResponse),
        (status = 413, description = "Upload too large", body = ApiResponse),
        (status = 415, description = "Not an image/* upload", body = ApiResponse),
        (status = 422, description = "Degenerate embedding", body = ApiResponse),
        (status = 500, description = "Internal server error", body = ApiResponse)
    )
)]
pub async fn create_product_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let mut form = match read_upload_form(multipart).await {
        Ok(form) => form,
        Err(resp) => return resp,
    };
    let draft = match new_product_from(&form) {
        Ok(draft) => draft,
        Err(resp) => return resp,
    };

    match state.catalog.create(draft, form.image.take()).await {
        Ok(product) => ok(StatusCode::CREATED, product),
        Err(e) => catalog_failure(e),
    }
}

#[utoipa::path(
    get,
    path = "/products",
    responses(
        (status = 200, description = "All products ordered by id", body = ApiResponse),
        (status = 500, description = "Internal server error", body = ApiResponse)
    )
)]
pub async fn list_products_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.catalog.list().await {
        Ok(products) => ok(StatusCode::OK, products),
        Err(e) => catalog_failure(e),
    }
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    params(
        ("id" = i32, Path, description = "Product id")
    ),
    responses(
        (status = 200, description = "Product", body = ApiResponse),
        (status = 404, description = "No such product", body = ApiResponse)
    )
)]
pub async fn get_product_handler(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> impl IntoResponse {
    let id = match product_id(path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.catalog.get(id).await {
        Ok(product) => ok(StatusCode::OK, product),
        Err(e) => catalog_failure(e),
    }
}

#[utoipa::path(
    patch,
    path = "/products/{id}",
    params(
        ("id" = i32, Path, description = "Product id")
    ),
    request_body(content = UpdateProductForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Updated product", body = ApiResponse),
        (status = 400, description = "Invalid fields or image", body = ApiResponse),
        (status = 404, description = "No such product", body = ApiResponse),
        (status = 415, description = "Not an image/* upload", body = ApiResponse),
        (status = 422, description = "Degenerate embedding", body = ApiResponse),
        (status = 500, description = "Internal server error", body = ApiResponse)
    )
)]
pub async fn update_product_handler(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let id = match product_id(path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let mut form = match read_upload_form(multipart).await {
        Ok(form) => form,
        Err(resp) => return resp,
    };
    let patch = match patch_from(&form) {
        Ok(patch) => patch,
        Err(resp) => return resp,
    };

    match state.catalog.update(id, patch, form.image.take()).await {
        Ok(product) => ok(StatusCode::OK, product),
        Err(e) => catalog_failure(e),
    }
}

#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(
        ("id" = i32, Path, description = "Product id")
    ),
    responses(
        (status = 200, description = "Product and its image removed", body = ApiResponse),
        (status = 404, description = "No such product", body = ApiResponse),
        (status = 500, description = "Image could not be removed; product kept", body = ApiResponse)
    )
)]
pub async fn delete_product_handler(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> impl IntoResponse {
    let id = match product_id(path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.catalog.delete(id).await {
        Ok(()) => ok(StatusCode::OK, DeletedProduct { id, deleted: true }),
        Err(e) => catalog_failure(e),
    }
}

#[utoipa::path(
    get,
    path = "/products/{id}/image",
    params(
        ("id" = i32, Path, description = "Product id")
    ),
    responses(
        (status = 200, description = "Raw image bytes with a sniffed image/* content type"),
        (status = 404, description = "No such product or image", body = ApiResponse)
    )
)]
pub async fn product_image_handler(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> impl IntoResponse {
    let id = match product_id(path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.catalog.image(id).await {
        Ok(image) => ([(header::CONTENT_TYPE, image.content_type)], image.bytes).into_response(),
        Err(e) => catalog_failure(e),
    }
}
