use crate::app::CatalogError;
use crate::domain::product::ImageUpload;
use crate::domain::search::RankError;
use crate::infra::encoder::EncodeError;
use crate::storage::blob::BlobError;
use crate::transport::http::types::ApiResponse;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::collections::HashMap;

/// Multipart field carrying the image file.
pub const IMAGE_FIELD: &str = "image";

pub fn ok<T: Serialize>(status: StatusCode, data: T) -> Response {
    match serde_json::to_value(data) {
        Ok(value) => (
            status,
            Json(ApiResponse {
                success: true,
                data: Some(value),
                error: None,
            }),
        )
            .into_response(),
        Err(e) => failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to serialize response: {}", e),
        ),
    }
}

pub fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }),
    )
        .into_response()
}

pub fn status_for(err: &CatalogError) -> StatusCode {
    match err {
        CatalogError::InvalidImage(_)
        | CatalogError::Validation(_)
        | CatalogError::Encode(EncodeError::InvalidImage(_)) => StatusCode::BAD_REQUEST,
        CatalogError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        CatalogError::NotFound(_) | CatalogError::Blob(BlobError::NotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        CatalogError::Encode(EncodeError::DegenerateEmbedding(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CatalogError::Encode(EncodeError::ModelUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        CatalogError::Encode(EncodeError::EncodingFailure(_))
        | CatalogError::Rank(RankError::DimensionMismatch { .. })
        | CatalogError::BlobCleanup { .. }
        | CatalogError::Blob(_)
        | CatalogError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Converts a catalog failure into the JSON envelope; server-side failures are logged.
pub fn catalog_failure(err: CatalogError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(code = err.code(), error = %err, "request failed");
    } else {
        tracing::debug!(code = err.code(), error = %err, "request rejected");
    }
    (
        status,
        Json(ApiResponse {
            success: false,
            data: Some(serde_json::json!({ "code": err.code() })),
            error: Some(err.to_string()),
        }),
    )
        .into_response()
}

/// Text fields and the optional image file of a multipart form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub image: Option<ImageUpload>,
}

impl UploadForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn require_image(&mut self) -> Result<ImageUpload, Response> {
        self.image.take().ok_or_else(|| {
            failure(
                StatusCode::BAD_REQUEST,
                format!("Missing '{}' file field", IMAGE_FIELD),
            )
        })
    }
}

/// Drains a multipart body. Size-limit violations surface as 413.
pub async fn read_upload_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadForm, Response> {
    let mut multipart = multipart.map_err(|e| {
        failure(
            e.status(),
            format!("Invalid multipart body: {} (expected: multipart/form-data)", e.body_text()),
        )
    })?;

    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_failure)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == IMAGE_FIELD {
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(multipart_failure)?;
            form.image = Some(ImageUpload {
                bytes,
                content_type,
            });
        } else {
            let value = field.text().await.map_err(multipart_failure)?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}

fn multipart_failure(e: MultipartError) -> Response {
    let status = e.status();
    let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
        format!("Upload too large: {}", e.body_text())
    } else {
        format!("Invalid multipart body: {}", e.body_text())
    };
    failure(status, message)
}
