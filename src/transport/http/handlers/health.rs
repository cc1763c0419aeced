use crate::transport::http::handlers::common::ok;
use crate::transport::http::types::{ApiResponse, AppState, CurrentDateTime, HealthStatus};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{SecondsFormat, Utc};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy (DB reachable, encoder loaded)", body = ApiResponse),
        (status = 503, description = "Service is unhealthy", body = ApiResponse)
    )
)]
pub async fn healthcheck_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db = state.catalog.store().ping().await;
    let encoder = state.catalog.encoder();

    let status = HealthStatus {
        status: if db.is_ok() && encoder.is_ready() {
            "ok".to_string()
        } else {
            "unhealthy".to_string()
        },
        database: db.is_ok(),
        encoder_ready: encoder.is_ready(),
        model: encoder.model_id().to_string(),
    };
    let data = serde_json::to_value(&status).ok();

    match db {
        Ok(()) if status.encoder_ready => (
            StatusCode::OK,
            Json(ApiResponse {
                success: true,
                data,
                error: None,
            }),
        ),
        Ok(()) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                success: false,
                data,
                error: Some("Encoder model is not loaded".to_string()),
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                success: false,
                data,
                error: Some(format!("DB ping failed: {}", e)),
            }),
        ),
    }
}

#[utoipa::path(
    get,
    path = "/datetime",
    responses(
        (status = 200, description = "Current UTC time", body = ApiResponse)
    )
)]
pub async fn datetime_handler() -> impl IntoResponse {
    ok(
        StatusCode::OK,
        CurrentDateTime {
            datetime: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        },
    )
}
