// src/bin/api_server.rs

use image_catalog_search::infra::encoder::ImageEncoder;
use image_catalog_search::infra::telemetry;
use image_catalog_search::transport;
use image_catalog_search::{AppConfig, CatalogService, ClipEncoder, FsBlobStore, PgProductStore};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    telemetry::init();

    let config = AppConfig::from_env()?;

    // --- Encoder Initialization (fatal if the model cannot be loaded) ---
    tracing::info!(
        model = %config.encoder.model_id,
        path = %config.encoder.model_path.display(),
        "initializing image encoder"
    );
    let encoder = Arc::new(ClipEncoder::new(config.encoder.clone()));
    {
        let encoder = encoder.clone();
        tokio::task::spawn_blocking(move || encoder.warm_up()).await??;
    }

    // --- Storage Initialization ---
    tracing::info!(max_connections = config.database.max_connections, "connecting to PostgreSQL");
    let store = PgProductStore::connect(&config.database).await?;
    let blobs = FsBlobStore::open(&config.upload_dir).await?;
    tracing::info!(upload_dir = %config.upload_dir.display(), "blob store ready");

    let catalog = CatalogService::new(Arc::new(store), Arc::new(blobs), encoder)
        .with_search_limit(config.search_limit);
    let app_state = transport::http::AppState {
        catalog: Arc::new(catalog),
        max_upload_bytes: config.max_upload_bytes,
    };

    // --- API Server Initialization ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = transport::http::create_router(app_state)
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "API server listening");
    tracing::info!("Swagger UI available at /swagger-ui");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received, stopping API server");
        }
    }

    Ok(())
}
