use crate::config::ApiConfig;
use crate::s3_store::ImportStore;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use commerce_core::ApiError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ImportStore>,
    pub uploaded_prefix: String,
    pub url_expiry: Duration,
}

/// Query parameters for the import endpoint.
#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
}

/// Presigned upload URL response.
#[derive(Debug, Serialize)]
pub struct ImportUrlResponse {
    pub url: String,
}

/// Create the API router.
pub fn create_router(state: AppState, config: &ApiConfig) -> Router {
    let cors = if config.cors_enabled {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/import", get(import_products_file))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "import-service"
    }))
}

/// `GET /import?fileName=<name>.csv` — issue a presigned upload URL.
///
/// The URL is write-scoped to `uploaded/<fileName>` with content type fixed to
/// `text/csv`. Nothing is written to the bucket here; the object only exists
/// once the client performs the upload.
#[instrument(skip(state))]
async fn import_products_file(
    State(state): State<AppState>,
    Query(params): Query<ImportQuery>,
) -> Result<Json<ImportUrlResponse>, ApiError> {
    let file_name = params
        .file_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing required parameter: fileName"))?;

    if state.store.bucket().is_empty() {
        error!("Import bucket is not configured");
        return Err(ApiError::configuration());
    }

    validate_csv_extension(&file_name)?;

    let key = upload_key(&state.uploaded_prefix, &file_name);

    let url = state
        .store
        .presign_put(&key, "text/csv", state.url_expiry)
        .await
        .map_err(|e| {
            error!(error = %e, key = %key, "Failed to generate presigned URL");
            ApiError::internal_with("Failed to generate upload URL")
        })?;

    info!(key = %key, "Issued presigned upload URL");

    Ok(Json(ImportUrlResponse { url }))
}

/// Only CSV uploads are accepted; the check is case-insensitive.
fn validate_csv_extension(file_name: &str) -> Result<(), ApiError> {
    if file_name.to_lowercase().ends_with(".csv") {
        Ok(())
    } else {
        Err(ApiError::bad_request(
            "Invalid file type. Only CSV files are allowed",
        ))
    }
}

fn upload_key(prefix: &str, file_name: &str) -> String {
    format!("{prefix}{file_name}")
}
