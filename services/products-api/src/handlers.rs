use crate::config::ApiConfig;
use crate::store::{ProductStore, StoreError};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use commerce_core::{ApiError, CreateProductRequest, ItemResponse, ListResponse, Product};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, instrument};
use uuid::Uuid;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ProductStore>,
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
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", get(get_product))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "products-api"
    }))
}

/// `GET /products` — full product list with stock counts merged in.
#[instrument(skip(state))]
async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<Product>>, ApiError> {
    let products = state.store.list_products().await.map_err(|e| {
        error!(error = %e, "Failed to list products");
        ApiError::internal_with("Could not fetch products")
    })?;

    Ok(Json(ListResponse::new(products)))
}

/// `GET /products/{id}` — single product lookup.
#[instrument(skip(state))]
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse<Product>>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::bad_request("Invalid product ID format"))?;

    match state.store.get_product(id).await {
        Ok(product) => Ok(Json(ItemResponse::new(product))),
        Err(StoreError::NotFound) => Err(ApiError::not_found(format!(
            "Product with ID {id} not found"
        ))),
        Err(e) => {
            error!(error = %e, product_id = %id, "Failed to get product");
            Err(ApiError::internal_with("Could not fetch product"))
        }
    }
}

/// `POST /products` — create a product and its stock record atomically.
#[instrument(skip(state, payload))]
async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let Json(request) = payload.map_err(|rejection| match rejection {
        JsonRejection::MissingJsonContentType(_) | JsonRejection::BytesRejection(_) => {
            ApiError::bad_request("Request body is required")
        }
        _ => ApiError::bad_request("Invalid request body"),
    })?;

    validate_client_id(request.id.as_deref())?;

    match state.store.create_product(request).await {
        Ok(product) => Ok((StatusCode::CREATED, Json(product))),
        Err(StoreError::Conflict) => Err(ApiError::conflict("Product already exists")),
        Err(e) => {
            error!(error = %e, "Failed to create product");
            Err(ApiError::internal())
        }
    }
}

/// A client-supplied product ID must be a syntactically valid UUID. The
/// stored record always gets a server-generated identifier either way.
fn validate_client_id(id: Option<&str>) -> Result<(), ApiError> {
    match id {
        Some(raw) if Uuid::parse_str(raw).is_err() => {
            Err(ApiError::bad_request("Invalid product ID format"))
        }
        _ => Ok(()),
    }
}
