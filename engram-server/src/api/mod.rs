//! HTTP API layer for engram.
//!
//! The boundary is deliberately thin: handlers validate request shape,
//! translate core errors into status codes, and otherwise delegate to the
//! store and the searcher. Authorization and CORS live here, never in the
//! core.

mod auth;
mod config;
mod data;
mod search;

use std::sync::Arc;

use axum::http::{Method, StatusCode, header};
use axum::routing::{get, post, put};
use axum::{Json, Router, middleware};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use engram_core::search::SimilaritySearch;
use engram_core::store::{EmbeddingStore, StoreError};

// Re-export handler functions for router setup.
pub use auth::{auth_middleware, hash_token};
pub use config::get_config;
pub use data::put_data;
pub use search::post_search;

/// Shared application state, constructed once in `main` and passed to every
/// handler. The store is the only shared mutable resource.
pub struct AppState {
    pub store: Arc<dyn EmbeddingStore>,
    pub searcher: SimilaritySearch,
    /// Expected bearer token hash (`sha256:<hex>`). `None` disables auth.
    pub token_hash: Option<String>,
}

/// Structured API error response.
#[derive(Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

// ── Error helpers ───────────────────────────────────────────────────────

pub(crate) fn bad_request(code: &str, message: String) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            code: code.into(),
            message,
        }),
    )
}

pub(crate) fn internal_error(message: String) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError {
            code: "internal_error".into(),
            message,
        }),
    )
}

/// Translate a core store error into an HTTP response: invalid input is the
/// client's fault, anything storage-side is ours.
pub(crate) fn store_error(err: StoreError) -> (StatusCode, Json<ApiError>) {
    match err {
        StoreError::InvalidVector(msg) => bad_request("invalid_embedding", msg),
        StoreError::Storage(msg) => internal_error(msg),
    }
}

// ── Request parsing ─────────────────────────────────────────────────────

/// Extract the `embedding` field as a vector of finite numbers.
///
/// Callers send embeddings as JSON number arrays; anything else is rejected
/// here before the core ever sees it.
pub(crate) fn parse_embedding(
    body: &serde_json::Value,
) -> Result<Vec<f32>, (StatusCode, Json<ApiError>)> {
    let field = body
        .get("embedding")
        .ok_or_else(|| bad_request("invalid_request", "missing required field: embedding".into()))?;

    let items = field.as_array().ok_or_else(|| {
        bad_request(
            "invalid_embedding",
            "embedding must be an array of numbers".into(),
        )
    })?;

    let mut embedding = Vec::with_capacity(items.len());
    for item in items {
        let value = item.as_f64().ok_or_else(|| {
            bad_request(
                "invalid_embedding",
                "embedding must be an array of numbers".into(),
            )
        })?;
        embedding.push(value as f32);
    }
    Ok(embedding)
}

// ── Health endpoint ─────────────────────────────────────────────────────

/// `GET /health` — liveness check, exempt from auth.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ── Router assembly ─────────────────────────────────────────────────────

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Build the full application router: authenticated API routes, the open
/// health check, and the CORS layer (which also answers preflight before
/// auth runs).
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/config", get(get_config))
        .route("/data", put(put_data))
        .route("/search", post(post_search))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(cors_layer())
        .with_state(state)
}
