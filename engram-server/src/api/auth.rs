//! Bearer-token authentication middleware.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};

use super::AppState;

/// Hash a plaintext token with SHA-256 and return it in `sha256:<hex>` format.
///
/// The config file stores only the hash, so a leaked config does not leak the
/// token itself.
pub fn hash_token(plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    let result = hasher.finalize();
    format!("sha256:{}", hex::encode(result))
}

/// Axum middleware that enforces bearer-token authentication on API routes.
///
/// When no token hash is configured, auth is disabled and every request
/// passes through. The health endpoint and CORS preflight never reach this
/// middleware.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(expected_hash) = state.token_hash.as_deref() else {
        return next.run(req).await;
    };

    // Extract the Bearer token from the Authorization header.
    let provided_hash = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(hash_token);

    match provided_hash {
        Some(h) if h == expected_hash => next.run(req).await,
        _ => unauthorized_response(),
    }
}

fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": "Unauthorized" })),
    )
        .into_response()
}
