//! Embedding ingest endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use super::{ApiError, AppState, bad_request, parse_embedding, store_error};

/// `PUT /data` — store an embedding together with its opaque payload.
///
/// The new record's id stays internal; callers only get a success
/// acknowledgment.
pub async fn put_data(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, Json<ApiError>)> {
    let embedding = parse_embedding(&body)?;

    let payload = body
        .get("payload")
        .ok_or_else(|| bad_request("invalid_request", "missing required field: payload".into()))?
        .as_str()
        .ok_or_else(|| bad_request("invalid_payload", "payload must be a string".into()))?;

    state
        .store
        .store(&embedding, payload)
        .map_err(store_error)?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "status": "success" })),
    ))
}
