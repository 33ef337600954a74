//! Config snapshot endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use engram_core::store::ConfigSnapshot;

use super::{ApiError, AppState, store_error};

/// `GET /config` — the seeded config pairs flattened into one JSON object,
/// plus the computed `size` (current number of stored embeddings).
pub async fn get_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConfigSnapshot>, (StatusCode, Json<ApiError>)> {
    let snapshot = state.store.config_snapshot().map_err(store_error)?;
    Ok(Json(snapshot))
}
