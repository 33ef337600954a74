//! Similarity search endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use super::{ApiError, AppState, parse_embedding, store_error};

/// Matched payloads, best first.
#[derive(Serialize)]
pub struct SearchResponse {
    pub payload: Vec<String>,
}

/// `POST /search` — rank stored payloads against the query embedding using
/// the configured threshold and result limit.
pub async fn post_search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<SearchResponse>, (StatusCode, Json<ApiError>)> {
    let embedding = parse_embedding(&body)?;

    let payload = state.searcher.search(&embedding).map_err(store_error)?;

    Ok(Json(SearchResponse { payload }))
}
