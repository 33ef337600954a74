//! HTTP test helpers for engram-server tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use engram_core::search::SimilaritySearch;
use engram_core::store::EmbeddingStore;
use engram_core::store::sqlite::SqliteStore;

use crate::api::{self, AppState};

/// App over a fresh in-memory store with the default search settings
/// (threshold 0.7, limit 5) and auth disabled.
pub fn test_app() -> (Arc<AppState>, Router) {
    app_with(None, 0.7, 5)
}

/// App over a fresh in-memory store with explicit auth and search settings.
pub fn app_with(
    token_hash: Option<String>,
    threshold: f32,
    limit: usize,
) -> (Arc<AppState>, Router) {
    let store: Arc<dyn EmbeddingStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
    let searcher = SimilaritySearch::new(store.clone(), threshold, limit).unwrap();
    let state = Arc::new(AppState {
        store,
        searcher,
        token_hash,
    });
    let router = api::router(state.clone());
    (state, router)
}

/// Send a request and return the status plus the JSON-decoded body
/// (`Null` when the body is empty).
pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Store one embedding through the API, asserting success.
pub async fn put_embedding(app: &Router, vector: &[f32], payload: &str) {
    let body = serde_json::json!({ "embedding": vector, "payload": payload });
    let (status, json) = send(app.clone(), "PUT", "/data", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "put failed: {json}");
    assert_eq!(json["status"], "success");
}

/// Run a search through the API and return the matched payloads.
pub async fn search_payloads(app: &Router, vector: &[f32]) -> Vec<String> {
    let body = serde_json::json!({ "embedding": vector });
    let (status, json) = send(app.clone(), "POST", "/search", None, Some(body)).await;
    assert_eq!(status, StatusCode::OK, "search failed: {json}");
    json["payload"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}
