//! HTTP handlers.
//!
//! Handlers only translate: query strings into core calls, core results into
//! JSON. Store work is blocking, so it runs on the blocking pool.

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use signal_lab_core::rectangle::{DEFAULT_LENGTH, DEFAULT_WIDTH};
use signal_lab_core::scenario::{self, SyncReport, ThreadReport, TransactionReport};
use signal_lab_core::{Database, ExecutionContext, Rectangle, RectangleReport, StoreError};
use std::sync::Arc;
use tracing::debug;

use super::AppState;
use super::error::ApiError;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Raw query pairs. Values stay strings so validation happens in one place,
/// and a repeated key keeps its last value.
pub type QueryPairs = Vec<(String, String)>;

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /test-rectangle/
pub async fn test_rectangle(
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> HandlerResult<RectangleReport> {
    let Query(pairs) = query?;
    let length = last_value(&pairs, "length")
        .map_or_else(|| DEFAULT_LENGTH.to_string(), str::to_string);
    let width =
        last_value(&pairs, "width").map_or_else(|| DEFAULT_WIDTH.to_string(), str::to_string);

    let rectangle = Rectangle::parse(&length, &width)?;
    Ok(Json(build_report(&rectangle)))
}

/// POST /test-rectangle/
///
/// Body: `{"length": 7, "width": 3}`. Missing keys take the defaults.
pub async fn test_rectangle_json(
    body: Result<Json<Value>, JsonRejection>,
) -> HandlerResult<RectangleReport> {
    let Json(body) = body?;
    let Value::Object(fields) = body else {
        return Err(ApiError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    };
    let length = fields
        .get("length")
        .cloned()
        .unwrap_or_else(|| Value::from(DEFAULT_LENGTH));
    let width = fields
        .get("width")
        .cloned()
        .unwrap_or_else(|| Value::from(DEFAULT_WIDTH));

    let rectangle = Rectangle::from_json(&length, &width)?;
    Ok(Json(build_report(&rectangle)))
}

fn build_report(rectangle: &Rectangle) -> RectangleReport {
    debug!(
        length = rectangle.length(),
        width = rectangle.width(),
        "rectangle built"
    );
    rectangle.report()
}

fn last_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// GET /test-sync/
pub async fn test_sync(State(state): State<AppState>) -> HandlerResult<SyncReport> {
    let report = run_blocking(&state, |db| {
        scenario::sync_signal(db, &ExecutionContext::primary())
    })
    .await?;
    Ok(Json(report))
}

/// GET /test-thread/
pub async fn test_thread(State(state): State<AppState>) -> HandlerResult<ThreadReport> {
    let report = run_blocking(&state, |db| {
        scenario::thread_signal(db, &ExecutionContext::primary())
    })
    .await?;
    Ok(Json(report))
}

/// GET /test-transaction/
pub async fn test_transaction(State(state): State<AppState>) -> HandlerResult<TransactionReport> {
    let report = run_blocking(&state, |db| {
        scenario::transaction_signal(db, &ExecutionContext::primary())
    })
    .await?;
    Ok(Json(report))
}

/// Run `job` against the store on the blocking pool.
///
/// The pool thread becomes the request's primary context.
async fn run_blocking<T, F>(state: &AppState, job: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let db = Arc::clone(&state.db);
    let result = tokio::task::spawn_blocking(move || job(&db)).await?;
    Ok(result?)
}
