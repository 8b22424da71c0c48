//! HTTP API for Signal Lab.
//!
//! ```text
//! GET /health               liveness + version
//! GET /test-rectangle/      ?length=&width=  (defaults 10 and 5)
//! POST /test-rectangle/     {"length": N, "width": M}, same defaults
//! GET /test-sync/           post_save on the request's own context
//! GET /test-thread/         post_save from two spawned threads
//! GET /test-transaction/    post_save inside a rolled-back transaction
//! ```
//!
//! Every route also answers without its trailing slash.

pub mod error;
pub mod handlers;

use axum::{Router, routing::get};
use signal_lab_core::Database;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::{ApiError, ErrorBody};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

impl AppState {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

/// Build the router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/test-rectangle/",
            get(handlers::test_rectangle).post(handlers::test_rectangle_json),
        )
        .route(
            "/test-rectangle",
            get(handlers::test_rectangle).post(handlers::test_rectangle_json),
        )
        .route("/test-sync/", get(handlers::test_sync))
        .route("/test-sync", get(handlers::test_sync))
        .route("/test-thread/", get(handlers::test_thread))
        .route("/test-thread", get(handlers::test_thread))
        .route("/test-transaction/", get(handlers::test_transaction))
        .route("/test-transaction", get(handlers::test_transaction))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
