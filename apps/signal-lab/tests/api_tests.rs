//! Integration tests for the Signal Lab HTTP API.
//!
//! Uses axum-test to drive the router without binding a socket.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};
use signal_lab::api::{AppState, ErrorBody, create_router};
use signal_lab::cli::open_database;
use signal_lab_core::Database;
use std::sync::Arc;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Server over a fresh in-memory store with the signal logger installed.
fn server() -> (TestServer, Arc<Database>) {
    let db = open_database(None).unwrap();
    let app = create_router(AppState::new(Arc::clone(&db)));
    (TestServer::new(app).unwrap(), db)
}

// =============================================================================
// RECTANGLE
// =============================================================================

#[tokio::test]
async fn test_rectangle_seven_by_three() {
    let (server, _) = server();

    let response = server
        .get("/test-rectangle/")
        .add_query_param("length", "7")
        .add_query_param("width", "3")
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!({
            "iterable_values": [{"length": 7}, {"width": 3}],
            "area": 21,
            "perimeter": 20,
        })
    );
}

#[tokio::test]
async fn test_rectangle_defaults() {
    let (server, _) = server();

    let response = server.get("/test-rectangle/").await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["iterable_values"], json!([{"length": 10}, {"width": 5}]));
    assert_eq!(body["area"], 50);
    assert_eq!(body["perimeter"], 30);
}

#[tokio::test]
async fn test_rectangle_one_default() {
    let (server, _) = server();

    let response = server
        .get("/test-rectangle")
        .add_query_param("width", "2")
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["area"], 20);
}

#[tokio::test]
async fn test_rectangle_zero_is_client_error() {
    let (server, _) = server();

    let response = server
        .get("/test-rectangle/")
        .add_query_param("length", "0")
        .add_query_param("width", "5")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<ErrorBody>();
    assert!(body.error.starts_with("Length and width must be positive integers"));
}

#[tokio::test]
async fn test_rectangle_non_integer_is_client_error() {
    let (server, _) = server();

    let response = server
        .get("/test-rectangle/")
        .add_query_param("length", "7.5")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<ErrorBody>();
    assert!(body.error.starts_with("Both length and width must be integers"));
}

#[tokio::test]
async fn test_rectangle_error_body_has_only_error_key() {
    let (server, _) = server();

    let response = server
        .get("/test-rectangle/")
        .add_query_param("width", "-3")
        .await;

    let body = response.json::<Value>();
    let keys: Vec<_> = body.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["error".to_string()]);
}

#[tokio::test]
async fn test_rectangle_integer_check_runs_on_both_sides_first() {
    let (server, _) = server();

    let response = server
        .get("/test-rectangle/")
        .add_query_param("length", "0")
        .add_query_param("width", "abc")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<ErrorBody>();
    assert!(body.error.starts_with("Both length and width must be integers"));
}

#[tokio::test]
async fn test_rectangle_repeated_parameter_keeps_last() {
    let (server, _) = server();

    let response = server
        .get("/test-rectangle/")
        .add_raw_query_param("length=7&length=3&width=2")
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["iterable_values"], json!([{"length": 3}, {"width": 2}]));
    assert_eq!(body["area"], 6);
}

#[tokio::test]
async fn test_rectangle_accepts_digit_groups() {
    let (server, _) = server();

    let response = server
        .get("/test-rectangle/")
        .add_query_param("length", "1_000")
        .add_query_param("width", "2")
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["area"], 2000);
}

#[tokio::test]
async fn test_rectangle_json_body() {
    let (server, _) = server();

    let response = server
        .post("/test-rectangle/")
        .json(&json!({"length": 7, "width": 3}))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["perimeter"], 20);

    let response = server
        .post("/test-rectangle")
        .json(&json!({"width": 2}))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["area"], 20);
}

#[tokio::test]
async fn test_rectangle_json_body_rejects_floats() {
    let (server, _) = server();

    let response = server
        .post("/test-rectangle/")
        .json(&json!({"length": 0, "width": 7.5}))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<ErrorBody>();
    assert!(body.error.starts_with("Both length and width must be integers"));
}

#[tokio::test]
async fn test_rectangle_unreadable_body_is_json_error() {
    let (server, _) = server();

    let response = server.post("/test-rectangle/").text("length=7").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(!response.json::<ErrorBody>().error.is_empty());

    let response = server.post("/test-rectangle/").json(&json!([7, 3])).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<ErrorBody>().error,
        "Request body must be a JSON object"
    );
}

// =============================================================================
// SIGNAL SCENARIOS
// =============================================================================

#[tokio::test]
async fn test_sync_signal_reports_primary_context() {
    let (server, db) = server();

    let response = server.get("/test-sync/").await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["message"], "User created, signal executed");
    assert_eq!(body["username"], "sync_user");
    assert_eq!(body["is_sync"], true);
    assert!(body["transaction_id"].is_string());
    assert!(body["execution_time"].as_f64().unwrap() >= 0.0);

    let log = db.signal_log_for_username("sync_user").unwrap();
    assert_eq!(body["thread_name"], log.thread_name.as_str());
}

#[tokio::test]
async fn test_sync_signal_twice_keeps_first_log() {
    let (server, _) = server();

    let first = server.get("/test-sync/").await.json::<Value>();
    let second = server.get("/test-sync").await.json::<Value>();

    assert_eq!(first["transaction_id"], second["transaction_id"]);
}

#[tokio::test]
async fn test_thread_signal_reports_thread_names() {
    let (server, db) = server();

    let response = server.get("/test-thread/").await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!({
            "message": "Threads executed with signals",
            "thread1_result": {
                "username": "thread_user_TestThread-1",
                "thread_name": "TestThread-1",
            },
            "thread2_result": {
                "username": "thread_user_TestThread-2",
                "thread_name": "TestThread-2",
            },
        })
    );

    let logs = db.signal_logs();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|log| !log.is_sync));
}

#[tokio::test]
async fn test_transaction_signal_rolls_back_log() {
    let (server, db) = server();

    let response = server.get("/test-transaction/").await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!({
            "message": "User created inside transaction",
            "log_exists_after_rollback": false,
        })
    );
    assert!(db.user_by_name("transaction_user").is_none());
}

#[tokio::test]
async fn test_health() {
    let (server, _) = server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
