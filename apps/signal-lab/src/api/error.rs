//! HTTP error mapping.
//!
//! Every failure is rendered as `{"error": "<message>"}`. Invalid rectangle
//! dimensions and unreadable query strings or bodies are the caller's fault
//! (400); everything else is ours (500).

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use signal_lab_core::{InvalidDimension, StoreError};
use tokio::task::JoinError;
use tracing::{debug, error, warn};

/// Error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Invalid request (validation error)
    BadRequest(String),
    /// Internal server error
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest(msg) => {
                warn!(%msg, "rejected request");
                msg
            }
            Self::Internal(msg) => {
                error!(%msg, "request failed");
                msg
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<InvalidDimension> for ApiError {
    fn from(err: InvalidDimension) -> Self {
        debug!(dimension = %err.dimension(), input = err.input(), "invalid dimension");
        Self::BadRequest(err.to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(err: QueryRejection) -> Self {
        Self::BadRequest(err.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        Self::BadRequest(err.body_text())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<JoinError> for ApiError {
    fn from(err: JoinError) -> Self {
        Self::Internal(format!("blocking task failed: {err}"))
    }
}
