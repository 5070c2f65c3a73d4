//! Error types for the HTTP API
//!
//! Every failure is reported the same way: status 500 with
//! `{"success": false, "error": "..."}`. Never a backtrace.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body could not be read as a catalog
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Store, config or serialization failure
    #[error(transparent)]
    Common(#[from] kbase_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
