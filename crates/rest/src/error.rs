//! Error types for the booking REST API.
//!
//! Handlers never see database errors: the executor answers every statement.
//! What remains are request problems and lookups that came back empty, both
//! rendered as small JSON bodies.
//!
//! | Variant | HTTP Status | Body |
//! |---------|-------------|------|
//! | NotFound | 404 | `{"message": ...}` |
//! | Missing | 404 | `{"error": ...}` |
//! | RouteNotFound | 404 | `{"message": "请求的资源不存在"}` |
//! | BadRequest | 400 | `{"message": ...}` |
//! | InternalError | 500 | `{"message": "服务器内部错误", "error": ...}` |

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Message of the 404 returned for unknown routes.
pub const ROUTE_NOT_FOUND_MESSAGE: &str = "请求的资源不存在";

/// Message of every 500 response.
pub const INTERNAL_ERROR_MESSAGE: &str = "服务器内部错误";

/// The error type returned by request handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestError {
    /// A lookup by key found nothing (HTTP 404).
    NotFound { message: String },

    /// A lookup found nothing, reported under an `error` key (HTTP 404).
    Missing { error: String },

    /// No route matched the request (HTTP 404).
    RouteNotFound,

    /// A required field was absent or invalid (HTTP 400).
    BadRequest { message: String },

    /// Internal server error (HTTP 500).
    InternalError { message: String },
}

impl RestError {
    pub fn not_found(message: impl Into<String>) -> Self {
        RestError::NotFound {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        RestError::BadRequest {
            message: message.into(),
        }
    }

    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::NotFound { .. } | RestError::Missing { .. } | RestError::RouteNotFound => {
                StatusCode::NOT_FOUND
            }
            RestError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            RestError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestError::NotFound { message } => write!(f, "Not found: {}", message),
            RestError::Missing { error } => write!(f, "Not found: {}", error),
            RestError::RouteNotFound => write!(f, "No route matched the request"),
            RestError::BadRequest { message } => write!(f, "Bad request: {}", message),
            RestError::InternalError { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for RestError {}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            RestError::NotFound { message } | RestError::BadRequest { message } => {
                json!({ "message": message })
            }
            RestError::Missing { error } => json!({ "error": error }),
            RestError::RouteNotFound => json!({ "message": ROUTE_NOT_FOUND_MESSAGE }),
            RestError::InternalError { message } => {
                json!({ "message": INTERNAL_ERROR_MESSAGE, "error": message })
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for REST handlers.
pub type RestResult<T> = Result<T, RestError>;
