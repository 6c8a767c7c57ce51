//! Error handling module for the Kard backend.
//!
//! Store operations return [`StoreError`]; handlers convert those into [`AppError`],
//! which owns the mapping to HTTP status codes and the error envelope.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const TOO_MANY_REQUESTS: &str = "TOO_MANY_REQUESTS";
    pub const SERVICE_UNAVAILABLE: &str = "SERVICE_UNAVAILABLE";
    pub const UPSTREAM_ERROR: &str = "UPSTREAM_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Typed failure raised by the in-memory stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Required input missing or malformed
    Validation(String),
    /// Referenced deck or flashcard absent
    NotFound(String),
    /// The store itself is unusable
    Internal(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Validation(msg) => write!(f, "validation failed: {}", msg),
            StoreError::NotFound(msg) => write!(f, "not found: {}", msg),
            StoreError::Internal(msg) => write!(f, "internal store failure: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Missing or malformed required field
    Validation(String),
    /// Request could not be interpreted at all
    BadRequest(String),
    /// Resource not found
    NotFound(String),
    /// Caller exceeded a request ceiling
    TooManyRequests {
        message: String,
        retry_after_secs: u64,
    },
    /// A required backend is not configured
    Unavailable(String),
    /// The generation backend failed
    Upstream(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::TooManyRequests { .. } => codes::TOO_MANY_REQUESTS,
            AppError::Unavailable(_) => codes::SERVICE_UNAVAILABLE,
            AppError::Upstream(_) => codes::UPSTREAM_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the message that is safe to show to the caller.
    pub fn message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::TooManyRequests { message, .. } => message.clone(),
            AppError::Unavailable(msg) => msg.clone(),
            AppError::Upstream(_) => "Generation backend failed".to_string(),
            AppError::Internal(_) => "Internal Server Error".to_string(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Upstream(detail) | AppError::Internal(detail) => {
                write!(f, "{}: {}", self.error_code(), detail)
            }
            _ => write!(f, "{}: {}", self.error_code(), self.message()),
        }
    }
}

impl std::error::Error for AppError {}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => AppError::Validation(msg),
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected JSON body: {}", rejection.body_text());
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("Generation backend error: {:?}", err);
        AppError::Upstream(err.to_string())
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        let details = match error {
            AppError::TooManyRequests {
                retry_after_secs, ..
            } => Some(serde_json::json!({ "retryAfterSecs": retry_after_secs })),
            _ => None,
        };

        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
                details,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Internal(detail) => tracing::error!("Internal error: {}", detail),
            AppError::Upstream(detail) => tracing::warn!("Upstream error: {}", detail),
            _ => {}
        }

        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
