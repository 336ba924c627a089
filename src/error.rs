//! Error types for the resilience layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Resilience Error Enum ==
/// Unified error type for the resilience layer.
///
/// Component operations themselves do not fail; this type covers the
/// injected backing stores, name parsing and the diagnostics surface.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResilienceError {
    /// Content type name not present in the trigger table
    #[error("Unknown content type: {0}")]
    UnknownContentType(String),

    /// Platform cache or local storage operation failed
    #[error("Backing store error: {0}")]
    BackingStore(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Caller exceeded its request budget
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

// == IntoResponse Implementation ==
impl IntoResponse for ResilienceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ResilienceError::UnknownContentType(_) => StatusCode::NOT_FOUND,
            ResilienceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ResilienceError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ResilienceError::BackingStore(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        let mut response = (status, body).into_response();
        if let ResilienceError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

// == Result Type Alias ==
/// Convenience Result type for the resilience layer.
pub type Result<T> = std::result::Result<T, ResilienceError>;
