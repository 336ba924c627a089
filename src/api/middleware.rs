//! Rate Limit Middleware
//!
//! Admits or rejects every request through the shared [`RateLimiter`].
//!
//! [`RateLimiter`]: crate::rate_limit::RateLimiter

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::handlers::AppState;
use crate::cache::current_timestamp_ms;
use crate::error::{ResilienceError, Result};

/// Identifier used when a request carries neither an API key nor a forwarded address
pub const ANONYMOUS_IDENTIFIER: &str = "anonymous";

/// Resolves the caller: `x-api-key`, else the first `x-forwarded-for` address.
pub fn client_identifier(headers: &HeaderMap) -> String {
    if let Some(api_key) = header_value(headers, "x-api-key") {
        return api_key.to_string();
    }

    header_value(headers, "x-forwarded-for")
        .and_then(|forwarded| forwarded.split(',').next())
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .unwrap_or(ANONYMOUS_IDENTIFIER)
        .to_string()
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Rejects callers over budget with 429 and a `retry-after` header.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let identifier = client_identifier(request.headers());

    if !state.rate_limiter.is_allowed(&identifier).await {
        let status = state.rate_limiter.status(&identifier).await;
        let retry_at = status.blocked_until.unwrap_or(status.reset_at);
        let retry_after_secs = retry_at
            .saturating_sub(current_timestamp_ms())
            .div_ceil(1000)
            .max(1);

        warn!(
            identifier = %identifier,
            path = %request.uri().path(),
            retry_after_secs,
            "Request rejected by rate limiter"
        );
        return Err(ResilienceError::RateLimited { retry_after_secs });
    }

    Ok(next.run(request).await)
}
