//! API Routes
//!
//! Configures the Axum router with every diagnostics endpoint.

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, health_handler, invalidate_handler, memory_handler, performance_handler,
    rate_limit_handler, stats_handler, status_handler, version_handler, AppState,
};
use super::middleware::rate_limit_middleware;

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - Rate limiting: every request is admitted through the shared limiter
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/status", get(status_handler))
        .route("/invalidate/:content_type", post(invalidate_handler))
        .route("/clear", post(clear_handler))
        .route("/version", put(version_handler))
        .route("/rate-limit/:identifier", get(rate_limit_handler))
        .route("/performance", get(performance_handler))
        .route("/memory", get(memory_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
