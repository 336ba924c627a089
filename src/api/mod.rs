//! API Module
//!
//! Diagnostics surface over the resilience components.
//!
//! # Endpoints
//! - `GET /health` - Health check
//! - `GET /stats` - Per-namespace cache statistics and invalidation status
//! - `GET /status` - Invalidation status
//! - `POST /invalidate/:content_type` - Invalidate one content type
//! - `POST /clear` - Clear every cache layer
//! - `PUT /version` - Record a new application version
//! - `GET /rate-limit/:identifier` - Rate limit status of a caller
//! - `GET /performance` - Current query performance report
//! - `GET /memory` - Leak assessment and tracked resources

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use middleware::{client_identifier, rate_limit_middleware};
pub use routes::create_router;
