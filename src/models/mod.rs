//! Request and Response models for the diagnostics API
//!
//! DTOs serialized to and from the HTTP bodies of the diagnostics surface.

pub mod requests;
pub mod responses;

pub use requests::VersionRequest;
pub use responses::{
    HealthResponse, MemoryResponse, NamespaceStats, RateLimitResponse, StatsResponse,
};
