//! Request DTOs for the diagnostics API

use serde::Deserialize;

/// Maximum accepted length of an application version label
pub const MAX_VERSION_LENGTH: usize = 64;

/// Request body for PUT /version
#[derive(Debug, Clone, Deserialize)]
pub struct VersionRequest {
    /// New application version; a change clears every cache
    pub version: String,
}

impl VersionRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        let version = self.version.trim();
        if version.is_empty() {
            return Some("Version cannot be empty".to_string());
        }
        if version.len() > MAX_VERSION_LENGTH {
            return Some(format!(
                "Version exceeds maximum length of {} characters",
                MAX_VERSION_LENGTH
            ));
        }
        None
    }
}
