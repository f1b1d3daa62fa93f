//! Error types for georesolve
//!
//! One crate-level taxonomy; provider adapters and the orchestrator all
//! speak `GeocodeError` so callers never have to match per-provider enums.

use thiserror::Error;

/// Result type for geocoding operations
pub type Result<T, E = GeocodeError> = std::result::Result<T, E>;

/// Geocoding errors
///
/// Only `InvalidRequest` ever reaches callers of
/// [`GeocodingService::resolve`](crate::GeocodingService::resolve); the
/// other variants are absorbed by the orchestrator's synthetic fallback.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Malformed caller input (empty query, bad configuration)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Upstream throttling survived all retries
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Network, parse, or non-2xx failure
    #[error("Service error: {message}")]
    Service {
        message: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },

    /// Deadline exceeded or race abandoned
    #[error("Timed out: {0}")]
    Timeout(String),
}

impl GeocodeError {
    /// Service error with a message only
    pub fn service(message: impl Into<String>) -> Self {
        GeocodeError::Service {
            message: message.into(),
            cause: None,
        }
    }

    /// Service error wrapping an underlying cause
    pub fn service_with(
        message: impl Into<String>,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        GeocodeError::Service {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }
}
