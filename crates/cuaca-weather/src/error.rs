//! Weather pipeline error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    /// Upstream answered with a non-2xx status.
    #[error("{operation} failed: HTTP {status} from {endpoint}")]
    Upstream {
        operation: &'static str,
        status: u16,
        endpoint: String,
    },

    /// Request exceeded its deadline.
    #[error("{operation} timed out: {endpoint}")]
    Timeout {
        operation: &'static str,
        endpoint: String,
    },

    /// Connection-level failure before any status was received.
    #[error("{operation} network error: {message}")]
    Network {
        operation: &'static str,
        message: String,
    },

    /// Body was not the JSON shape expected for this operation.
    #[error("{operation} returned malformed data: {message}")]
    Parse {
        operation: &'static str,
        message: String,
    },

    /// Payload failed the minimum-shape check.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Cache backing failure. Recovered inside the cache, never returned to callers.
    #[error("Cache error: {0}")]
    Cache(String),
}

impl WeatherError {
    /// Whether this looks like a transient fault rather than a contract problem.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. } | Self::Timeout { .. } | Self::Network { .. }
        )
    }

    /// HTTP status, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}
