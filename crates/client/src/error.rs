//! Errors from the backend API layer.

use prodgen_core::error::CoreError;

/// A failed Resource or Job API call.
///
/// Network, status and decode failures are passed through unmodified;
/// callers decide whether to retry.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend API error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx response whose body did not match the expected shape.
    #[error("Malformed response payload: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    /// Input rejected locally before any request was sent.
    #[error(transparent)]
    Validation(#[from] CoreError),
}

impl ApiError {
    /// Transport, status and decode failures may succeed on a later
    /// attempt; local validation failures never do.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ApiError::Validation(_))
    }

    /// HTTP status code when the backend answered with an error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
