//! Error types for requests against the Canvas REST API.

use thiserror::Error;

/// Errors that can occur while fetching data from Canvas.
#[derive(Debug, Error, Clone)]
pub enum CanvasError {
    /// Network/HTTP request failed before a response arrived
    #[error("Network error: {message}")]
    Network { message: String },

    /// The request exceeded the configured per-request timeout
    #[error("Request timed out: {message}")]
    Timeout { message: String },

    /// Canvas answered with a non-2xx status
    #[error("{endpoint} returned status {status}")]
    Status { status: u16, endpoint: String },

    /// Response body could not be decoded into the expected payload
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// URL parsing/construction failed
    #[error("URL error: {message}")]
    Url { message: String },
}

impl CanvasError {
    /// Returns true if this error is potentially transient and worth retrying next tick.
    pub fn is_retryable(&self) -> bool {
        match self {
            CanvasError::Network { .. } | CanvasError::Timeout { .. } => true,
            CanvasError::Status { status, .. } => *status == 429 || *status >= 500,
            CanvasError::Decode { .. } | CanvasError::Url { .. } => false,
        }
    }

    /// Returns true if the request hit the per-request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CanvasError::Timeout { .. })
    }

    /// Returns true if Canvas rejected the bearer token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CanvasError::Status { status: 401, .. })
    }
}

impl From<reqwest::Error> for CanvasError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CanvasError::Timeout {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            CanvasError::Decode {
                message: err.to_string(),
            }
        } else {
            CanvasError::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for CanvasError {
    fn from(err: url::ParseError) -> Self {
        CanvasError::Url {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CanvasError {
    fn from(err: serde_json::Error) -> Self {
        CanvasError::Decode {
            message: err.to_string(),
        }
    }
}
