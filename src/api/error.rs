//! Errors from the lead-routing API.

use thiserror::Error;

/// A failed call to the routing service. Carries a message, no codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("cannot connect to routing API at {url}")]
    Connect { url: String },

    #[error("failed to send request: {0}")]
    Request(String),

    #[error("routing API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse routing API response: {0}")]
    Decode(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl ApiError {
    /// Classify a transport error the way the CLI reports it.
    pub fn from_transport(err: reqwest::Error, base_url: &str, timeout_seconds: u64) -> Self {
        if err.is_timeout() {
            ApiError::Timeout {
                seconds: timeout_seconds,
            }
        } else if err.is_connect() {
            ApiError::Connect {
                url: base_url.to_string(),
            }
        } else {
            ApiError::Request(err.to_string())
        }
    }
}
