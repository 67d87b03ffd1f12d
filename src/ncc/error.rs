//! Failure signal of the Control Center client

use thiserror::Error;

/// Any failed call to the Control Center.
///
/// Callers treat every variant the same way; the variants exist for logs.
#[derive(Error, Debug)]
pub enum NccError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Control Center answered with a non-success status
    #[error("Control Center returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Base URI could not be parsed
    #[error("Invalid Control Center URI: {0}")]
    InvalidUri(String),

    /// Response body was not valid JSON
    #[error("Failed to parse response body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    /// Response body was JSON but lacked an expected field
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

pub type Result<T> = std::result::Result<T, NccError>;
