//! Error types for the Conveyor client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when sending a pipe to a segment endpoint
#[derive(Debug, Error)]
pub enum ClientError {
    /// Endpoint address is not an absolute http(s) URL
    #[error("Invalid endpoint address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Endpoint method is not a valid HTTP method
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Endpoint answered with a status other than 200 or 202
    #[error("{status} - {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Status text
        message: String,
    },
}

impl ClientError {
    /// Create a rejection from status code and status text
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Check if the endpoint was reached at all
    pub fn is_transport_error(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }

    /// Check if the request timed out
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestFailed(e) if e.is_timeout())
    }
}
