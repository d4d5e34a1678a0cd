//! Error handling module for the Piwik PRO tag
//!
//! This module defines the error types used throughout the crate, providing a
//! unified error handling strategy and the HTTP response mapping used by the
//! collect endpoint.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for tag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the tag
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors for tag configuration or incoming events
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport errors while talking to the tracking endpoint
    #[error("HTTP error: {0}")]
    Http(String),

    /// The tracking endpoint did not answer within the transport budget
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Error::Validation(msg.into())
    }

    /// Create an HTTP transport error
    pub fn http<S: Into<String>>(msg: S) -> Self {
        Error::Http(msg.into())
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::Serialization(_) => StatusCode::BAD_REQUEST,
            Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Config(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Check if this error came from the outbound transport
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Timeout(_))
    }
}

/// Implement IntoResponse for automatic error responses in Axum
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "type": error_type(&self),
                "status": status.as_u16(),
            }
        }));

        match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = ?self, "Internal server error");
            },
            StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => {
                tracing::warn!(error = ?self, "Tracking endpoint unreachable");
            },
            _ => {
                tracing::info!(error = ?self, "Request error");
            },
        }

        (status, body).into_response()
    }
}

/// Get a string representation of the error type
fn error_type(error: &Error) -> &'static str {
    match error {
        Error::Config(_) => "configuration_error",
        Error::Validation(_) => "validation_error",
        Error::Serialization(_) => "serialization_error",
        Error::Io(_) => "io_error",
        Error::Http(_) => "http_error",
        Error::Timeout(_) => "timeout",
        Error::Internal(_) => "internal_error",
    }
}

/// Convert from reqwest errors, keeping timeouts distinguishable
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else {
            Error::Http(err.to_string())
        }
    }
}

/// Convert from anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

/// Convert from envconfig::Error to our Error type
impl From<envconfig::Error> for Error {
    fn from(err: envconfig::Error) -> Self {
        Error::Config(err.to_string())
    }
}
