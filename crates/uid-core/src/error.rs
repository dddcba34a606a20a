//! Error types for the User-ID sync system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for User-ID operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the User-ID sync system
#[derive(Error, Debug)]
pub enum Error {
    /// Sticky construction error carried by a builder
    #[error("Builder error: {0}")]
    Build(#[from] BuildError),

    /// XML encoding/decoding of a User-ID message failed
    #[error("Codec error: {0}")]
    Codec(String),

    /// HTTP client or connection errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// The device answered with a non-200 HTTP status
    #[error("Device replied with HTTP status code {code}")]
    Status {
        /// HTTP status code
        code: u16,
    },

    /// The device answered, but not with `status="success"`
    #[error(
        "Device returned a non-success response (status: '{status}'){}",
        .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
    )]
    Api {
        /// Value of the response `status` attribute
        status: String,
        /// Optional PAN-OS error code
        code: Option<String>,
        /// Text of the device's `<msg>` element, if any
        message: Option<String>,
    },

    /// The response body could not be parsed
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a codec error
    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an HTTP status error
    pub fn status(code: u16) -> Self {
        Self::Status { code }
    }

    /// Create an API (non-success response) error
    pub fn api(status: impl Into<String>, code: Option<String>, message: Option<String>) -> Self {
        Self::Api {
            status: status.into(),
            code,
            message,
        }
    }

    /// Create a response decoding error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Construction failure carried by a [`crate::UidBuilder`]
///
/// Cloneable so that every branch of a builder chain can carry the same
/// error back out of finalize.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct BuildError(String);

impl BuildError {
    /// Create a new construction error
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// The error message
    pub fn message(&self) -> &str {
        &self.0
    }
}
