// src/error.rs

//! Unified error handling for the publisher.

use std::fmt;

use thiserror::Error;

/// Result type alias for publisher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Error type user-supplied predicates and formatters may return.
pub type PolicyError = Box<dyn std::error::Error + Send + Sync>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration value failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// A user-supplied predicate or formatter failed
    #[error("Publish policy error: {0}")]
    Policy(String),

    /// Transport failed before an HTTP response was received
    #[error("Transport error: {0}")]
    Transport(String),

    /// A single send attempt exceeded its time budget
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Delivery was cancelled by the caller
    #[error("Delivery cancelled")]
    Cancelled,

    /// The Bot API answered with a non-success status
    #[error("Delivery failed with status {status}: {reason}")]
    Delivery { status: u16, reason: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a policy error from whatever the user function produced.
    pub fn policy(message: impl fmt::Display) -> Self {
        Self::Policy(message.to_string())
    }

    /// Create a transport error.
    pub fn transport(message: impl fmt::Display) -> Self {
        Self::Transport(message.to_string())
    }

    /// Whether this error came from the embedding application's own logic.
    pub fn is_policy(&self) -> bool {
        matches!(self, Self::Policy(_))
    }
}
