//! Common error types for Tunesmith

use thiserror::Error;

/// Common result type for Tunesmith operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Tunesmith services
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// State conflict (e.g. concurrent edit, pipeline in flight)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Generation provider rejected the request (not retryable).
    /// The message is surfaced verbatim as a song's status message, so it
    /// must stand on its own without a prefix.
    #[error("{0}")]
    Provider(String),

    /// Generation provider transiently unavailable (retryable)
    #[error("{0}")]
    ProviderUnavailable(String),

    /// Operation exceeded its deadline
    #[error("{0}")]
    Timeout(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a retry with backoff may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::ProviderUnavailable(_))
    }
}
