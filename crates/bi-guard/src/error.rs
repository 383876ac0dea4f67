//! Error types for the BI guard pipeline

use crate::types::Rejection;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for Guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Guard error types
#[derive(Debug, Error)]
pub enum GuardError {
    /// User input was rejected; the message is safe to show to the end user
    #[error("{0}")]
    InputRejected(Rejection),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Configuration file could not be parsed
    #[error("Invalid configuration file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl GuardError {
    /// The rejection behind this error, if the input was refused
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            GuardError::InputRejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}

/// Failure talking to the external guard backend.
///
/// The facade treats every variant the same way (fall back to the local
/// validators); the variants only exist so logs say what went wrong.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend did not answer within the configured timeout
    #[error("backend timed out after {0:?}")]
    Timeout(Duration),

    /// The request never produced a response
    #[error("backend transport failure: {0}")]
    Transport(String),

    /// The backend answered with a non-success status
    #[error("backend returned status {0}")]
    Status(u16),

    /// The backend implementation panicked while handling the call
    #[error("backend panicked: {0}")]
    Panicked(String),

    /// The response body could not be understood
    #[error("malformed backend response: {0}")]
    Malformed(String),

    /// HTTP client error
    #[cfg(feature = "http-backend")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
