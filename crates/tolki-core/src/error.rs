//! Error types for the Tolki session engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire engine.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum TolkiError {
    /// A command name that is not present in the registry.
    #[error("Unknown command: {name}")]
    UnknownCommand { name: String },

    /// A registered command rejected its parameters.
    #[error("Invalid params for command: {name}")]
    InvalidCommandParams { name: String },

    /// IO error (settings store operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Data access error (settings/persistence layer)
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "JSON", etc.
        message: String,
    },

    /// Remote endpoint error (settings fetch, message round trip)
    #[error("Endpoint error: {0}")]
    Endpoint(String),

    /// A locale with no registered language table
    #[error("Unsupported locale: {0}")]
    UnsupportedLocale(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TolkiError {
    /// Creates an UnknownCommand error
    pub fn unknown_command(name: impl Into<String>) -> Self {
        Self::UnknownCommand { name: name.into() }
    }

    /// Creates an InvalidCommandParams error
    pub fn invalid_params(name: impl Into<String>) -> Self {
        Self::InvalidCommandParams { name: name.into() }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a DataAccess error
    pub fn data_access(message: impl Into<String>) -> Self {
        Self::DataAccess(message.into())
    }

    /// Creates an Endpoint error
    pub fn endpoint(message: impl Into<String>) -> Self {
        Self::Endpoint(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is an UnknownCommand error
    pub fn is_unknown_command(&self) -> bool {
        matches!(self, Self::UnknownCommand { .. })
    }

    /// Check if this is an InvalidCommandParams error
    pub fn is_invalid_params(&self) -> bool {
        matches!(self, Self::InvalidCommandParams { .. })
    }
}

impl From<std::io::Error> for TolkiError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for TolkiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, TolkiError>`.
pub type Result<T> = std::result::Result<T, TolkiError>;
