//! Error types for the Libris client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Libris client.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum LibrisError {
    /// Login or registration was rejected by the service
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The service answered with a non-success HTTP status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a response (connect failure, timeout, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "JSON", "query string", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LibrisError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an Auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Creates an Api error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Creates a Network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is an Auth error
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Check if this is an Api error
    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api { .. })
    }

    /// Check if this is a Network error
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Returns the HTTP status of an Api error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error came from a rejected request rather than a
    /// transport failure (used by views to pick the message style).
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Api { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for LibrisError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for LibrisError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, LibrisError>`.
pub type Result<T> = std::result::Result<T, LibrisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_status() {
        let err = LibrisError::api(404, "not found");
        assert_eq!(err.status(), Some(404));
        assert!(err.is_api());
        assert!(err.is_rejection());
    }

    #[test]
    fn test_network_is_not_rejection() {
        let err = LibrisError::network("connection refused");
        assert!(err.is_network());
        assert!(!err.is_rejection());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: LibrisError = io.into();
        assert!(matches!(err, LibrisError::Io { .. }));
    }
}
