//! Error types for reanchor.

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias using reanchor's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for reanchor operations.
///
/// Per-item errors (`MalformedInput`, `Computation`) never abort a batch:
/// the orchestrators catch them and classify the offending item as lost.
#[derive(Error, Debug)]
pub enum Error {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Document text not available for a document
    #[error("Document not found: {0}")]
    DocumentNotFound(uuid::Uuid),

    /// A reference or connection is missing data required for recovery
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Numeric failure while scoring (dimension mismatch, corrupt vector)
    #[error("Computation error: {0}")]
    Computation(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is isolated to a single recovery item.
    pub fn is_per_item(&self) -> bool {
        matches!(self, Error::MalformedInput(_) | Error::Computation(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}
