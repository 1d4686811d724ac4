//! Common error types for invest storage.

use thiserror::Error;

/// Top-level error type for storage and registry operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A provider with this name is already registered.
    #[error("Storage provider '{name}' is already registered")]
    DuplicateProvider { name: String },

    /// No provider is registered under the requested name.
    #[error("Unknown storage provider '{name}' (available: {})", format_available(.available))]
    UnknownProvider { name: String, available: Vec<String> },

    /// The process-wide registry was already installed.
    #[error("Provider registry is already initialized")]
    AlreadyInitialized,

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "none".to_string()
    } else {
        available.join(", ")
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
