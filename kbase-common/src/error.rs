//! Common error types for kbase

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for kbase operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across kbase crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catalog document does not match the expected schema
    #[error("Malformed catalog {}: {source}", path.display())]
    MalformedStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
