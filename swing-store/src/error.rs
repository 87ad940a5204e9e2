//! Storage layer errors

use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error (reading a snapshot back)
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// CSV journal error
    #[error("Journal error: {0}")]
    Journal(String),

    /// Blocking write task panicked or was cancelled
    #[error("Background write failed: {0}")]
    Background(String),
}

impl From<csv::Error> for StoreError {
    fn from(err: csv::Error) -> Self {
        StoreError::Journal(err.to_string())
    }
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
