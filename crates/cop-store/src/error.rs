//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No envelope stored under the given transaction id.
    #[error("envelope not found: {0}")]
    NotFound(String),

    /// The addendum or record does not belong to the stored envelope.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
