//! Error types for the store layer.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Document not found.
    #[error("document not found: {0}")]
    NotFound(String),

    /// Permission denied by the store.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Path rejected by the store (absolute, traversal, empty).
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Remote store unreachable.
    #[error("network error: {0}")]
    Network(String),
}
