//! Error types for the sync layer.

use quill_store::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
///
/// An unresolved merge is *not* one of these at the API surface: conflicts
/// terminate an operation in `Conflict` status with attached conflict data.
/// The `Conflict` variant exists so the category can ride on an operation
/// record like any other.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Remote store unreachable.
    #[error("network error: {0}")]
    Network(String),

    /// Local I/O failure.
    #[error("filesystem error: {0}")]
    FileSystem(String),

    /// Operation not permitted by a store.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Malformed metadata, residual conflict markers, or an illegal
    /// operation transition.
    #[error("validation error: {0}")]
    Validation(String),

    /// Merge produced unresolved divergence.
    #[error("unresolved conflict in {path}")]
    Conflict { path: String },
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Io(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
                SyncError::Permission(io.to_string())
            }
            StoreError::Io(io) => SyncError::FileSystem(io.to_string()),
            StoreError::NotFound(path) => SyncError::FileSystem(format!("not found: {path}")),
            StoreError::Permission(msg) => SyncError::Permission(msg),
            StoreError::InvalidPath(msg) => SyncError::Validation(format!("invalid path: {msg}")),
            StoreError::Network(msg) => SyncError::Network(msg),
        }
    }
}
