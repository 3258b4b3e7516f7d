//! Core type definitions for Quill.
//!
//! This crate defines the fundamental, store-agnostic types used throughout
//! the sync engine:
//! - Operation identifiers (UUID v7)
//! - The note metadata model embedded at the top of each document
//!
//! Everything that touches I/O (stores, watchers, the engine itself) lives in
//! the other crates; this one stays pure data.

mod ids;
mod metadata;

pub use ids::OperationId;
pub use metadata::{Layer, NoteMetadata, SyncSource, SyncStamp};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(#[from] chrono::ParseError),
}
