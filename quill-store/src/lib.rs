//! Document store contract and reference adapters for Quill.
//!
//! A document store is anything that can hold named text documents: a notes
//! directory on disk, a managed remote vault, an in-memory map in tests. The
//! sync engine is written against the [`DocumentStore`] trait and is handed
//! two instances (local and remote) at construction; it never reaches for a
//! global store handle.
//!
//! # Contract
//!
//! - `read` and `exists` are idempotent.
//! - `write` is atomic from the engine's point of view: a concurrent `read`
//!   observes either the previous content or the new content, never a
//!   partially-written value.
//! - Paths are store-relative, `/`-separated.

mod error;
mod local;
mod memory;

pub use error::{StoreError, StoreResult};
pub use local::DirStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A document as reported by a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Full text content.
    pub content: String,
    /// Store-reported modification time.
    pub modified_at: DateTime<Utc>,
    /// Lowercase hex SHA-256 of the raw content bytes.
    pub checksum: String,
}

/// Abstract document store interface.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the name of the store (for logging).
    fn store_name(&self) -> &'static str;

    /// Returns whether a document exists at the given path.
    async fn exists(&self, path: &str) -> StoreResult<bool>;

    /// Reads a document's content, modification time and checksum.
    async fn read(&self, path: &str) -> StoreResult<StoredDocument>;

    /// Writes a document, creating it if necessary.
    ///
    /// When `modified_at` is given, the store records it as the document's
    /// modification time if it supports doing so.
    async fn write(
        &self,
        path: &str,
        content: &str,
        modified_at: Option<DateTime<Utc>>,
    ) -> StoreResult<()>;

    /// Deletes a document. Deleting a missing document is not an error.
    async fn delete(&self, path: &str) -> StoreResult<()>;

    /// Renames a document.
    async fn rename(&self, old_path: &str, new_path: &str) -> StoreResult<()>;

    /// Lists all document paths in the store.
    async fn list(&self) -> StoreResult<Vec<String>>;
}

/// Hashes raw content bytes to a lowercase hex SHA-256 digest.
pub(crate) fn raw_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
