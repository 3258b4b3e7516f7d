//! In-memory document store.
//!
//! The adapter used throughout the engine tests, and a reasonable backend
//! for ephemeral stores. Writes replace the entry under a single lock, which
//! makes them trivially atomic.

use crate::error::{StoreError, StoreResult};
use crate::{raw_checksum, DocumentStore, StoredDocument};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct MemoryEntry {
    content: String,
    modified_at: DateTime<Utc>,
}

/// A document store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents held.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns whether the store holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn store_name(&self) -> &'static str {
        "memory"
    }

    async fn exists(&self, path: &str) -> StoreResult<bool> {
        Ok(self.entries.read().await.contains_key(path))
    }

    async fn read(&self, path: &str) -> StoreResult<StoredDocument> {
        let entries = self.entries.read().await;
        let entry = entries
            .get(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        Ok(StoredDocument {
            content: entry.content.clone(),
            modified_at: entry.modified_at,
            checksum: raw_checksum(&entry.content),
        })
    }

    async fn write(
        &self,
        path: &str,
        content: &str,
        modified_at: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        if path.is_empty() {
            return Err(StoreError::InvalidPath("empty path".to_string()));
        }
        let entry = MemoryEntry {
            content: content.to_string(),
            modified_at: modified_at.unwrap_or_else(Utc::now),
        };
        self.entries.write().await.insert(path.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        self.entries.write().await.remove(path);
        Ok(())
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .remove(old_path)
            .ok_or_else(|| StoreError::NotFound(old_path.to_string()))?;
        entries.insert(new_path.to_string(), entry);
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        let mut paths: Vec<String> = self.entries.read().await.keys().cloned().collect();
        paths.sort();
        Ok(paths)
    }
}
