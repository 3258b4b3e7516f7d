//! Directory-backed document store.
//!
//! Documents are plain files under a root directory; paths are relative to
//! that root. Writes go through a hidden temp file in the target directory
//! followed by a rename, so a reader never observes a partially-written
//! document.
//!
//! Explicit modification times passed to `write` are kept in an adapter-side
//! cache and reported back by `read`; they are not persisted across process
//! restarts.

use crate::error::{StoreError, StoreResult};
use crate::{raw_checksum, DocumentStore, StoredDocument};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// A document store rooted at a directory on the local file system.
pub struct DirStore {
    root: PathBuf,
    /// Modification times recorded via explicit `write(.., modified_at)`.
    mtimes: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl DirStore {
    /// Creates a store rooted at `root`. The directory must already exist.
    pub fn new(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::InvalidPath(format!(
                "store root is not a directory: {}",
                root.display()
            )));
        }
        Ok(Self {
            root,
            mtimes: RwLock::new(HashMap::new()),
        })
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a store-relative path, rejecting traversal outside the root.
    fn resolve(&self, path: &str) -> StoreResult<PathBuf> {
        if path.is_empty() {
            return Err(StoreError::InvalidPath("empty path".to_string()));
        }
        let rel = Path::new(path);
        for component in rel.components() {
            match component {
                Component::Normal(_) => {}
                Component::CurDir => {}
                _ => {
                    return Err(StoreError::Permission(format!(
                        "path escapes store root: {path}"
                    )));
                }
            }
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl DocumentStore for DirStore {
    fn store_name(&self) -> &'static str {
        "directory"
    }

    async fn exists(&self, path: &str) -> StoreResult<bool> {
        let full = self.resolve(path)?;
        Ok(fs::try_exists(&full).await?)
    }

    async fn read(&self, path: &str) -> StoreResult<StoredDocument> {
        let full = self.resolve(path)?;
        let content = match fs::read_to_string(&full).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let modified_at = match self.mtimes.read().await.get(path) {
            Some(recorded) => *recorded,
            None => {
                let metadata = fs::metadata(&full).await?;
                metadata
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now())
            }
        };

        Ok(StoredDocument {
            checksum: raw_checksum(&content),
            content,
            modified_at,
        })
    }

    async fn write(
        &self,
        path: &str,
        content: &str,
        modified_at: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Hidden temp name keeps half-written files out of list() and out of
        // any watcher pointed at this directory.
        let temp_name = format!(".{}.quill-tmp", Uuid::new_v4());
        let temp_path = full
            .parent()
            .map(|p| p.join(&temp_name))
            .unwrap_or_else(|| PathBuf::from(&temp_name));

        fs::write(&temp_path, content).await?;
        if let Err(e) = fs::rename(&temp_path, &full).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        debug!("wrote {} ({} bytes)", path, content.len());

        let mut mtimes = self.mtimes.write().await;
        match modified_at {
            Some(ts) => {
                mtimes.insert(path.to_string(), ts);
            }
            None => {
                mtimes.remove(path);
            }
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        let full = self.resolve(path)?;
        match fs::remove_file(&full).await {
            Ok(()) => {}
            // Already gone is fine for delete.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.mtimes.write().await.remove(path);
        Ok(())
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> StoreResult<()> {
        let old_full = self.resolve(old_path)?;
        let new_full = self.resolve(new_path)?;
        if !fs::try_exists(&old_full).await? {
            return Err(StoreError::NotFound(old_path.to_string()));
        }
        if let Some(parent) = new_full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&old_full, &new_full).await?;

        let mut mtimes = self.mtimes.write().await;
        if let Some(ts) = mtimes.remove(old_path) {
            mtimes.insert(new_path.to_string(), ts);
        }
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        let mut paths = Vec::new();
        let mut stack = vec![self.root.clone()];

        while let Some(dir) = stack.pop() {
            let mut read_dir = fs::read_dir(&dir).await?;
            while let Some(entry) = read_dir.next_entry().await? {
                let entry_path = entry.path();
                let name = entry.file_name();
                // Skip hidden entries (includes our temp files).
                if name.to_string_lossy().starts_with('.') {
                    continue;
                }
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    stack.push(entry_path);
                } else if file_type.is_file() {
                    match entry_path.strip_prefix(&self.root) {
                        Ok(rel) => {
                            let rel = rel
                                .components()
                                .map(|c| c.as_os_str().to_string_lossy())
                                .collect::<Vec<_>>()
                                .join("/");
                            paths.push(rel);
                        }
                        Err(_) => warn!("skipping entry outside root: {:?}", entry_path),
                    }
                }
            }
        }

        paths.sort();
        Ok(paths)
    }
}
