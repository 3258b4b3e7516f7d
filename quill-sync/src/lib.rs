//! Synchronization and conflict-resolution engine for Quill.
//!
//! Reconciles documents between two independently-mutable stores — a local
//! interactive store and a remote managed store — detecting divergence and
//! resolving it automatically when safe, or surfacing it for manual
//! intervention when not.
//!
//! # Components
//!
//! - **Metadata codec**: the structured block embedded at the top of each
//!   document (front matter), including the sync stamp
//! - **Checksum**: content hashes that exclude the sync stamp, so
//!   write-backs converge
//! - **Change detector**: debounced watching of the local store
//! - **Conflict resolver**: three-way line merge plus resolution policy
//! - **Sync engine**: operation lifecycle, batching, statistics
//!
//! # Flow
//!
//! 1. The change detector (or a direct caller) names a document
//! 2. The engine reads both stores and compares checksums
//! 3. On divergence, modification times pick a winner; ambiguous ordering
//!    goes to the resolver
//! 4. Clean merges are written back to both stores; conflicts terminate the
//!    operation with a payload for the caller to present
//!
//! # Example
//!
//! ```
//! use quill_store::MemoryStore;
//! use quill_sync::{SyncConfig, SyncEngine};
//! use std::sync::Arc;
//!
//! let local = Arc::new(MemoryStore::new());
//! let remote = Arc::new(MemoryStore::new());
//! let engine = SyncEngine::new(local, remote, SyncConfig::default());
//! ```

pub mod checksum;
mod engine;
mod error;
pub mod filter;
pub mod metadata;
pub mod operation;
pub mod resolver;
pub mod state;
pub mod watcher;

pub use checksum::document_checksum;
pub use engine::{FileSyncOutcome, SyncConfig, SyncEngine, SyncEvent, SyncReport};
pub use error::{SyncError, SyncResult};
pub use filter::{is_structurally_excluded, SyncFilters};
pub use metadata::{extract_metadata, update_for_sync, update_metadata};
pub use operation::{SyncDirection, SyncOperation, SyncStatus};
pub use resolver::{
    three_way_merge, validate_resolution, ConflictData, ConflictMarker, ConflictSide, Resolution,
    ResolutionPolicy, Resolve, ThreeWayResolver, MARKER_LOCAL, MARKER_REMOTE, MARKER_SEPARATOR,
};
pub use state::SyncStats;
pub use watcher::{ChangeDetector, ChangeEvent, ChangeKind, WatcherConfig};
