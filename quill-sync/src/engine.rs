//! Sync engine — orchestrates operations end-to-end.
//!
//! The engine is handed its two store adapters at construction and owns the
//! operation queue, batching, and statistics. Status changes are reported as
//! event lists returned from each call (message passing for an external
//! dispatcher), not as callbacks fired mid-computation.
//!
//! Two independently-triggered syncs of the same path are not serialized
//! against each other; a caller wiring a watcher next to manual syncs must
//! avoid overlapping triggers for one path.
//!
//! There is no internal retry. A failed operation carries its categorized
//! error and `retry_count` for the caller's own retry policy.

use crate::checksum::document_checksum;
use crate::error::{SyncError, SyncResult};
use crate::filter::SyncFilters;
use crate::metadata::{extract_metadata, update_for_sync};
use crate::operation::{SyncDirection, SyncOperation, SyncStatus};
use crate::resolver::{
    validate_resolution, ConflictData, Resolution, ResolutionPolicy, Resolve, ThreeWayResolver,
};
use crate::state::SyncStats;
use chrono::Utc;
use quill_store::DocumentStore;
use quill_types::{OperationId, SyncSource};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Configuration for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How conflicting merges are resolved.
    pub policy: ResolutionPolicy,
    /// How many operations run concurrently within a `sync_all` batch.
    pub batch_size: usize,
    /// Whether a manual conflict writes a timestamped local backup.
    pub backup_on_conflict: bool,
    /// Eligibility rules for `sync_all`.
    pub filters: SyncFilters,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            policy: ResolutionPolicy::default(),
            batch_size: 5,
            backup_on_conflict: true,
            filters: SyncFilters::default(),
        }
    }
}

/// A status-change notification, returned to the caller for dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum SyncEvent {
    Queued {
        id: OperationId,
        path: String,
    },
    Started {
        id: OperationId,
    },
    Completed {
        id: OperationId,
    },
    Failed {
        id: OperationId,
        error: String,
    },
    ConflictDetected {
        id: OperationId,
        path: String,
        suggestions: Vec<String>,
    },
    DocumentSynced {
        path: String,
        direction: SyncDirection,
    },
}

/// Result of a single `sync_file` call.
#[derive(Debug, Clone)]
pub struct FileSyncOutcome {
    /// The operation in its terminal state.
    pub operation: SyncOperation,
    /// Status events in the order they occurred.
    pub events: Vec<SyncEvent>,
}

/// Aggregate result of a `sync_all` run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub successful: usize,
    pub failed: usize,
    pub conflicts: usize,
    /// Events from every operation in the run, in order.
    pub events: Vec<SyncEvent>,
}

/// What a direction handler did with the document.
enum FileAction {
    /// Checksums matched; nothing written.
    UpToDate,
    /// One side overwrote the other.
    Pushed(SyncDirection),
    /// An auto-merged result was written to both stores.
    Merged,
    /// Divergence needs a human; payload plus suggestions.
    Conflicted(ConflictData, Vec<String>),
}

/// The sync engine.
pub struct SyncEngine {
    local: Arc<dyn DocumentStore>,
    remote: Arc<dyn DocumentStore>,
    resolver: Arc<dyn Resolve>,
    config: SyncConfig,
    /// Operations that have not yet reached a terminal status.
    active: Arc<RwLock<HashMap<OperationId, SyncOperation>>>,
    stats: Arc<RwLock<SyncStats>>,
    /// Held for the duration of a `sync_all` run; `stop` waits on it.
    batch_lock: Arc<Mutex<()>>,
    stopped: Arc<AtomicBool>,
}

impl SyncEngine {
    /// Creates an engine over the two stores with the default three-way
    /// resolver under `config.policy`.
    pub fn new(
        local: Arc<dyn DocumentStore>,
        remote: Arc<dyn DocumentStore>,
        config: SyncConfig,
    ) -> Self {
        let resolver = Arc::new(ThreeWayResolver::new(config.policy));
        Self::with_resolver(local, remote, config, resolver)
    }

    /// Creates an engine with a custom resolution strategy.
    pub fn with_resolver(
        local: Arc<dyn DocumentStore>,
        remote: Arc<dyn DocumentStore>,
        config: SyncConfig,
        resolver: Arc<dyn Resolve>,
    ) -> Self {
        Self {
            local,
            remote,
            resolver,
            config,
            active: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(SyncStats::default())),
            batch_lock: Arc::new(Mutex::new(())),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns a snapshot of the statistics.
    pub async fn stats(&self) -> SyncStats {
        self.stats.read().await.clone()
    }

    /// Returns the operations that have not reached a terminal status.
    pub async fn active_operations(&self) -> Vec<SyncOperation> {
        self.active.read().await.values().cloned().collect()
    }

    /// Returns whether `stop` has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Reconciles every eligible local document in fixed-size concurrent
    /// batches, awaiting each batch before starting the next.
    ///
    /// Individual failures are isolated; only a failure to list the local
    /// store aborts the run.
    pub async fn sync_all(&self) -> SyncResult<SyncReport> {
        let _guard = self.batch_lock.lock().await;
        if self.is_stopped() {
            return Ok(SyncReport::default());
        }

        let run_started = Instant::now();
        let paths = self.local.list().await.map_err(SyncError::from)?;
        let eligible = self.filter_eligible(paths).await;

        info!(
            "syncing {} documents in batches of {}",
            eligible.len(),
            self.config.batch_size
        );

        let mut report = SyncReport::default();
        let mut processed: u64 = 0;

        for chunk in eligible.chunks(self.config.batch_size.max(1)) {
            if self.is_stopped() {
                warn!("sync run stopped with {} documents left", eligible.len() as u64 - processed);
                break;
            }
            let outcomes = futures::future::join_all(
                chunk
                    .iter()
                    .map(|path| self.sync_file(path, SyncDirection::Bidirectional)),
            )
            .await;

            for outcome in outcomes {
                processed += 1;
                match outcome.operation.status() {
                    SyncStatus::Completed => report.successful += 1,
                    SyncStatus::Failed => report.failed += 1,
                    SyncStatus::Conflict => report.conflicts += 1,
                    SyncStatus::Pending | SyncStatus::InProgress => {}
                }
                report.events.extend(outcome.events);
            }
        }

        let duration = run_started.elapsed();
        self.stats
            .write()
            .await
            .record_run(processed, duration, Utc::now());
        info!(
            "sync run finished: {} ok, {} failed, {} conflicts in {:?}",
            report.successful, report.failed, report.conflicts, duration
        );
        Ok(report)
    }

    /// Reconciles a single document.
    ///
    /// Always returns an outcome; errors are categorized onto the operation
    /// rather than propagated, so one bad document never takes down a batch.
    pub async fn sync_file(&self, path: &str, direction: SyncDirection) -> FileSyncOutcome {
        let mut op = SyncOperation::new(path, direction);
        let mut events = vec![SyncEvent::Queued {
            id: op.id,
            path: path.to_string(),
        }];
        self.active.write().await.insert(op.id, op.clone());

        // Fresh operations always accept Pending -> InProgress.
        let _ = op.transition(SyncStatus::InProgress);
        events.push(SyncEvent::Started { id: op.id });
        if let Some(entry) = self.active.write().await.get_mut(&op.id) {
            *entry = op.clone();
        }

        let action = match direction {
            SyncDirection::ToRemote => self.push_to_remote(path).await,
            SyncDirection::ToLocal => self.pull_to_local(path).await,
            SyncDirection::Bidirectional => self.reconcile(path).await,
        };

        match action {
            Ok(FileAction::Conflicted(data, suggestions)) => {
                info!("conflict in {}", path);
                let _ = op.conflicted(data);
                events.push(SyncEvent::ConflictDetected {
                    id: op.id,
                    path: path.to_string(),
                    suggestions,
                });
            }
            Ok(action) => {
                let _ = op.transition(SyncStatus::Completed);
                events.push(SyncEvent::Completed { id: op.id });
                match action {
                    FileAction::UpToDate => debug!("{} already in sync", path),
                    FileAction::Pushed(direction) => {
                        debug!("{} pushed {:?}", path, direction);
                        events.push(SyncEvent::DocumentSynced {
                            path: path.to_string(),
                            direction,
                        });
                    }
                    FileAction::Merged => {
                        debug!("{} auto-merged", path);
                        events.push(SyncEvent::DocumentSynced {
                            path: path.to_string(),
                            direction: SyncDirection::Bidirectional,
                        });
                    }
                    FileAction::Conflicted(..) => unreachable!("handled above"),
                }
            }
            Err(e) => {
                warn!("sync of {} failed: {}", path, e);
                let _ = op.fail(e.clone());
                events.push(SyncEvent::Failed {
                    id: op.id,
                    error: e.to_string(),
                });
            }
        }

        self.stats.write().await.record_outcome(op.status());
        self.active.write().await.remove(&op.id);
        FileSyncOutcome {
            operation: op,
            events,
        }
    }

    /// Stops the engine: waits for any in-flight run to drain, then clears
    /// the pending-operation queue. In-flight I/O is not preempted.
    pub async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let _guard = self.batch_lock.lock().await;
        self.active.write().await.clear();
        info!("sync engine stopped, pending queue cleared");
    }

    async fn filter_eligible(&self, paths: Vec<String>) -> Vec<String> {
        let mut eligible = Vec::with_capacity(paths.len());
        for path in paths {
            if !self.config.filters.allows_path(&path) {
                continue;
            }
            if self.config.filters.has_tag_rules() {
                match self.local.read(&path).await {
                    Ok(doc) => {
                        let tags = extract_metadata(&doc.content)
                            .map(|m| m.tags)
                            .unwrap_or_default();
                        if !self.config.filters.allows_tags(&tags) {
                            continue;
                        }
                    }
                    Err(e) => {
                        warn!("skipping {}: {}", path, e);
                        continue;
                    }
                }
            }
            eligible.push(path);
        }
        eligible
    }

    /// Stamps sync metadata on the local content and writes it to the
    /// remote store, preserving the local modification time.
    async fn push_to_remote(&self, path: &str) -> SyncResult<FileAction> {
        let local = self.local.read(path).await?;
        let stamped = update_for_sync(&local.content, SyncSource::Local, Utc::now());
        self.remote
            .write(path, &stamped, Some(local.modified_at))
            .await?;
        Ok(FileAction::Pushed(SyncDirection::ToRemote))
    }

    /// Writes the remote content into the local store verbatim.
    async fn pull_to_local(&self, path: &str) -> SyncResult<FileAction> {
        let remote = self.remote.read(path).await?;
        self.local.write(path, &remote.content, None).await?;
        Ok(FileAction::Pushed(SyncDirection::ToLocal))
    }

    async fn reconcile(&self, path: &str) -> SyncResult<FileAction> {
        let local = self.local.read(path).await?;
        if !self.remote.exists(path).await? {
            let stamped = update_for_sync(&local.content, SyncSource::Local, Utc::now());
            self.remote
                .write(path, &stamped, Some(local.modified_at))
                .await?;
            return Ok(FileAction::Pushed(SyncDirection::ToRemote));
        }

        let remote = self.remote.read(path).await?;
        if document_checksum(&local.content) == document_checksum(&remote.content) {
            return Ok(FileAction::UpToDate);
        }

        match local.modified_at.cmp(&remote.modified_at) {
            CmpOrdering::Greater => {
                let stamped = update_for_sync(&local.content, SyncSource::Local, Utc::now());
                self.remote
                    .write(path, &stamped, Some(local.modified_at))
                    .await?;
                Ok(FileAction::Pushed(SyncDirection::ToRemote))
            }
            CmpOrdering::Less => {
                self.local.write(path, &remote.content, None).await?;
                Ok(FileAction::Pushed(SyncDirection::ToLocal))
            }
            // Equal timestamps with different content: ordering is
            // ambiguous, hand the divergence to the resolver.
            CmpOrdering::Equal => {
                self.resolve_divergence(path, &local.content, &remote.content)
                    .await
            }
        }
    }

    async fn resolve_divergence(
        &self,
        path: &str,
        local_content: &str,
        remote_content: &str,
    ) -> SyncResult<FileAction> {
        // No revision history is kept, so there is no true common ancestor
        // to offer; the resolver falls back to its pseudo-base.
        match self.resolver.resolve(None, local_content, remote_content) {
            Resolution::Auto { content } => {
                validate_resolution(&content)?;
                let stamped = update_for_sync(&content, SyncSource::Local, Utc::now());
                self.local.write(path, &stamped, None).await?;
                self.remote.write(path, &stamped, None).await?;
                Ok(FileAction::Merged)
            }
            Resolution::Manual {
                conflict,
                suggestions,
            } => {
                if self.config.backup_on_conflict {
                    let backup_path =
                        conflict_backup_path(path, Utc::now().timestamp_millis());
                    self.local.write(&backup_path, local_content, None).await?;
                    info!("conflict backup written to {}", backup_path);
                }
                Ok(FileAction::Conflicted(conflict, suggestions))
            }
        }
    }
}

/// Builds the backup name for an unresolved conflict:
/// `<stem>.conflict.<epoch-ms>.<ext>` next to the original.
fn conflict_backup_path(path: &str, epoch_ms: i64) -> String {
    let (dir, name) = match path.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, path),
    };
    let backup_name = match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}.conflict.{epoch_ms}.{ext}"),
        None => format!("{name}.conflict.{epoch_ms}"),
    };
    match dir {
        Some(dir) => format!("{dir}/{backup_name}"),
        None => backup_name,
    }
}
