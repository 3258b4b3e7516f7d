//! Change detection for the local store.
//!
//! Two stages. A polling loop diffs store snapshots (cached per-path
//! fingerprints) into raw create/modify/delete events; the detector then
//! debounces those per path and emits settled [`ChangeEvent`]s on an mpsc
//! channel. Each path owns at most one pending timer — a new raw event for
//! the same path replaces its timer rather than stacking another.
//!
//! Newly created paths settle on a longer delay than modifications so that
//! partially-written files are not picked up mid-write. Deletes bypass the
//! debounce entirely; there is no content left to settle. Propagating a
//! delete to the remote store is the caller's decision.

use crate::error::{SyncError, SyncResult};
use crate::filter::SyncFilters;
use crate::metadata::extract_metadata;
use chrono::{DateTime, Utc};
use quill_store::DocumentStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// A settled change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Store-relative path of the document.
    pub path: String,
    pub kind: ChangeKind,
}

/// Configuration for the change detector.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// How often the store is polled for raw changes.
    pub poll_interval: Duration,
    /// Settle delay for modifications.
    pub modify_settle: Duration,
    /// Settle delay for newly created paths.
    pub create_settle: Duration,
    /// Capacity of the outgoing event channel.
    pub channel_capacity: usize,
    /// Eligibility rules applied before debouncing.
    pub filters: SyncFilters,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            modify_settle: Duration::from_millis(1000),
            create_settle: Duration::from_millis(2000),
            channel_capacity: 64,
            filters: SyncFilters::default(),
        }
    }
}

/// Cached per-path state for snapshot diffing.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fingerprint {
    modified_at: DateTime<Utc>,
    checksum: String,
}

struct DetectorShared {
    store: Arc<dyn DocumentStore>,
    filters: SyncFilters,
    modify_settle: Duration,
    create_settle: Duration,
    /// One pending timer per path, tagged with a generation so a finished
    /// timer never removes its successor.
    timers: Mutex<HashMap<String, (u64, JoinHandle<()>)>>,
    generation: AtomicU64,
    fingerprints: Mutex<HashMap<String, Fingerprint>>,
    tx: mpsc::Sender<ChangeEvent>,
}

impl DetectorShared {
    /// Emits a settled event, applying tag rules for paths that still have
    /// content to read.
    async fn emit(&self, path: String, kind: ChangeKind) {
        if kind != ChangeKind::Deleted && self.filters.has_tag_rules() {
            match self.store.read(&path).await {
                Ok(doc) => {
                    let tags = extract_metadata(&doc.content)
                        .map(|m| m.tags)
                        .unwrap_or_default();
                    if !self.filters.allows_tags(&tags) {
                        debug!("change to {} filtered by tag rules", path);
                        return;
                    }
                }
                Err(e) => {
                    warn!("skipping change to {}: {}", path, e);
                    return;
                }
            }
        }
        let _ = self.tx.send(ChangeEvent { path, kind }).await;
    }

    async fn poll_once(shared: &Arc<Self>) -> SyncResult<usize> {
        let paths = shared.store.list().await.map_err(SyncError::from)?;

        let mut current = HashMap::new();
        for path in paths {
            if !shared.filters.allows_path(&path) {
                continue;
            }
            match shared.store.read(&path).await {
                Ok(doc) => {
                    current.insert(
                        path,
                        Fingerprint {
                            modified_at: doc.modified_at,
                            checksum: doc.checksum,
                        },
                    );
                }
                Err(e) => warn!("poll skipping {}: {}", path, e),
            }
        }

        let mut raw = Vec::new();
        {
            let mut known = shared.fingerprints.lock().await;
            for (path, fingerprint) in &current {
                match known.get(path) {
                    None => raw.push((path.clone(), ChangeKind::Created)),
                    Some(previous) if previous != fingerprint => {
                        raw.push((path.clone(), ChangeKind::Modified));
                    }
                    Some(_) => {}
                }
            }
            for path in known.keys() {
                if !current.contains_key(path) {
                    raw.push((path.clone(), ChangeKind::Deleted));
                }
            }
            *known = current;
        }

        let count = raw.len();
        for (path, kind) in raw {
            Self::notify(shared, path, kind).await;
        }
        Ok(count)
    }

    /// Feeds one raw event into the debouncer.
    async fn notify(shared: &Arc<Self>, path: String, kind: ChangeKind) {
        if !shared.filters.allows_path(&path) {
            return;
        }

        let mut timers = shared.timers.lock().await;
        if let Some((_, handle)) = timers.remove(&path) {
            handle.abort();
        }

        if kind == ChangeKind::Deleted {
            drop(timers);
            shared.emit(path, kind).await;
            return;
        }

        let delay = match kind {
            ChangeKind::Created => shared.create_settle,
            _ => shared.modify_settle,
        };
        let generation = shared.generation.fetch_add(1, Ordering::Relaxed);
        let task_shared = Arc::clone(shared);
        let timer_path = path.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task_shared.emit(timer_path.clone(), kind).await;
            let mut timers = task_shared.timers.lock().await;
            if timers.get(&timer_path).is_some_and(|(g, _)| *g == generation) {
                timers.remove(&timer_path);
            }
        });
        timers.insert(path, (generation, handle));
    }
}

/// Watches the local store and emits debounced change notifications.
pub struct ChangeDetector {
    shared: Arc<DetectorShared>,
    poll_interval: Duration,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl ChangeDetector {
    /// Creates a detector over `store` and returns it together with the
    /// receiving end of the notification channel.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        config: WatcherConfig,
    ) -> (Self, mpsc::Receiver<ChangeEvent>) {
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let shared = Arc::new(DetectorShared {
            store,
            filters: config.filters,
            modify_settle: config.modify_settle,
            create_settle: config.create_settle,
            timers: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            fingerprints: Mutex::new(HashMap::new()),
            tx,
        });
        let detector = Self {
            shared,
            poll_interval: config.poll_interval,
            poll_task: Mutex::new(None),
        };
        (detector, rx)
    }

    /// Feeds one raw event into the debouncer directly.
    ///
    /// The polling loop calls this internally; callers with their own event
    /// source (an OS watcher, a store with native notifications) can bypass
    /// polling and feed events here.
    pub async fn notify(&self, path: impl Into<String>, kind: ChangeKind) {
        DetectorShared::notify(&self.shared, path.into(), kind).await;
    }

    /// Runs one snapshot diff against the store, feeding any raw changes
    /// into the debouncer. Returns how many raw events were observed.
    pub async fn poll_once(&self) -> SyncResult<usize> {
        DetectorShared::poll_once(&self.shared).await
    }

    /// Seeds the fingerprint cache from the current store state without
    /// emitting events. Useful before `start` so pre-existing documents are
    /// not all reported as created.
    pub async fn prime(&self) -> SyncResult<()> {
        DetectorShared::poll_once(&self.shared).await?;
        let mut timers = self.shared.timers.lock().await;
        for (_, (_, handle)) in timers.drain() {
            handle.abort();
        }
        Ok(())
    }

    /// Starts the polling loop.
    pub async fn start(&self) {
        let shared = Arc::clone(&self.shared);
        let interval = self.poll_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = DetectorShared::poll_once(&shared).await {
                    warn!("store poll failed: {}", e);
                }
            }
        });
        let mut task = self.poll_task.lock().await;
        if let Some(previous) = task.replace(handle) {
            previous.abort();
        }
    }

    /// Stops the polling loop and cancels all pending timers.
    pub async fn stop(&self) {
        if let Some(handle) = self.poll_task.lock().await.take() {
            handle.abort();
        }
        let mut timers = self.shared.timers.lock().await;
        for (_, (_, handle)) in timers.drain() {
            handle.abort();
        }
    }
}
