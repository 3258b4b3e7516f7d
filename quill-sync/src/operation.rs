//! Sync operation lifecycle.
//!
//! One operation reconciles one document. Status moves
//! `Pending → InProgress → {Completed | Failed | Conflict}` and never
//! backwards; the type enforces that by keeping the status private and
//! rejecting illegal transitions.

use crate::error::{SyncError, SyncResult};
use crate::resolver::ConflictData;
use chrono::{DateTime, Utc};
use quill_types::OperationId;
use serde::{Deserialize, Serialize};

/// Which way a sync pushes content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncDirection {
    /// Local content overwrites the remote copy.
    ToRemote,
    /// Remote content overwrites the local copy.
    ToLocal,
    /// Reconcile both sides.
    Bidirectional,
}

/// Lifecycle state of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Conflict,
}

impl SyncStatus {
    /// Returns whether this status ends the operation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncStatus::Completed | SyncStatus::Failed | SyncStatus::Conflict
        )
    }

    fn can_transition_to(&self, next: SyncStatus) -> bool {
        matches!(
            (self, next),
            (SyncStatus::Pending, SyncStatus::InProgress)
                | (SyncStatus::InProgress, SyncStatus::Completed)
                | (SyncStatus::InProgress, SyncStatus::Failed)
                | (SyncStatus::InProgress, SyncStatus::Conflict)
        )
    }
}

/// One attempt to reconcile a single document.
#[derive(Debug, Clone)]
pub struct SyncOperation {
    pub id: OperationId,
    /// Store-relative path of the document.
    pub path: String,
    pub direction: SyncDirection,
    status: SyncStatus,
    pub created_at: DateTime<Utc>,
    /// Maintained by callers that re-submit failed operations; the engine
    /// itself never retries.
    pub retry_count: u32,
    /// Categorized error, set when the operation fails.
    pub error: Option<SyncError>,
    /// Conflict payload, set when the operation ends in `Conflict`.
    pub conflict: Option<ConflictData>,
}

impl SyncOperation {
    /// Creates a pending operation.
    pub fn new(path: impl Into<String>, direction: SyncDirection) -> Self {
        Self {
            id: OperationId::new(),
            path: path.into(),
            direction,
            status: SyncStatus::Pending,
            created_at: Utc::now(),
            retry_count: 0,
            error: None,
            conflict: None,
        }
    }

    /// Returns the current status.
    pub fn status(&self) -> SyncStatus {
        self.status
    }

    /// Advances the lifecycle, rejecting any transition that would leave a
    /// terminal state or re-enter `Pending`.
    pub fn transition(&mut self, next: SyncStatus) -> SyncResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(SyncError::Validation(format!(
                "illegal status transition {:?} -> {:?} for operation {}",
                self.status, next, self.id
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Marks the operation failed with a categorized error.
    pub fn fail(&mut self, error: SyncError) -> SyncResult<()> {
        self.transition(SyncStatus::Failed)?;
        self.error = Some(error);
        Ok(())
    }

    /// Marks the operation conflicted with its payload.
    pub fn conflicted(&mut self, data: ConflictData) -> SyncResult<()> {
        self.transition(SyncStatus::Conflict)?;
        self.error = Some(SyncError::Conflict {
            path: self.path.clone(),
        });
        self.conflict = Some(data);
        Ok(())
    }
}
