//! Sync statistics.
//!
//! Counters move at every terminal operation status; the average duration
//! moves once per `sync_all` run, fed with the whole-run duration.

use crate::operation::SyncStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Aggregate statistics over all sync activity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    pub total_syncs: u64,
    pub successful_syncs: u64,
    pub failed_syncs: u64,
    pub conflict_syncs: u64,
    /// When the last `sync_all` run finished.
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Running mean duration of a `sync_all` run, in milliseconds.
    pub avg_sync_time_ms: f64,
}

impl SyncStats {
    /// Records one operation reaching a terminal status.
    pub fn record_outcome(&mut self, status: SyncStatus) {
        match status {
            SyncStatus::Completed => {
                self.total_syncs += 1;
                self.successful_syncs += 1;
            }
            SyncStatus::Failed => {
                self.total_syncs += 1;
                self.failed_syncs += 1;
            }
            SyncStatus::Conflict => {
                self.total_syncs += 1;
                self.conflict_syncs += 1;
            }
            SyncStatus::Pending | SyncStatus::InProgress => {}
        }
    }

    /// Records a whole `sync_all` run of `operations` operations that took
    /// `duration`, updating the incremental mean:
    /// `avg' = avg + operations * (duration - avg) / total`.
    pub fn record_run(&mut self, operations: u64, duration: Duration, finished_at: DateTime<Utc>) {
        self.last_sync_time = Some(finished_at);
        if operations == 0 || self.total_syncs == 0 {
            return;
        }
        let duration_ms = duration.as_secs_f64() * 1000.0;
        self.avg_sync_time_ms +=
            operations as f64 * (duration_ms - self.avg_sync_time_ms) / self.total_syncs as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_move_the_right_counters() {
        let mut stats = SyncStats::default();
        stats.record_outcome(SyncStatus::Completed);
        stats.record_outcome(SyncStatus::Completed);
        stats.record_outcome(SyncStatus::Failed);
        stats.record_outcome(SyncStatus::Conflict);
        stats.record_outcome(SyncStatus::InProgress);

        assert_eq!(stats.total_syncs, 4);
        assert_eq!(stats.successful_syncs, 2);
        assert_eq!(stats.failed_syncs, 1);
        assert_eq!(stats.conflict_syncs, 1);
    }

    #[test]
    fn first_run_sets_the_average() {
        let mut stats = SyncStats::default();
        for _ in 0..3 {
            stats.record_outcome(SyncStatus::Completed);
        }
        stats.record_run(3, Duration::from_millis(600), Utc::now());
        assert!((stats.avg_sync_time_ms - 600.0).abs() < f64::EPSILON);
        assert!(stats.last_sync_time.is_some());
    }

    #[test]
    fn later_runs_blend_in() {
        let mut stats = SyncStats::default();
        for _ in 0..2 {
            stats.record_outcome(SyncStatus::Completed);
        }
        stats.record_run(2, Duration::from_millis(100), Utc::now());
        for _ in 0..2 {
            stats.record_outcome(SyncStatus::Completed);
        }
        stats.record_run(2, Duration::from_millis(300), Utc::now());

        // 100 + 2 * (300 - 100) / 4 = 200
        assert!((stats.avg_sync_time_ms - 200.0).abs() < 1e-9);
    }

    #[test]
    fn empty_run_only_touches_timestamp() {
        let mut stats = SyncStats::default();
        stats.record_run(0, Duration::from_millis(50), Utc::now());
        assert_eq!(stats.avg_sync_time_ms, 0.0);
        assert!(stats.last_sync_time.is_some());
    }
}
