//! Shared sync state types.

use std::time::Duration;

use serde::Serialize;

/// What a sync engine is doing right now.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
}

/// Terminal state of one cycle. The engine returns to Idle after either.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    Completed,
    Failed,
}

/// Summary of one completed cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub events_pushed: usize,
    pub acks_delivered: usize,
    /// Number of ids the server reported as ingested
    pub accepted_event_ids: usize,
    pub asset_changes: usize,
    pub new_conflicts: usize,
    pub server_time: String,
    pub conflict_strategy: String,
    pub duration: Duration,
}

/// Running totals across the lifetime of an engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub events_pushed: u64,
    pub acks_delivered: u64,
    pub asset_changes_applied: u64,
    pub conflicts_received: u64,
    pub last_outcome: Option<CycleOutcome>,
    pub last_error: Option<String>,
    pub last_server_time: Option<String>,
}

impl SyncStats {
    pub(crate) fn record_success(&mut self, report: &SyncReport) {
        self.cycles_completed += 1;
        self.events_pushed += report.events_pushed as u64;
        self.acks_delivered += report.acks_delivered as u64;
        self.asset_changes_applied += report.asset_changes as u64;
        self.conflicts_received += report.new_conflicts as u64;
        self.last_outcome = Some(CycleOutcome::Completed);
        self.last_error = None;
        self.last_server_time = Some(report.server_time.clone());
    }

    pub(crate) fn record_failure(&mut self, error: &crate::Error) {
        self.cycles_failed += 1;
        self.last_outcome = Some(CycleOutcome::Failed);
        self.last_error = Some(error.to_string());
    }
}
