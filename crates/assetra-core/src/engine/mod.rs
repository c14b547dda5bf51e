//! Sync engine: drives push-then-pull cycles between a mirror and a transport.
//!
//! A cycle reads the pending state, hands it to the transport, and on success
//! writes the whole outcome back through a single
//! [`LocalMirror::apply_sync_outcome`] call. Any failure before that call
//! leaves the mirror exactly as it was, so retrying is always safe.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::mirror::{LocalMirror, SyncOutcome};
use crate::state::{SyncReport, SyncState, SyncStats};
use crate::transport::{SyncRequest, SyncTransport};
use crate::{Error, Result};

/// Runs at most one cycle at a time against one mirror.
pub struct SyncEngine<M: LocalMirror, T: SyncTransport> {
    mirror: Arc<M>,
    transport: T,
    cycle: tokio::sync::Mutex<()>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
}

impl<M: LocalMirror, T: SyncTransport> SyncEngine<M, T> {
    pub fn new(mirror: Arc<M>, transport: T) -> Self {
        Self {
            mirror,
            transport,
            cycle: tokio::sync::Mutex::new(()),
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    pub const fn mirror(&self) -> &Arc<M> {
        &self.mirror
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Run one cycle, waiting for an in-flight cycle to finish first.
    ///
    /// A queued cycle reads pending state only once it starts, so it picks up
    /// whatever was captured while it waited.
    pub async fn sync(&self) -> Result<SyncReport> {
        let _cycle = self.cycle.lock().await;
        self.run_cycle().await
    }

    /// Run one cycle, or fail with [`Error::SyncInProgress`] if one is running.
    pub async fn try_sync(&self) -> Result<SyncReport> {
        let Ok(_cycle) = self.cycle.try_lock() else {
            return Err(Error::SyncInProgress);
        };
        self.run_cycle().await
    }

    async fn run_cycle(&self) -> Result<SyncReport> {
        let _syncing = SyncingGuard::enter(&self.state);

        match self.execute().await {
            Ok(report) => {
                tracing::info!(
                    events = report.events_pushed,
                    acks = report.acks_delivered,
                    assets = report.asset_changes,
                    conflicts = report.new_conflicts,
                    server_time = %report.server_time,
                    "Sync cycle completed in {:?}",
                    report.duration
                );
                self.stats.write().record_success(&report);
                Ok(report)
            }
            Err(error) => {
                tracing::warn!("Sync cycle failed: {}", error);
                self.stats.write().record_failure(&error);
                Err(error)
            }
        }
    }

    async fn execute(&self) -> Result<SyncReport> {
        let started = Instant::now();
        let pending = self.mirror.pending_state()?;
        let synced_event_ids = pending.event_ids();
        let delivered_ack_ids = pending.ack_ids();

        tracing::info!(
            events = synced_event_ids.len(),
            acks = delivered_ack_ids.len(),
            cursor = pending.last_sync_at.as_deref().unwrap_or("none"),
            "Starting sync cycle"
        );

        let request = SyncRequest::from(pending);
        let response = self.transport.push_pull(&request).await?;

        let report = SyncReport {
            events_pushed: synced_event_ids.len(),
            acks_delivered: delivered_ack_ids.len(),
            accepted_event_ids: response.accepted_scan_event_ids.len(),
            asset_changes: response.asset_changes.len(),
            new_conflicts: response.conflicts.len(),
            server_time: response.server_time.clone(),
            conflict_strategy: response.conflict_strategy.clone(),
            duration: started.elapsed(),
        };

        let outcome = SyncOutcome {
            synced_event_ids,
            delivered_ack_ids,
            asset_changes: response.asset_changes,
            conflicts: response.conflicts,
            server_time: response.server_time,
        };
        self.mirror.apply_sync_outcome(&outcome)?;

        Ok(report)
    }
}

/// Holds the engine in `Syncing`; back to `Idle` on drop, including when the
/// cycle future is cancelled.
struct SyncingGuard<'a> {
    state: &'a RwLock<SyncState>,
}

impl<'a> SyncingGuard<'a> {
    fn enter(state: &'a RwLock<SyncState>) -> Self {
        *state.write() = SyncState::Syncing;
        Self { state }
    }
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        *self.state.write() = SyncState::Idle;
    }
}
