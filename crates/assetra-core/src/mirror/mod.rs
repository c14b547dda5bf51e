//! Local mirror: the device-side record of everything the sync protocol needs.
//!
//! The mirror owns unsynchronized scan events, known assets, open conflicts,
//! pending conflict acknowledgements and the sync cursor. It knows nothing
//! about the network or the UI.
//!
//! Every implementation serializes its mutations behind a single lock (or
//! transaction) per instance, so a resolution and a sync apply never
//! interleave. No operation suspends.

mod memory;
mod migrations;
mod sqlite;

pub use memory::MemoryMirror;
pub use sqlite::SqliteMirror;

use crate::models::{Asset, ConflictAcknowledgement, ConflictRecord, FieldMap, ScanEvent};
use crate::Result;

/// Store capability set shared by every mirror implementation.
pub trait LocalMirror: Send + Sync {
    /// Unsynced events in capture order.
    fn pending_scan_events(&self) -> Result<Vec<ScanEvent>>;

    /// The full append-only event log, synced events included.
    fn scan_events(&self) -> Result<Vec<ScanEvent>>;

    /// Append a captured event.
    ///
    /// Returns `false` without touching the store when an event with the same
    /// `client_event_id` already exists.
    fn add_local_scan_event(&self, event: ScanEvent) -> Result<bool>;

    /// Flag events as delivered. Unknown ids are ignored.
    fn mark_synced(&self, client_event_ids: &[String]) -> Result<()>;

    /// Replace assets wholesale by id. Bags without a usable id are skipped.
    ///
    /// Returns the number of assets written.
    fn upsert_assets(&self, changes: &[FieldMap]) -> Result<usize>;

    /// Known assets ordered by id.
    fn assets(&self) -> Result<Vec<Asset>>;

    fn asset(&self, id: &str) -> Result<Option<Asset>>;

    /// Append server-reported conflicts. No deduplication by id.
    fn save_conflicts(&self, conflicts: &[ConflictRecord]) -> Result<()>;

    /// Open conflicts in arrival order.
    fn pending_conflicts(&self) -> Result<Vec<ConflictRecord>>;

    /// Record a user decision; see [`crate::conflict`].
    ///
    /// Atomic: the conflict disappears and its acknowledgement appears in the
    /// same critical section. When the id is unknown and an acknowledgement for
    /// it is already pending, that acknowledgement is returned unchanged.
    fn resolve_conflict(
        &self,
        conflict_id: &str,
        use_server_value: bool,
    ) -> Result<ConflictAcknowledgement>;

    fn pending_conflict_acks(&self) -> Result<Vec<ConflictAcknowledgement>>;

    /// Drop delivered acknowledgements. Unknown ids are ignored.
    fn mark_conflict_acks_synced(&self, conflict_ids: &[String]) -> Result<()>;

    fn save_last_sync_at(&self, value: &str) -> Result<()>;

    fn last_sync_at(&self) -> Result<Option<String>>;

    /// Consistent read of everything a sync cycle sends.
    fn pending_state(&self) -> Result<PendingState>;

    /// Apply a successful sync response in one critical section, in protocol
    /// order: mark events synced, drop delivered acknowledgements, upsert
    /// assets, save new conflicts, advance the cursor.
    fn apply_sync_outcome(&self, outcome: &SyncOutcome) -> Result<()>;
}

/// Snapshot of the state pushed by one sync cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingState {
    pub scan_events: Vec<ScanEvent>,
    pub conflict_acks: Vec<ConflictAcknowledgement>,
    pub last_sync_at: Option<String>,
}

impl PendingState {
    pub fn event_ids(&self) -> Vec<String> {
        self.scan_events
            .iter()
            .map(|event| event.client_event_id.clone())
            .collect()
    }

    pub fn ack_ids(&self) -> Vec<String> {
        self.conflict_acks
            .iter()
            .map(|ack| ack.conflict_id.clone())
            .collect()
    }
}

/// Everything a successful cycle writes back to the mirror.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncOutcome {
    /// Ids of the events that were pushed
    pub synced_event_ids: Vec<String>,
    /// Conflict ids of the acknowledgements that were pushed
    pub delivered_ack_ids: Vec<String>,
    pub asset_changes: Vec<FieldMap>,
    pub conflicts: Vec<ConflictRecord>,
    /// New cursor, taken verbatim from the server
    pub server_time: String,
}
