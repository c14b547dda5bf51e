//! In-memory mirror

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use parking_lot::RwLock;

use super::{LocalMirror, PendingState, SyncOutcome};
use crate::conflict::plan_resolution;
use crate::models::{
    Asset, ConflictAcknowledgement, ConflictRecord, FieldMap, Resolution, ScanEvent,
};
use crate::Result;

#[derive(Debug, Default)]
struct MirrorState {
    events: Vec<ScanEvent>,
    event_ids: HashSet<String>,
    assets: BTreeMap<String, Asset>,
    conflicts: Vec<ConflictRecord>,
    acks: Vec<ConflictAcknowledgement>,
    last_sync_at: Option<String>,
}

impl MirrorState {
    fn push_event(&mut self, event: ScanEvent) -> bool {
        if !self.event_ids.insert(event.client_event_id.clone()) {
            return false;
        }
        self.events.push(event);
        true
    }

    fn mark_synced(&mut self, ids: &[String]) {
        let ids = ids.iter().map(String::as_str).collect::<HashSet<_>>();
        for event in &mut self.events {
            if ids.contains(event.client_event_id.as_str()) {
                event.synced = true;
            }
        }
    }

    fn upsert_assets(&mut self, changes: &[FieldMap]) -> usize {
        let mut written = 0;
        for change in changes {
            let Some(asset) = Asset::from_fields(change.clone()) else {
                tracing::debug!("Skipping asset change without a usable id");
                continue;
            };
            self.assets.insert(asset.id().to_string(), asset);
            written += 1;
        }
        written
    }

    fn mark_acks_synced(&mut self, ids: &[String]) {
        let ids = ids.iter().map(String::as_str).collect::<HashSet<_>>();
        self.acks
            .retain(|ack| !ids.contains(ack.conflict_id.as_str()));
    }

    fn resolve(&mut self, conflict_id: &str, resolution: Resolution) -> ConflictAcknowledgement {
        let conflict = self
            .conflicts
            .iter()
            .find(|conflict| conflict.id == conflict_id)
            .cloned();

        if conflict.is_none() {
            if let Some(existing) = self.acks.iter().find(|ack| ack.conflict_id == conflict_id) {
                return existing.clone();
            }
        }

        let plan = plan_resolution(conflict_id, conflict.as_ref(), resolution, Utc::now());

        if let Some(event) = plan.replay_event {
            self.push_event(event);
        }
        if let Some(patch) = plan.asset_patch {
            let existing = self.assets.remove(&patch.asset_id);
            self.assets
                .insert(patch.asset_id.clone(), patch.apply(existing));
        }

        self.conflicts.retain(|conflict| conflict.id != conflict_id);
        self.acks.retain(|ack| ack.conflict_id != conflict_id);
        self.acks.push(plan.acknowledgement.clone());
        plan.acknowledgement
    }
}

/// Mirror held entirely in memory, guarded by one reader-writer lock.
#[derive(Debug, Default)]
pub struct MemoryMirror {
    state: RwLock<MirrorState>,
}

impl MemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalMirror for MemoryMirror {
    fn pending_scan_events(&self) -> Result<Vec<ScanEvent>> {
        let state = self.state.read();
        Ok(state
            .events
            .iter()
            .filter(|event| !event.synced)
            .cloned()
            .collect())
    }

    fn scan_events(&self) -> Result<Vec<ScanEvent>> {
        Ok(self.state.read().events.clone())
    }

    fn add_local_scan_event(&self, event: ScanEvent) -> Result<bool> {
        let inserted = self.state.write().push_event(event);
        if !inserted {
            tracing::debug!("Ignoring duplicate scan event");
        }
        Ok(inserted)
    }

    fn mark_synced(&self, client_event_ids: &[String]) -> Result<()> {
        self.state.write().mark_synced(client_event_ids);
        Ok(())
    }

    fn upsert_assets(&self, changes: &[FieldMap]) -> Result<usize> {
        Ok(self.state.write().upsert_assets(changes))
    }

    fn assets(&self) -> Result<Vec<Asset>> {
        Ok(self.state.read().assets.values().cloned().collect())
    }

    fn asset(&self, id: &str) -> Result<Option<Asset>> {
        Ok(self.state.read().assets.get(id).cloned())
    }

    fn save_conflicts(&self, conflicts: &[ConflictRecord]) -> Result<()> {
        self.state.write().conflicts.extend_from_slice(conflicts);
        Ok(())
    }

    fn pending_conflicts(&self) -> Result<Vec<ConflictRecord>> {
        Ok(self.state.read().conflicts.clone())
    }

    fn resolve_conflict(
        &self,
        conflict_id: &str,
        use_server_value: bool,
    ) -> Result<ConflictAcknowledgement> {
        let resolution = Resolution::from_use_server_value(use_server_value);
        Ok(self.state.write().resolve(conflict_id, resolution))
    }

    fn pending_conflict_acks(&self) -> Result<Vec<ConflictAcknowledgement>> {
        Ok(self.state.read().acks.clone())
    }

    fn mark_conflict_acks_synced(&self, conflict_ids: &[String]) -> Result<()> {
        self.state.write().mark_acks_synced(conflict_ids);
        Ok(())
    }

    fn save_last_sync_at(&self, value: &str) -> Result<()> {
        self.state.write().last_sync_at = Some(value.to_string());
        Ok(())
    }

    fn last_sync_at(&self) -> Result<Option<String>> {
        Ok(self.state.read().last_sync_at.clone())
    }

    fn pending_state(&self) -> Result<PendingState> {
        let state = self.state.read();
        Ok(PendingState {
            scan_events: state
                .events
                .iter()
                .filter(|event| !event.synced)
                .cloned()
                .collect(),
            conflict_acks: state.acks.clone(),
            last_sync_at: state.last_sync_at.clone(),
        })
    }

    fn apply_sync_outcome(&self, outcome: &SyncOutcome) -> Result<()> {
        let mut state = self.state.write();
        state.mark_synced(&outcome.synced_event_ids);
        state.mark_acks_synced(&outcome.delivered_ack_ids);
        state.upsert_assets(&outcome.asset_changes);
        state.conflicts.extend_from_slice(&outcome.conflicts);
        state.last_sync_at = Some(outcome.server_time.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_event_is_a_no_op() {
        let mirror = MemoryMirror::new();
        let event = ScanEvent::new("qr", "QR-100", "camera");

        assert!(mirror.add_local_scan_event(event.clone()).unwrap());
        assert!(!mirror.add_local_scan_event(event).unwrap());
        assert_eq!(mirror.pending_scan_events().unwrap().len(), 1);
    }

    #[test]
    fn synced_event_id_cannot_be_reused() {
        let mirror = MemoryMirror::new();
        let event = ScanEvent::new("qr", "QR-100", "camera");
        mirror.add_local_scan_event(event.clone()).unwrap();
        mirror
            .mark_synced(&[event.client_event_id.clone()])
            .unwrap();

        assert!(!mirror.add_local_scan_event(event).unwrap());
        assert!(mirror.pending_scan_events().unwrap().is_empty());
        assert_eq!(mirror.scan_events().unwrap().len(), 1);
    }
}
