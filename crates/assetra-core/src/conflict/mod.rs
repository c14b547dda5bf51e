//! Conflict resolution policy.
//!
//! Turns a user decision about a [`ConflictRecord`] into the exact set of
//! mirror mutations it implies. The policy is pure: mirrors call
//! [`plan_resolution`] while holding their write lock and then apply the plan.
//!
//! Keeping the local value never goes through a special API. Instead a
//! `conflict_replay` scan event is queued so the next sync cycle re-asserts
//! the value through the ordinary ingestion path, and the local asset copy is
//! patched so the UI reflects the decision until the server answers.

use chrono::{DateTime, Utc};

use crate::models::{
    new_client_event_id, Asset, ConflictAcknowledgement, ConflictRecord, Resolution, ScanEvent,
};

/// Symbology stamped on replay events.
pub const REPLAY_SYMBOLOGY: &str = "conflict_replay";
/// Source type stamped on replay events.
pub const REPLAY_SOURCE_TYPE: &str = "conflict_replay";

/// Mutations implied by one resolution decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionPlan {
    /// Always recorded, even when the conflict is no longer pending
    pub acknowledgement: ConflictAcknowledgement,
    /// Queued only when keeping the local value of a known conflict
    pub replay_event: Option<ScanEvent>,
    /// Optimistic local write, same condition as `replay_event`
    pub asset_patch: Option<AssetPatch>,
}

/// Single-field optimistic write onto the local asset copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPatch {
    pub asset_id: String,
    pub field: String,
    pub value: String,
}

impl AssetPatch {
    /// Apply the patch to the current local copy, creating `{id}` when unseen.
    #[must_use]
    pub fn apply(&self, existing: Option<Asset>) -> Asset {
        let mut asset = existing.unwrap_or_else(|| Asset::placeholder(&self.asset_id));
        asset.set_field(self.field.clone(), self.value.clone());
        asset
    }
}

/// Plan the mutations for resolving `conflict_id`.
///
/// `conflict` is the pending record with that id, if any. Without one the
/// acknowledgement is still produced so the decision reaches the server, but
/// nothing is replayed or patched.
pub fn plan_resolution(
    conflict_id: &str,
    conflict: Option<&ConflictRecord>,
    resolution: Resolution,
    now: DateTime<Utc>,
) -> ResolutionPlan {
    let acknowledgement = ConflictAcknowledgement {
        conflict_id: conflict_id.to_string(),
        resolution,
        resolved_at: now,
    };

    let keep_local = match (resolution, conflict) {
        (Resolution::KeepLocal, Some(conflict)) => Some(conflict),
        _ => None,
    };

    let Some(conflict) = keep_local else {
        return ResolutionPlan {
            acknowledgement,
            replay_event: None,
            asset_patch: None,
        };
    };

    let replay_event = ScanEvent {
        client_event_id: new_client_event_id(),
        symbology: REPLAY_SYMBOLOGY.to_string(),
        raw_value: replay_raw_value(&conflict.asset_id, &conflict.field, &conflict.local_value),
        source_type: REPLAY_SOURCE_TYPE.to_string(),
        captured_at: now,
        synced: false,
    };
    let asset_patch = AssetPatch {
        asset_id: conflict.asset_id.clone(),
        field: conflict.field.clone(),
        value: conflict.local_value.clone(),
    };

    ResolutionPlan {
        acknowledgement,
        replay_event: Some(replay_event),
        asset_patch: Some(asset_patch),
    }
}

/// Encode a kept local value as a replay raw value.
pub fn replay_raw_value(asset_id: &str, field: &str, value: &str) -> String {
    format!("asset={asset_id};field={field};value={value}")
}

/// Decoded content of a replay event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayIntent {
    pub asset_id: String,
    pub field: String,
    pub value: String,
}

/// Decode a replay raw value.
///
/// The value is everything after `value=`, so it may itself contain `;` or
/// `=`. Asset ids and field names must not contain `;`.
pub fn parse_replay_raw_value(raw: &str) -> Option<ReplayIntent> {
    let mut parts = raw.splitn(3, ';');
    let asset_id = parts.next()?.strip_prefix("asset=")?;
    let field = parts.next()?.strip_prefix("field=")?;
    let value = parts.next()?.strip_prefix("value=")?;

    Some(ReplayIntent {
        asset_id: asset_id.to_string(),
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Whether an event was synthesized by a keep-local decision.
pub fn is_replay_event(event: &ScanEvent) -> bool {
    event.symbology == REPLAY_SYMBOLOGY && event.source_type == REPLAY_SOURCE_TYPE
}
