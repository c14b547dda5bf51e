//! Behaviour every `LocalMirror` implementation must share.

mod common;

use assetra_core::conflict::parse_replay_raw_value;
use assetra_core::mirror::{LocalMirror, MemoryMirror, SqliteMirror, SyncOutcome};
use assetra_core::{FieldValue, Resolution, ScanEvent};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{fields, status_conflict};

fn idempotent_capture(mirror: &impl LocalMirror) {
    let event = ScanEvent::new("qr", "QR-100", "camera");

    assert!(mirror.add_local_scan_event(event.clone()).unwrap());
    assert!(!mirror.add_local_scan_event(event.clone()).unwrap());

    let pending = mirror.pending_scan_events().unwrap();
    assert_eq!(pending, vec![event]);
}

fn pending_events_keep_capture_order(mirror: &impl LocalMirror) {
    let events: Vec<_> = (0..5)
        .map(|n| ScanEvent::new("qr", format!("QR-{n}"), "camera"))
        .collect();
    for event in &events {
        mirror.add_local_scan_event(event.clone()).unwrap();
    }

    mirror
        .mark_synced(&[
            events[1].client_event_id.clone(),
            "never-captured".to_string(),
        ])
        .unwrap();

    let pending: Vec<_> = mirror
        .pending_scan_events()
        .unwrap()
        .into_iter()
        .map(|event| event.raw_value)
        .collect();
    assert_eq!(pending, vec!["QR-0", "QR-2", "QR-3", "QR-4"]);

    let log = mirror.scan_events().unwrap();
    assert_eq!(log.len(), 5);
    assert!(log[1].synced);
}

fn upsert_replaces_whole_records(mirror: &impl LocalMirror) {
    let written = mirror
        .upsert_assets(&[
            fields(json!({"id": "A-1", "status": "in_transit", "site": "north"})),
            fields(json!({"name": "no id here"})),
            fields(json!({"id": "  "})),
        ])
        .unwrap();
    assert_eq!(written, 1);

    mirror
        .upsert_assets(&[fields(json!({"id": "A-1", "status": "in_warehouse"}))])
        .unwrap();

    let asset = mirror.asset("A-1").unwrap().unwrap();
    assert_eq!(asset.get("status"), Some(&FieldValue::from("in_warehouse")));
    assert_eq!(asset.get("site"), None);
    assert_eq!(mirror.assets().unwrap().len(), 1);
}

fn asset_values_survive_storage(mirror: &impl LocalMirror) {
    let change = fields(json!({
        "id": 42,
        "count": 3,
        "rfid_serial": u64::MAX,
        "ratio": 0.25,
        "active": false,
        "retired_at": null,
        "tags": ["pump", "north"],
        "location": {"site": "north", "bay": 7}
    }));
    mirror.upsert_assets(&[change.clone()]).unwrap();

    let stored = mirror.asset("42").unwrap().unwrap();
    assert_eq!(stored.fields(), &change);
    assert_eq!(stored.get("rfid_serial"), Some(&FieldValue::UInteger(u64::MAX)));
    assert_eq!(
        serde_json::to_value(&stored).unwrap()["rfid_serial"],
        json!(u64::MAX)
    );
}

fn keep_local_replays_and_patches(mirror: &impl LocalMirror) {
    mirror
        .upsert_assets(&[fields(json!({"id": "A-1", "status": "in_warehouse", "site": "north"}))])
        .unwrap();
    mirror.save_conflicts(&[status_conflict()]).unwrap();

    let ack = mirror.resolve_conflict("A-1:status", false).unwrap();
    assert_eq!(ack.conflict_id, "A-1:status");
    assert_eq!(ack.resolution, Resolution::KeepLocal);

    let pending = mirror.pending_scan_events().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].symbology, "conflict_replay");
    assert_eq!(pending[0].source_type, "conflict_replay");
    assert_eq!(
        pending[0].raw_value,
        "asset=A-1;field=status;value=in_transit"
    );
    let intent = parse_replay_raw_value(&pending[0].raw_value).unwrap();
    assert_eq!(intent.value, "in_transit");

    let asset = mirror.asset("A-1").unwrap().unwrap();
    assert_eq!(asset.get("status"), Some(&FieldValue::from("in_transit")));
    assert_eq!(asset.get("site"), Some(&FieldValue::from("north")));

    assert!(mirror.pending_conflicts().unwrap().is_empty());
    assert_eq!(mirror.pending_conflict_acks().unwrap(), vec![ack]);
}

fn keep_local_creates_unseen_asset(mirror: &impl LocalMirror) {
    mirror.save_conflicts(&[status_conflict()]).unwrap();
    mirror.resolve_conflict("A-1:status", false).unwrap();

    let asset = mirror.asset("A-1").unwrap().unwrap();
    assert_eq!(asset.fields().len(), 2);
    assert_eq!(asset.get("status"), Some(&FieldValue::from("in_transit")));
}

fn accept_server_only_acknowledges(mirror: &impl LocalMirror) {
    mirror
        .upsert_assets(&[fields(json!({"id": "A-1", "status": "in_warehouse"}))])
        .unwrap();
    mirror.save_conflicts(&[status_conflict()]).unwrap();

    let ack = mirror.resolve_conflict("A-1:status", true).unwrap();
    assert_eq!(ack.resolution, Resolution::AcceptServer);

    assert!(mirror.pending_scan_events().unwrap().is_empty());
    let asset = mirror.asset("A-1").unwrap().unwrap();
    assert_eq!(asset.get("status"), Some(&FieldValue::from("in_warehouse")));
    assert!(mirror.pending_conflicts().unwrap().is_empty());
    assert_eq!(mirror.pending_conflict_acks().unwrap().len(), 1);
}

fn unknown_conflict_is_acknowledged_without_replay(mirror: &impl LocalMirror) {
    let ack = mirror.resolve_conflict("ghost", false).unwrap();
    assert_eq!(ack.conflict_id, "ghost");
    assert_eq!(ack.resolution, Resolution::KeepLocal);
    assert!(mirror.pending_scan_events().unwrap().is_empty());
    assert!(mirror.assets().unwrap().is_empty());
    assert_eq!(mirror.pending_conflict_acks().unwrap(), vec![ack]);
}

fn at_most_one_ack_per_conflict(mirror: &impl LocalMirror) {
    mirror
        .save_conflicts(&[status_conflict(), status_conflict()])
        .unwrap();
    assert_eq!(mirror.pending_conflicts().unwrap().len(), 2);

    let first = mirror.resolve_conflict("A-1:status", false).unwrap();
    assert!(mirror.pending_conflicts().unwrap().is_empty());

    let second = mirror.resolve_conflict("A-1:status", true).unwrap();
    assert_eq!(second, first);
    assert_eq!(mirror.pending_conflict_acks().unwrap(), vec![first]);
    assert_eq!(mirror.pending_scan_events().unwrap().len(), 1);
}

fn delivered_acks_are_dropped(mirror: &impl LocalMirror) {
    mirror
        .save_conflicts(&[
            status_conflict(),
            assetra_core::ConflictRecord::new("A-2", "site", "north", "south", ""),
        ])
        .unwrap();
    mirror.resolve_conflict("A-1:status", true).unwrap();
    mirror.resolve_conflict("A-2:site", true).unwrap();

    mirror
        .mark_conflict_acks_synced(&["A-1:status".to_string(), "nope".to_string()])
        .unwrap();

    let remaining: Vec<_> = mirror
        .pending_conflict_acks()
        .unwrap()
        .into_iter()
        .map(|ack| ack.conflict_id)
        .collect();
    assert_eq!(remaining, vec!["A-2:site"]);
}

fn cursor_is_stored_verbatim(mirror: &impl LocalMirror) {
    assert_eq!(mirror.last_sync_at().unwrap(), None);
    mirror.save_last_sync_at("2026-02-25T19:05:00Z").unwrap();
    mirror.save_last_sync_at("2026-02-25T18:00:00Z").unwrap();
    assert_eq!(
        mirror.last_sync_at().unwrap().as_deref(),
        Some("2026-02-25T18:00:00Z")
    );
}

fn pending_state_is_a_snapshot(mirror: &impl LocalMirror) {
    let event = ScanEvent::new("ean13", "4006381333931", "camera");
    mirror.add_local_scan_event(event.clone()).unwrap();
    let ack = mirror.resolve_conflict("A-9:owner", true).unwrap();
    mirror.save_last_sync_at("t0").unwrap();

    let state = mirror.pending_state().unwrap();
    assert_eq!(state.scan_events, vec![event.clone()]);
    assert_eq!(state.conflict_acks, vec![ack]);
    assert_eq!(state.last_sync_at.as_deref(), Some("t0"));
    assert_eq!(state.event_ids(), vec![event.client_event_id]);
    assert_eq!(state.ack_ids(), vec!["A-9:owner"]);
}

fn sync_outcome_applies_in_protocol_order(mirror: &impl LocalMirror) {
    let event = ScanEvent::new("qr", "QR-1", "camera");
    mirror.add_local_scan_event(event.clone()).unwrap();
    mirror.save_conflicts(&[status_conflict()]).unwrap();
    mirror.resolve_conflict("A-1:status", true).unwrap();

    // The server re-raises the same conflict in the same response that
    // receives its acknowledgement: the new conflict must survive.
    let outcome = SyncOutcome {
        synced_event_ids: vec![event.client_event_id.clone()],
        delivered_ack_ids: vec!["A-1:status".to_string()],
        asset_changes: vec![fields(json!({"id": "A-1", "status": "in_warehouse"}))],
        conflicts: vec![status_conflict()],
        server_time: "2026-02-25T19:05:00Z".to_string(),
    };
    mirror.apply_sync_outcome(&outcome).unwrap();

    assert!(mirror.pending_scan_events().unwrap().is_empty());
    assert!(mirror.pending_conflict_acks().unwrap().is_empty());
    assert_eq!(mirror.pending_conflicts().unwrap(), vec![status_conflict()]);
    assert!(mirror.asset("A-1").unwrap().is_some());
    assert_eq!(
        mirror.last_sync_at().unwrap().as_deref(),
        Some("2026-02-25T19:05:00Z")
    );
}

macro_rules! mirror_conformance {
    ($module:ident, $factory:expr) => {
        mod $module {
            use super::*;

            #[test]
            fn idempotent_capture() {
                super::idempotent_capture(&$factory);
            }

            #[test]
            fn pending_events_keep_capture_order() {
                super::pending_events_keep_capture_order(&$factory);
            }

            #[test]
            fn upsert_replaces_whole_records() {
                super::upsert_replaces_whole_records(&$factory);
            }

            #[test]
            fn asset_values_survive_storage() {
                super::asset_values_survive_storage(&$factory);
            }

            #[test]
            fn keep_local_replays_and_patches() {
                super::keep_local_replays_and_patches(&$factory);
            }

            #[test]
            fn keep_local_creates_unseen_asset() {
                super::keep_local_creates_unseen_asset(&$factory);
            }

            #[test]
            fn accept_server_only_acknowledges() {
                super::accept_server_only_acknowledges(&$factory);
            }

            #[test]
            fn unknown_conflict_is_acknowledged_without_replay() {
                super::unknown_conflict_is_acknowledged_without_replay(&$factory);
            }

            #[test]
            fn at_most_one_ack_per_conflict() {
                super::at_most_one_ack_per_conflict(&$factory);
            }

            #[test]
            fn delivered_acks_are_dropped() {
                super::delivered_acks_are_dropped(&$factory);
            }

            #[test]
            fn cursor_is_stored_verbatim() {
                super::cursor_is_stored_verbatim(&$factory);
            }

            #[test]
            fn pending_state_is_a_snapshot() {
                super::pending_state_is_a_snapshot(&$factory);
            }

            #[test]
            fn sync_outcome_applies_in_protocol_order() {
                super::sync_outcome_applies_in_protocol_order(&$factory);
            }
        }
    };
}

mirror_conformance!(memory, MemoryMirror::new());
mirror_conformance!(sqlite, SqliteMirror::open_in_memory().unwrap());
