//! Sync transport: one push-then-pull round trip against the server.
//!
//! The transport turns pending local state into a wire request and a wire
//! response back into plain values. It never touches the mirror.

mod http;

pub use http::HttpSyncTransport;

use serde::{Deserialize, Serialize};

use crate::mirror::PendingState;
use crate::models::{
    default_conflict_id, ConflictAcknowledgement, ConflictRecord, FieldMap, FieldValue,
    Resolution, ScanEvent,
};
use crate::util::format_timestamp;
use crate::{Error, Result};

/// Strategy reported when the server does not name one.
pub const DEFAULT_CONFLICT_STRATEGY: &str = "last-write-wins";

/// Network layer of a sync cycle.
#[allow(async_fn_in_trait)]
pub trait SyncTransport: Send + Sync {
    /// Push pending events and acknowledgements, pull changes since the cursor.
    async fn push_pull(&self, request: &SyncRequest) -> Result<SyncResponse>;
}

/// Everything one cycle sends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncRequest {
    pub last_sync_at: Option<String>,
    pub scan_events: Vec<ScanEvent>,
    pub conflict_acks: Vec<ConflictAcknowledgement>,
}

impl From<PendingState> for SyncRequest {
    fn from(state: PendingState) -> Self {
        Self {
            last_sync_at: state.last_sync_at,
            scan_events: state.scan_events,
            conflict_acks: state.conflict_acks,
        }
    }
}

impl SyncRequest {
    /// Wire body as a JSON value.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.wire())?)
    }

    /// Wire body as bytes, ready to send (and resend) unchanged.
    pub fn to_body(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.wire())?)
    }

    fn wire(&self) -> WireRequest<'_> {
        WireRequest {
            last_sync_at: self.last_sync_at.as_deref(),
            scan_events: self
                .scan_events
                .iter()
                .map(|event| WireScanEvent {
                    client_event_id: &event.client_event_id,
                    symbology: &event.symbology,
                    raw_value: &event.raw_value,
                    source_type: &event.source_type,
                    captured_at: format_timestamp(&event.captured_at),
                })
                .collect(),
            conflict_acknowledgements: self
                .conflict_acks
                .iter()
                .map(|ack| WireAck {
                    conflict_id: &ack.conflict_id,
                    resolution: ack.resolution,
                    resolved_at: format_timestamp(&ack.resolved_at),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    last_sync_at: Option<&'a str>,
    scan_events: Vec<WireScanEvent<'a>>,
    conflict_acknowledgements: Vec<WireAck<'a>>,
}

#[derive(Debug, Serialize)]
struct WireScanEvent<'a> {
    client_event_id: &'a str,
    symbology: &'a str,
    raw_value: &'a str,
    source_type: &'a str,
    captured_at: String,
}

#[derive(Debug, Serialize)]
struct WireAck<'a> {
    conflict_id: &'a str,
    resolution: Resolution,
    resolved_at: String,
}

/// Everything one cycle receives.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncResponse {
    /// Next cursor, verbatim
    pub server_time: String,
    /// Server-side ids of ingested events; informational only
    pub accepted_scan_event_ids: Vec<String>,
    pub asset_changes: Vec<FieldMap>,
    pub conflicts: Vec<ConflictRecord>,
    pub conflict_strategy: String,
    pub acknowledged_conflicts: Vec<String>,
}

impl SyncResponse {
    /// Parse a response body.
    ///
    /// The body must be a JSON object with a non-empty `server_time`. Inside
    /// the lists, entries that are not objects are skipped with a warning and
    /// conflict fields that are missing read as empty strings.
    pub fn from_json(body: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| Error::MalformedResponse(format!("invalid JSON: {e}")))?;
        if !value.is_object() {
            return Err(Error::MalformedResponse(
                "expected a JSON object".to_string(),
            ));
        }

        let raw: RawSyncResponse = serde_json::from_value(value)
            .map_err(|e| Error::MalformedResponse(e.to_string()))?;

        let server_time = raw
            .server_time
            .as_ref()
            .map(FieldValue::to_plain_string)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| Error::MalformedResponse("missing server_time".to_string()))?;

        let asset_changes = raw
            .asset_changes
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<FieldMap>(entry) {
                Ok(fields) => Some(fields),
                Err(error) => {
                    tracing::warn!("Skipping malformed asset change: {}", error);
                    None
                }
            })
            .collect();

        let conflicts = raw
            .conflicts
            .unwrap_or_default()
            .into_iter()
            .filter_map(parse_conflict)
            .collect();

        let conflict_strategy = raw
            .conflict_strategy
            .map(|value| value.to_plain_string().trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_CONFLICT_STRATEGY.to_string());

        Ok(Self {
            server_time,
            accepted_scan_event_ids: ids_to_strings(raw.accepted_scan_event_ids),
            asset_changes,
            conflicts,
            conflict_strategy,
            acknowledged_conflicts: ids_to_strings(raw.acknowledged_conflicts),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawSyncResponse {
    #[serde(default)]
    server_time: Option<FieldValue>,
    #[serde(default)]
    accepted_scan_event_ids: Option<Vec<FieldValue>>,
    #[serde(default)]
    asset_changes: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    conflicts: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    conflict_strategy: Option<FieldValue>,
    #[serde(default)]
    acknowledged_conflicts: Option<Vec<FieldValue>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConflict {
    id: Option<FieldValue>,
    asset_id: Option<FieldValue>,
    field: Option<FieldValue>,
    local_value: Option<FieldValue>,
    server_value: Option<FieldValue>,
    updated_at: Option<FieldValue>,
}

fn plain(value: Option<&FieldValue>) -> String {
    value.map(FieldValue::to_plain_string).unwrap_or_default()
}

fn parse_conflict(entry: serde_json::Value) -> Option<ConflictRecord> {
    if !entry.is_object() {
        tracing::warn!("Skipping conflict entry that is not an object");
        return None;
    }
    let raw: RawConflict = match serde_json::from_value(entry) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!("Skipping malformed conflict entry: {}", error);
            return None;
        }
    };

    let asset_id = plain(raw.asset_id.as_ref());
    let field = plain(raw.field.as_ref());
    let id = Some(plain(raw.id.as_ref()))
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| default_conflict_id(&asset_id, &field));

    Some(ConflictRecord {
        id,
        asset_id,
        field,
        local_value: plain(raw.local_value.as_ref()),
        server_value: plain(raw.server_value.as_ref()),
        updated_at: plain(raw.updated_at.as_ref()),
    })
}

fn ids_to_strings(ids: Option<Vec<FieldValue>>) -> Vec<String> {
    ids.unwrap_or_default()
        .iter()
        .filter(|id| !id.is_null())
        .map(FieldValue::to_plain_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn request_uses_snake_case_wire_names() {
        let captured = Utc.with_ymd_and_hms(2026, 2, 25, 19, 0, 0).unwrap();
        let mut event = ScanEvent::captured_at("qr", "QR-100", "camera", captured);
        event.client_event_id = "evt-1".to_string();
        let request = SyncRequest {
            last_sync_at: None,
            scan_events: vec![event],
            conflict_acks: vec![ConflictAcknowledgement {
                conflict_id: "A-1:status".to_string(),
                resolution: Resolution::KeepLocal,
                resolved_at: captured,
            }],
        };

        assert_eq!(
            request.to_json().unwrap(),
            json!({
                "scan_events": [{
                    "client_event_id": "evt-1",
                    "symbology": "qr",
                    "raw_value": "QR-100",
                    "source_type": "camera",
                    "captured_at": "2026-02-25T19:00:00Z"
                }],
                "conflict_acknowledgements": [{
                    "conflict_id": "A-1:status",
                    "resolution": "keep_local",
                    "resolved_at": "2026-02-25T19:00:00Z"
                }]
            })
        );
    }

    #[test]
    fn request_includes_cursor_when_present() {
        let request = SyncRequest {
            last_sync_at: Some("2026-02-25T18:00:00Z".to_string()),
            ..SyncRequest::default()
        };
        let body = request.to_json().unwrap();
        assert_eq!(body["last_sync_at"], "2026-02-25T18:00:00Z");
        assert_eq!(body["scan_events"], json!([]));
    }

    #[test]
    fn response_accepts_numeric_and_text_ids() {
        let response = SyncResponse::from_json(
            r#"{
                "server_time": "2026-02-25T19:05:00Z",
                "accepted_scan_event_ids": [17, "evt-2"],
                "asset_changes": [{"id": "A-1", "status": "in_warehouse"}],
                "conflicts": [],
                "conflict_strategy": "server-wins"
            }"#,
        )
        .unwrap();

        assert_eq!(response.server_time, "2026-02-25T19:05:00Z");
        assert_eq!(response.accepted_scan_event_ids, vec!["17", "evt-2"]);
        assert_eq!(response.asset_changes.len(), 1);
        assert_eq!(response.conflict_strategy, "server-wins");
        assert!(response.acknowledged_conflicts.is_empty());
    }

    #[test]
    fn response_defaults_strategy_and_lists() {
        let response = SyncResponse::from_json(r#"{"server_time": "t1", "conflicts": null}"#).unwrap();
        assert_eq!(response.conflict_strategy, DEFAULT_CONFLICT_STRATEGY);
        assert!(response.conflicts.is_empty());
        assert!(response.asset_changes.is_empty());
    }

    #[test]
    fn malformed_conflicts_are_tolerated() {
        let response = SyncResponse::from_json(
            r#"{
                "server_time": "t1",
                "conflicts": [
                    {"asset_id": "A-1", "field": "status", "local_value": "x", "server_value": 3},
                    "garbage",
                    {"id": "c-9", "asset_id": "A-2"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(
            response.conflicts,
            vec![
                ConflictRecord {
                    id: "A-1:status".to_string(),
                    asset_id: "A-1".to_string(),
                    field: "status".to_string(),
                    local_value: "x".to_string(),
                    server_value: "3".to_string(),
                    updated_at: String::new(),
                },
                ConflictRecord {
                    id: "c-9".to_string(),
                    asset_id: "A-2".to_string(),
                    field: String::new(),
                    local_value: String::new(),
                    server_value: String::new(),
                    updated_at: String::new(),
                },
            ]
        );
    }

    #[test]
    fn response_without_server_time_is_rejected() {
        for body in [r#"{"conflicts": []}"#, r#"{"server_time": "  "}"#, "[]", "not json"] {
            assert!(
                matches!(SyncResponse::from_json(body), Err(Error::MalformedResponse(_))),
                "{body}"
            );
        }
    }
}
