#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use assetra_core::models::FieldMap;
use assetra_core::transport::DEFAULT_CONFLICT_STRATEGY;
use assetra_core::{ConflictRecord, Error, Result, SyncRequest, SyncResponse, SyncTransport};
use parking_lot::Mutex;
use tokio::sync::Notify;

/// What the scripted server does with the next request.
pub enum Reply {
    Respond(SyncResponse),
    Fail { status: u16, message: String },
}

/// In-process transport that records requests and replays scripted replies.
///
/// When the script runs dry it answers with an empty response whose
/// `server_time` is `server-time-{n}`.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<SyncRequest>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, reply: Reply) {
        self.replies.lock().push_back(reply);
    }

    pub fn respond(&self, response: SyncResponse) {
        self.reply(Reply::Respond(response));
    }

    pub fn fail(&self, status: u16) {
        self.reply(Reply::Fail {
            status,
            message: format!("scripted failure ({status})"),
        });
    }

    /// Hold the next request until `gate` is notified.
    pub fn hold_next(&self, gate: Arc<Notify>) {
        *self.gate.lock() = Some(gate);
    }

    pub fn requests(&self) -> Vec<SyncRequest> {
        self.requests.lock().clone()
    }
}

impl SyncTransport for ScriptedTransport {
    async fn push_pull(&self, request: &SyncRequest) -> Result<SyncResponse> {
        let call = {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            requests.len()
        };

        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let reply = self.replies.lock().pop_front();
        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail { status, message }) => Err(Error::Api { status, message }),
            None => Ok(response(&format!("server-time-{call}"))),
        }
    }
}

/// Empty response carrying only a cursor.
pub fn response(server_time: &str) -> SyncResponse {
    SyncResponse {
        server_time: server_time.to_string(),
        accepted_scan_event_ids: Vec::new(),
        asset_changes: Vec::new(),
        conflicts: Vec::new(),
        conflict_strategy: DEFAULT_CONFLICT_STRATEGY.to_string(),
        acknowledged_conflicts: Vec::new(),
    }
}

pub fn fields(json: serde_json::Value) -> FieldMap {
    serde_json::from_value(json).expect("asset fields")
}

pub fn status_conflict() -> ConflictRecord {
    ConflictRecord::new(
        "A-1",
        "status",
        "in_transit",
        "in_warehouse",
        "2026-02-25T19:00:00Z",
    )
}
