//! Data models for the Assetra sync client

mod asset;
mod conflict;
mod scan_event;

pub use asset::{Asset, FieldMap, FieldValue};
pub use conflict::{default_conflict_id, ConflictAcknowledgement, ConflictRecord, Resolution};
pub use scan_event::{new_client_event_id, ScanEvent};
