//! Scan event model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single offline capture waiting to be delivered to the server.
///
/// `client_event_id` is the idempotency key the server deduplicates on, so it
/// is generated once on the device and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    /// Client-generated, globally unique identifier
    pub client_event_id: String,
    /// Barcode symbology (`qr`, `ean13`, `epc`, ...)
    pub symbology: String,
    /// Decoded payload
    pub raw_value: String,
    /// Capture channel (`camera`, `rfid`, `enterprise_scanner`, ...)
    pub source_type: String,
    /// Capture time on the device
    pub captured_at: DateTime<Utc>,
    /// Flipped to true once a sync cycle delivered the event
    pub synced: bool,
}

impl ScanEvent {
    /// Create a new unsynced event with a fresh id, captured now
    #[must_use]
    pub fn new(
        symbology: impl Into<String>,
        raw_value: impl Into<String>,
        source_type: impl Into<String>,
    ) -> Self {
        Self::captured_at(symbology, raw_value, source_type, Utc::now())
    }

    /// Create a new unsynced event with a fresh id and explicit capture time
    #[must_use]
    pub fn captured_at(
        symbology: impl Into<String>,
        raw_value: impl Into<String>,
        source_type: impl Into<String>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            client_event_id: new_client_event_id(),
            symbology: symbology.into(),
            raw_value: raw_value.into(),
            source_type: source_type.into(),
            captured_at,
            synced: false,
        }
    }
}

/// Generate a client event id (UUID v7, time-sortable).
#[must_use]
pub fn new_client_event_id() -> String {
    Uuid::now_v7().to_string()
}
