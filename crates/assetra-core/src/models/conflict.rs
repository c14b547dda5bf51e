//! Conflict records and the acknowledgements that close them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A field where the device and the server disagree, waiting on a user decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Conflict identifier (`{asset_id}:{field}` when the server sends none)
    pub id: String,
    pub asset_id: String,
    pub field: String,
    pub local_value: String,
    pub server_value: String,
    /// Server-side update time, kept verbatim
    pub updated_at: String,
}

impl ConflictRecord {
    /// Create a record with the default `{asset_id}:{field}` id
    #[must_use]
    pub fn new(
        asset_id: impl Into<String>,
        field: impl Into<String>,
        local_value: impl Into<String>,
        server_value: impl Into<String>,
        updated_at: impl Into<String>,
    ) -> Self {
        let asset_id = asset_id.into();
        let field = field.into();
        Self {
            id: default_conflict_id(&asset_id, &field),
            asset_id,
            field,
            local_value: local_value.into(),
            server_value: server_value.into(),
            updated_at: updated_at.into(),
        }
    }
}

/// Id used when the server omits one.
pub fn default_conflict_id(asset_id: &str, field: &str) -> String {
    format!("{asset_id}:{field}")
}

/// The two decisions a user can make about a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Keep what the server delivered
    AcceptServer,
    /// Re-assert the device's value through a replay event
    KeepLocal,
}

impl Resolution {
    pub const fn from_use_server_value(use_server_value: bool) -> Self {
        if use_server_value {
            Self::AcceptServer
        } else {
            Self::KeepLocal
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AcceptServer => "accept_server",
            Self::KeepLocal => "keep_local",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "accept_server" => Ok(Self::AcceptServer),
            "keep_local" => Ok(Self::KeepLocal),
            other => Err(format!("unknown conflict resolution '{other}'")),
        }
    }
}

/// Proof that a user decided a conflict; delivered on the next sync cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictAcknowledgement {
    pub conflict_id: String,
    pub resolution: Resolution,
    pub resolved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_uses_default_id() {
        let record = ConflictRecord::new("A-1", "status", "in_transit", "in_warehouse", "");
        assert_eq!(record.id, "A-1:status");
    }

    #[test]
    fn resolution_wire_names() {
        assert_eq!(
            serde_json::to_string(&Resolution::KeepLocal).unwrap(),
            "\"keep_local\""
        );
        assert_eq!(
            "accept_server".parse::<Resolution>().unwrap(),
            Resolution::AcceptServer
        );
        assert!("server_wins".parse::<Resolution>().is_err());
        assert_eq!(
            Resolution::from_use_server_value(false),
            Resolution::KeepLocal
        );
    }
}
