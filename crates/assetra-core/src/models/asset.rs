//! Asset model: an opaque, server-defined field bag keyed by `id`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered map of asset field names to values.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A dynamically typed asset field value.
///
/// Mirrors the JSON value space so that server payloads round-trip without
/// loss while still being matched on explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    /// Integers above `i64::MAX`.
    UInteger(u64),
    Float(f64),
    Text(String),
    List(Vec<FieldValue>),
    Map(FieldMap),
}

impl FieldValue {
    /// Borrow the value as text when it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Render the value as plain text: strings verbatim, scalars in their
    /// JSON spelling, `null` as the empty string.
    pub fn to_plain_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(value) => value.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::UInteger(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
            Self::List(_) | Self::Map(_) => {
                let rendered = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                write!(f, "{rendered}")
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::UInteger(value), Self::Integer)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A known asset as last delivered by the server (or optimistically patched).
///
/// Serializes as the flat field map, `id` included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldMap", into = "FieldMap")]
pub struct Asset {
    id: String,
    fields: FieldMap,
}

impl Asset {
    /// Build an asset from a server field bag.
    ///
    /// Returns `None` when the bag has no usable `id` (missing, blank, or not
    /// a string/integer).
    pub fn from_fields(fields: FieldMap) -> Option<Self> {
        let id = match fields.get("id")? {
            FieldValue::Text(id) => {
                let id = id.trim();
                if id.is_empty() {
                    return None;
                }
                id.to_string()
            }
            FieldValue::Integer(id) => id.to_string(),
            FieldValue::UInteger(id) => id.to_string(),
            _ => return None,
        };
        Some(Self { id, fields })
    }

    /// A record carrying nothing but its id.
    #[must_use]
    pub fn placeholder(id: impl Into<String>) -> Self {
        let id = id.into();
        let mut fields = FieldMap::new();
        fields.insert("id".to_string(), FieldValue::Text(id.clone()));
        Self { id, fields }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Overwrite a single field. The record's key is not affected.
    pub fn set_field(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }
}

impl TryFrom<FieldMap> for Asset {
    type Error = String;

    fn try_from(fields: FieldMap) -> Result<Self, Self::Error> {
        Self::from_fields(fields).ok_or_else(|| "asset is missing a usable id".to_string())
    }
}

impl From<Asset> for FieldMap {
    fn from(asset: Asset) -> Self {
        asset.fields
    }
}
