//! assetra-core - Core library for Assetra
//!
//! Offline-first capture and server-authoritative sync for multi-tenant asset
//! tracking: the local mirror, the conflict resolution policy, the sync
//! transport and the engine that ties them together. Used by every Assetra
//! front end (CLI, device shells).

pub mod auth;
pub mod capture;
pub mod config;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod mirror;
pub mod models;
pub mod state;
pub mod transport;
pub mod util;

pub use config::ClientConfig;
pub use engine::SyncEngine;
pub use error::{Error, Result};
pub use mirror::{LocalMirror, MemoryMirror, SqliteMirror};
pub use models::{Asset, ConflictAcknowledgement, ConflictRecord, FieldValue, Resolution, ScanEvent};
pub use state::{SyncReport, SyncState, SyncStats};
pub use transport::{HttpSyncTransport, SyncRequest, SyncResponse, SyncTransport};
