use std::io;

use assetra_core::auth::AuthError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] assetra_core::Error),
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Scan value cannot be empty")]
    EmptyScanValue,
    #[error("Conflict ID cannot be empty")]
    EmptyConflictId,
    #[error("No scans read from stdin")]
    NoScansRead,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Run `assetra config init --api-base-url <URL> --tenant-id <TENANT>`, or set ASSETRA_API_BASE_URL and ASSETRA_TENANT_ID."
    )]
    SyncNotConfigured,
}
