//! Error types for assetra-core

use thiserror::Error;

use crate::auth::AuthError;

/// Result type alias using assetra-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in assetra-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local mirror storage error
    #[error("Local mirror error: {0}")]
    Store(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport error (connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Sync API error: {message} ({status})")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },

    /// Request still unauthorized after the single token refresh
    #[error("Sync request unauthorized after token refresh")]
    Unauthorized,

    /// Token acquisition or refresh failed
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Server response could not be interpreted
    #[error("Malformed sync response: {0}")]
    MalformedResponse(String),

    /// A sync cycle is already running and the caller asked not to wait
    #[error("A sync cycle is already in progress")]
    SyncInProgress,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Returns true when the failure came from the network boundary
    /// rather than from local state.
    pub const fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::Api { .. }
                | Self::Unauthorized
                | Self::Auth(_)
                | Self::MalformedResponse(_)
        )
    }
}
