//! Client configuration shared by every Assetra front end.
//!
//! A `ClientConfig` names the backend (API base URL), the tenant every request
//! is scoped to, and an optional request timeout. Values are normalized once
//! on construction so the transport and auth client can format endpoints
//! without re-checking them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

pub const API_BASE_URL_ENV: &str = "ASSETRA_API_BASE_URL";
pub const TENANT_ID_ENV: &str = "ASSETRA_TENANT_ID";
pub const TIMEOUT_SECS_ENV: &str = "ASSETRA_TIMEOUT_SECS";

const SYNC_PATH: &str = "/api/v1/sync/";
const TOKEN_PATH: &str = "/api/v1/auth/token/";
const TOKEN_REFRESH_PATH: &str = "/api/v1/auth/token/refresh/";

/// Backend coordinates for one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL without trailing slash, e.g. `https://assets.example.com`
    pub api_base_url: String,
    /// Value of the `X-Tenant-ID` header
    pub tenant_id: String,
    /// Per-request timeout; `None` waits indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Build a normalized config.
    pub fn new(api_base_url: impl Into<String>, tenant_id: impl Into<String>) -> Result<Self> {
        Self {
            api_base_url: api_base_url.into(),
            tenant_id: tenant_id.into(),
            request_timeout_secs: None,
        }
        .normalized()
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = if secs == 0 { None } else { Some(secs) };
        self
    }

    /// Load from `ASSETRA_API_BASE_URL`, `ASSETRA_TENANT_ID` and the optional
    /// `ASSETRA_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_base_url = normalize_text_option(lookup(API_BASE_URL_ENV))
            .ok_or_else(|| Error::Config(format!("{API_BASE_URL_ENV} is not set")))?;
        let tenant_id = normalize_text_option(lookup(TENANT_ID_ENV))
            .ok_or_else(|| Error::Config(format!("{TENANT_ID_ENV} is not set")))?;

        let config = Self::new(api_base_url, tenant_id)?;
        match normalize_text_option(lookup(TIMEOUT_SECS_ENV)) {
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|_| {
                    Error::Config(format!("{TIMEOUT_SECS_ENV} must be a whole number of seconds"))
                })?;
                Ok(config.with_request_timeout(secs))
            }
            None => Ok(config),
        }
    }

    /// Trim values, require an http(s) base URL and a tenant, drop trailing `/`.
    pub fn normalized(self) -> Result<Self> {
        let api_base_url = normalize_text_option(Some(self.api_base_url))
            .ok_or_else(|| Error::Config("API base URL is required".to_string()))?;
        if !is_http_url(&api_base_url) {
            return Err(Error::Config(
                "API base URL must include http:// or https://".to_string(),
            ));
        }
        let tenant_id = normalize_text_option(Some(self.tenant_id))
            .ok_or_else(|| Error::Config("Tenant id is required".to_string()))?;

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            tenant_id,
            request_timeout_secs: self.request_timeout_secs.filter(|secs| *secs > 0),
        })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn sync_endpoint(&self) -> String {
        format!("{}{SYNC_PATH}", self.api_base_url)
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}{TOKEN_PATH}", self.api_base_url)
    }

    pub fn token_refresh_endpoint(&self) -> String {
        format!("{}{TOKEN_REFRESH_PATH}", self.api_base_url)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn new_normalizes_base_url_and_tenant() {
        let config = ClientConfig::new(" https://assets.example.com/ ", " tenant-a ").unwrap();
        assert_eq!(config.api_base_url, "https://assets.example.com");
        assert_eq!(config.tenant_id, "tenant-a");
        assert_eq!(
            config.sync_endpoint(),
            "https://assets.example.com/api/v1/sync/"
        );
        assert_eq!(
            config.token_refresh_endpoint(),
            "https://assets.example.com/api/v1/auth/token/refresh/"
        );
    }

    #[test]
    fn new_rejects_missing_scheme_or_tenant() {
        assert!(matches!(
            ClientConfig::new("assets.example.com", "t"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ClientConfig::new("https://assets.example.com", "  "),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn lookup_reads_optional_timeout() {
        let vars = HashMap::from([
            (API_BASE_URL_ENV, "http://10.0.2.2:8000"),
            (TENANT_ID_ENV, "tenant-a"),
            (TIMEOUT_SECS_ENV, "15"),
        ]);
        let config =
            ClientConfig::from_lookup(|key| vars.get(key).map(ToString::to_string)).unwrap();
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(15)));

        let vars = HashMap::from([
            (API_BASE_URL_ENV, "http://10.0.2.2:8000"),
            (TENANT_ID_ENV, "tenant-a"),
            (TIMEOUT_SECS_ENV, "soon"),
        ]);
        assert!(ClientConfig::from_lookup(|key| vars.get(key).map(ToString::to_string)).is_err());
    }

    #[test]
    fn zero_timeout_means_none() {
        let config = ClientConfig::new("https://a.example.com", "t")
            .unwrap()
            .with_request_timeout(0);
        assert_eq!(config.request_timeout(), None);
    }
}
