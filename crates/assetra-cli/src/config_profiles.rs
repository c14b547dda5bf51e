//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use assetra_core::config::{API_BASE_URL_ENV, TENANT_ID_ENV, TIMEOUT_SECS_ENV};
use assetra_core::util::normalize_text_option;
use assetra_core::ClientConfig;
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "cli-config.json";
pub const PROFILE_ENV: &str = "ASSETRA_PROFILE";
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
        .map(|dir| dir.join("assetra").join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    normalize_text_option(value.map(ToString::to_string))
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Explicit name, then `ASSETRA_PROFILE`, then the active profile, then `default`.
    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        self.resolve_profile_name_with(explicit, std::env::var(PROFILE_ENV).ok().as_deref())
    }

    pub fn resolve_profile_name_with(&self, explicit: Option<&str>, env: Option<&str>) -> String {
        normalize_profile_name(explicit)
            .or_else(|| normalize_profile_name(env))
            .or_else(|| normalize_profile_name(self.active_profile.as_deref()))
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    /// Backend coordinates for this profile, filling gaps from the environment.
    ///
    /// `None` when the base URL or tenant is missing from both.
    pub fn client_config(&self) -> assetra_core::Result<Option<ClientConfig>> {
        self.client_config_with(|key| std::env::var(key).ok())
    }

    pub fn client_config_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> assetra_core::Result<Option<ClientConfig>> {
        let api_base_url =
            normalize_text_option(self.api_base_url.clone()).or_else(|| lookup(API_BASE_URL_ENV));
        let tenant_id =
            normalize_text_option(self.tenant_id.clone()).or_else(|| lookup(TENANT_ID_ENV));
        let (Some(api_base_url), Some(tenant_id)) = (
            normalize_text_option(api_base_url),
            normalize_text_option(tenant_id),
        ) else {
            return Ok(None);
        };

        let timeout = match self.request_timeout_secs {
            Some(secs) => Some(secs),
            None => normalize_text_option(lookup(TIMEOUT_SECS_ENV))
                .map(|raw| {
                    raw.parse::<u64>().map_err(|_| {
                        assetra_core::Error::Config(format!(
                            "{TIMEOUT_SECS_ENV} must be a whole number of seconds"
                        ))
                    })
                })
                .transpose()?,
        };

        let config = ClientConfig::new(api_base_url, tenant_id)?;
        Ok(Some(match timeout {
            Some(secs) => config.with_request_timeout(secs),
            None => config,
        }))
    }

    fn normalize(&mut self) {
        self.api_base_url = normalize_text_option(self.api_base_url.clone())
            .map(|url| url.trim_end_matches('/').to_string());
        self.tenant_id = normalize_text_option(self.tenant_id.clone());
        if self.request_timeout_secs == Some(0) {
            self.request_timeout_secs = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_profile_name_rejects_empty() {
        assert_eq!(normalize_profile_name(None), None);
        assert_eq!(normalize_profile_name(Some(" ")), None);
        assert_eq!(normalize_profile_name(Some(" work ")).as_deref(), Some("work"));
    }

    #[test]
    fn config_roundtrip_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = CliProfilesConfig {
            version: 1,
            active_profile: Some(" warehouse ".to_string()),
            profiles: BTreeMap::new(),
        };
        config.profiles.insert(
            "warehouse".to_string(),
            CliProfile {
                api_base_url: Some(" https://assets.example.com/ ".to_string()),
                tenant_id: Some(" tenant-a ".to_string()),
                request_timeout_secs: Some(0),
            },
        );

        config.save_to_path(&path).unwrap();
        let loaded = CliProfilesConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.active_profile.as_deref(), Some("warehouse"));
        let profile = loaded.profiles.get("warehouse").unwrap();
        assert_eq!(
            profile.api_base_url.as_deref(),
            Some("https://assets.example.com")
        );
        assert_eq!(profile.tenant_id.as_deref(), Some("tenant-a"));
        assert_eq!(profile.request_timeout_secs, None);
    }

    #[test]
    fn missing_config_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = CliProfilesConfig::load_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, CliProfilesConfig::default());
    }

    #[test]
    fn resolve_profile_name_prefers_explicit_then_env_then_active() {
        let config = CliProfilesConfig {
            version: 1,
            active_profile: Some("work".to_string()),
            profiles: BTreeMap::new(),
        };
        assert_eq!(
            config.resolve_profile_name_with(Some("dock"), Some("env")),
            "dock"
        );
        assert_eq!(config.resolve_profile_name_with(None, Some("env")), "env");
        assert_eq!(config.resolve_profile_name_with(None, Some(" ")), "work");
        assert_eq!(
            CliProfilesConfig::default().resolve_profile_name_with(None, None),
            DEFAULT_PROFILE
        );
    }

    #[test]
    fn client_config_falls_back_to_environment() {
        let profile = CliProfile {
            api_base_url: None,
            tenant_id: Some("tenant-a".to_string()),
            request_timeout_secs: None,
        };
        let config = profile
            .client_config_with(|key| match key {
                API_BASE_URL_ENV => Some("https://env.example.com/".to_string()),
                TIMEOUT_SECS_ENV => Some("15".to_string()),
                _ => None,
            })
            .unwrap()
            .unwrap();
        assert_eq!(config.api_base_url, "https://env.example.com");
        assert_eq!(config.tenant_id, "tenant-a");
        assert_eq!(config.request_timeout_secs, Some(15));
    }

    #[test]
    fn client_config_is_absent_without_tenant() {
        let profile = CliProfile {
            api_base_url: Some("https://assets.example.com".to_string()),
            ..CliProfile::default()
        };
        assert!(profile.client_config_with(|_| None).unwrap().is_none());
    }

    #[test]
    fn client_config_rejects_bad_timeout() {
        let profile = CliProfile {
            api_base_url: Some("https://assets.example.com".to_string()),
            tenant_id: Some("tenant-a".to_string()),
            request_timeout_secs: None,
        };
        let result = profile.client_config_with(|key| {
            (key == TIMEOUT_SECS_ENV).then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }
}
