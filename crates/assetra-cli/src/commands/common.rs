use std::env;
use std::path::{Path, PathBuf};

use assetra_core::util::format_timestamp;
use assetra_core::{Asset, ClientConfig, ConflictRecord, ScanEvent, SqliteMirror};

use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub const DB_PATH_ENV: &str = "ASSETRA_DB_PATH";

/// Profile name plus its stored settings (empty when never configured).
pub struct ResolvedProfile {
    pub name: String,
    pub profile: CliProfile,
    pub configured: bool,
}

pub fn load_profile(explicit: Option<&str>) -> Result<ResolvedProfile, CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let name = config.resolve_profile_name(explicit);
    let stored = config.profile(&name).cloned();
    Ok(ResolvedProfile {
        configured: stored.is_some(),
        profile: stored.unwrap_or_default(),
        name,
    })
}

pub fn require_client_config(profile: &ResolvedProfile) -> Result<ClientConfig, CliError> {
    profile
        .profile
        .client_config()?
        .ok_or(CliError::SyncNotConfigured)
}

pub fn resolve_db_path(
    cli_db_path: Option<PathBuf>,
    profile_name: &str,
) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os(DB_PATH_ENV).map(PathBuf::from)) {
        return Ok(path);
    }
    default_db_path(profile_name)
}

pub fn default_db_path(profile_name: &str) -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("assetra").join(format!("{profile_name}.db")))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

pub fn open_mirror(path: &Path) -> Result<SqliteMirror, CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(SqliteMirror::open(path)?)
}

pub fn format_last_sync(last_sync_at: Option<&str>) -> String {
    last_sync_at.map_or_else(|| "Never".to_string(), ToString::to_string)
}

pub fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

pub fn value_preview(value: &str, max_chars: usize) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_scan_event_lines(events: &[ScanEvent]) -> Vec<String> {
    events
        .iter()
        .map(|event| {
            format!(
                "{:<13}  {:<10}  {:<16}  {:<40}  {}",
                short_id(&event.client_event_id),
                event.symbology,
                event.source_type,
                value_preview(&event.raw_value, 40),
                format_timestamp(&event.captured_at)
            )
        })
        .collect()
}

pub fn format_asset_lines(assets: &[Asset]) -> Vec<String> {
    assets
        .iter()
        .map(|asset| {
            let summary = asset
                .fields()
                .iter()
                .filter(|(key, _)| key.as_str() != "id")
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            format!("{:<20}  {}", asset.id(), value_preview(&summary, 80))
        })
        .collect()
}

pub fn format_conflict_lines(conflicts: &[ConflictRecord]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            let updated_at = if conflict.updated_at.is_empty() {
                "-"
            } else {
                conflict.updated_at.as_str()
            };
            format!(
                "{}  local={}  server={}  updated_at={}",
                conflict.id,
                value_preview(&conflict.local_value, 30),
                value_preview(&conflict.server_value, 30),
                updated_at
            )
        })
        .collect()
}
