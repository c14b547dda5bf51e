use std::env;

use assetra_core::config::{API_BASE_URL_ENV, TENANT_ID_ENV};
use assetra_core::util::{is_http_url, normalize_text_option};
use serde::Serialize;

use crate::cli::ConfigCommands;
use crate::commands::common::load_profile;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            api_base_url,
            tenant_id,
            timeout_secs,
            no_activate,
        } => run_config_init(
            global_profile,
            api_base_url,
            tenant_id,
            timeout_secs,
            no_activate,
        ),
        ConfigCommands::Show { json } => run_config_show(global_profile, json),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    api_base_url: Option<String>,
    tenant_id: Option<String>,
    timeout_secs: Option<u64>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing = config.profile(&profile_name).cloned().unwrap_or_default();

    let merged = merge_profile(
        &existing,
        api_base_url,
        tenant_id,
        timeout_secs,
        |key| env::var(key).ok(),
    );
    validate_profile(&merged)?;
    *config.profile_mut_or_default(&profile_name) = merged.clone();

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let missing = missing_fields(&merged);
    if missing.is_empty() {
        println!(
            "Profile '{profile_name}' is ready. Run `assetra auth login --username <username> --password <password>`."
        );
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing.join(", ")
        );
    }
    Ok(())
}

/// Explicit flags win, then the environment, then what the profile already had.
pub fn merge_profile(
    existing: &CliProfile,
    api_base_url: Option<String>,
    tenant_id: Option<String>,
    timeout_secs: Option<u64>,
    lookup: impl Fn(&str) -> Option<String>,
) -> CliProfile {
    CliProfile {
        api_base_url: normalize_text_option(api_base_url)
            .or_else(|| normalize_text_option(lookup(API_BASE_URL_ENV)))
            .or_else(|| normalize_text_option(existing.api_base_url.clone()))
            .map(|url| url.trim_end_matches('/').to_string()),
        tenant_id: normalize_text_option(tenant_id)
            .or_else(|| normalize_text_option(lookup(TENANT_ID_ENV)))
            .or_else(|| normalize_text_option(existing.tenant_id.clone())),
        request_timeout_secs: match timeout_secs {
            Some(0) => None,
            Some(secs) => Some(secs),
            None => existing.request_timeout_secs,
        },
    }
}

pub fn validate_profile(profile: &CliProfile) -> Result<(), CliError> {
    if let Some(url) = profile.api_base_url.as_deref() {
        if !is_http_url(url) {
            return Err(CliError::Config(
                "api_base_url must include http:// or https://".to_string(),
            ));
        }
    }
    Ok(())
}

pub fn missing_fields(profile: &CliProfile) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if profile.api_base_url.is_none() {
        missing.push("api_base_url");
    }
    if profile.tenant_id.is_none() {
        missing.push("tenant_id");
    }
    missing
}

#[derive(Debug, Serialize)]
struct ProfileView<'a> {
    profile: &'a str,
    configured: bool,
    api_base_url: Option<String>,
    tenant_id: Option<String>,
    request_timeout_secs: Option<u64>,
    sync_endpoint: Option<String>,
}

fn run_config_show(global_profile: Option<&str>, as_json: bool) -> Result<(), CliError> {
    let resolved = load_profile(global_profile)?;
    let client_config = resolved.profile.client_config()?;
    let view = ProfileView {
        profile: &resolved.name,
        configured: resolved.configured,
        api_base_url: client_config
            .as_ref()
            .map(|config| config.api_base_url.clone())
            .or_else(|| resolved.profile.api_base_url.clone()),
        tenant_id: client_config
            .as_ref()
            .map(|config| config.tenant_id.clone())
            .or_else(|| resolved.profile.tenant_id.clone()),
        request_timeout_secs: client_config
            .as_ref()
            .and_then(|config| config.request_timeout_secs),
        sync_endpoint: client_config.as_ref().map(assetra_core::ClientConfig::sync_endpoint),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    if !view.configured {
        println!("Profile '{}' is not configured.", view.profile);
    }
    println!("Profile:      {}", view.profile);
    println!(
        "API base URL: {}",
        view.api_base_url.as_deref().unwrap_or("(unset)")
    );
    println!(
        "Tenant:       {}",
        view.tenant_id.as_deref().unwrap_or("(unset)")
    );
    if let Some(secs) = view.request_timeout_secs {
        println!("Timeout:      {secs}s");
    }
    if let Some(endpoint) = view.sync_endpoint.as_deref() {
        println!("Sync:         {endpoint}");
    }
    Ok(())
}
