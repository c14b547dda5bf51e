use std::path::Path;
use std::sync::Arc;

use assetra_core::auth::SessionTokenProvider;
use assetra_core::{HttpSyncTransport, LocalMirror, SyncEngine, SyncReport};
use serde::Serialize;

use crate::auth::{auth_client, load_stored_session};
use crate::commands::common::{
    format_last_sync, load_profile, open_mirror, require_client_config,
};
use crate::error::CliError;

pub async fn run_sync(global_profile: Option<&str>, db_path: &Path) -> Result<(), CliError> {
    let profile = load_profile(global_profile)?;
    let config = require_client_config(&profile)?;
    let mirror = Arc::new(open_mirror(db_path)?);

    let client = auth_client(&profile.name, &config)?;
    let tokens = SessionTokenProvider::restore(client)?;
    let transport = HttpSyncTransport::new(&config, tokens)?;
    let engine = SyncEngine::new(mirror, transport);

    let report = engine.sync().await?;
    for line in format_sync_report(&report) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_sync_report(report: &SyncReport) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Sync completed in {} ms (server time {})",
            report.duration.as_millis(),
            report.server_time
        ),
        format!(
            "Pushed {} scan(s), {} acknowledgement(s); server accepted {}",
            report.events_pushed, report.acks_delivered, report.accepted_event_ids
        ),
        format!("Pulled {} asset change(s)", report.asset_changes),
    ];
    if report.new_conflicts > 0 {
        lines.push(format!(
            "{} new conflict(s) ({}). Run `assetra conflicts` to review.",
            report.new_conflicts, report.conflict_strategy
        ));
    }
    lines
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusReport {
    pub profile: String,
    pub db_path: String,
    pub pending_scan_events: usize,
    pub pending_conflicts: usize,
    pub pending_acknowledgements: usize,
    pub last_sync_at: Option<String>,
    pub signed_in_as: Option<String>,
}

pub fn collect_status<M: LocalMirror + ?Sized>(
    mirror: &M,
    profile: &str,
    db_path: &Path,
    signed_in_as: Option<String>,
) -> Result<StatusReport, CliError> {
    let pending = mirror.pending_state()?;
    Ok(StatusReport {
        profile: profile.to_string(),
        db_path: db_path.display().to_string(),
        pending_scan_events: pending.scan_events.len(),
        pending_conflicts: mirror.pending_conflicts()?.len(),
        pending_acknowledgements: pending.conflict_acks.len(),
        last_sync_at: pending.last_sync_at,
        signed_in_as,
    })
}

pub fn format_status_lines(status: &StatusReport) -> Vec<String> {
    vec![
        format!("Profile:          {}", status.profile),
        format!("Mirror:           {}", status.db_path),
        format!(
            "Signed in as:     {}",
            status.signed_in_as.as_deref().unwrap_or("(not signed in)")
        ),
        format!("Pending scans:    {}", status.pending_scan_events),
        format!("Open conflicts:   {}", status.pending_conflicts),
        format!("Pending acks:     {}", status.pending_acknowledgements),
        format!(
            "Last sync:        {}",
            format_last_sync(status.last_sync_at.as_deref())
        ),
    ]
}

pub fn run_status(
    as_json: bool,
    global_profile: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let profile = load_profile(global_profile)?;
    let mirror = open_mirror(db_path)?;

    let signed_in_as = match load_stored_session(&profile.name) {
        Ok(session) => session.map(|session| session.username),
        Err(error) => {
            tracing::warn!("Could not read stored session: {}", error);
            None
        }
    };
    let status = collect_status(&mirror, &profile.name, db_path, signed_in_as)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        for line in format_status_lines(&status) {
            println!("{line}");
        }
    }
    Ok(())
}
