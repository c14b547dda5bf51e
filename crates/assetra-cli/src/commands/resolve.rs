use std::path::Path;

use assetra_core::{LocalMirror, Resolution};

use crate::commands::common::open_mirror;
use crate::error::CliError;

pub fn run_resolve(id: &str, accept_server: bool, db_path: &Path) -> Result<(), CliError> {
    let conflict_id = normalize_conflict_id(id)?;
    let mirror = open_mirror(db_path)?;

    let known = mirror
        .pending_conflicts()?
        .iter()
        .any(|conflict| conflict.id == conflict_id);
    let ack = mirror.resolve_conflict(&conflict_id, accept_server)?;

    for line in format_resolution_lines(&conflict_id, known, ack.resolution) {
        println!("{line}");
    }
    Ok(())
}

/// Lines reported after a resolution. A re-send is mentioned only for an open conflict.
pub fn format_resolution_lines(
    conflict_id: &str,
    known: bool,
    resolution: Resolution,
) -> Vec<String> {
    if !known {
        return vec![format!("No open conflict '{conflict_id}'; acknowledgement recorded as is.")];
    }
    match resolution {
        Resolution::KeepLocal => vec![format!(
            "Kept local value for {conflict_id}; it will be re-sent on next sync."
        )],
        Resolution::AcceptServer => vec![format!("Accepted server value for {conflict_id}.")],
    }
}

pub fn normalize_conflict_id(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyConflictId);
    }
    Ok(trimmed.to_string())
}
