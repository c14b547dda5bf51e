use std::path::Path;

use assetra_core::LocalMirror;

use crate::commands::common::{format_scan_event_lines, open_mirror};
use crate::error::CliError;

pub fn run_pending(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let mirror = open_mirror(db_path)?;
    let events = mirror.pending_scan_events()?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("No scans waiting to sync.");
        return Ok(());
    }

    for line in format_scan_event_lines(&events) {
        println!("{line}");
    }
    Ok(())
}
