use std::path::Path;

use assetra_core::LocalMirror;

use crate::commands::common::{format_conflict_lines, open_mirror};
use crate::error::CliError;

pub fn run_conflicts(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let mirror = open_mirror(db_path)?;
    let conflicts = mirror.pending_conflicts()?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&conflicts)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No conflicts awaiting a decision.");
        return Ok(());
    }

    for line in format_conflict_lines(&conflicts) {
        println!("{line}");
    }
    println!("Resolve with `assetra resolve <ID> --keep-local` or `--accept-server`.");
    Ok(())
}
