use std::path::Path;

use assetra_core::LocalMirror;

use crate::commands::common::{format_asset_lines, open_mirror};
use crate::error::CliError;

pub fn run_assets(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let mirror = open_mirror(db_path)?;
    let assets = mirror.assets()?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&assets)?);
    } else if assets.is_empty() {
        println!("No assets in the local mirror. Run `assetra sync` to pull them.");
    } else {
        for line in format_asset_lines(&assets) {
            println!("{line}");
        }
    }

    Ok(())
}
