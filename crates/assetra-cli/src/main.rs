//! Assetra CLI - capture asset scans offline and sync them from the terminal.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::assets::run_assets;
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::{load_profile, resolve_db_path};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::conflicts::run_conflicts;
use crate::commands::pending::run_pending;
use crate::commands::resolve::run_resolve;
use crate::commands::scan::run_scan;
use crate::commands::sync::{run_status, run_sync};
use crate::error::CliError;

const DEFAULT_LOG_DIRECTIVE: &str = "assetra=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_DIRECTIVE));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let profile_name = load_profile(profile)?.name;
    let db_path = resolve_db_path(cli.db_path, &profile_name)?;

    match command {
        Commands::Scan {
            raw_value,
            stdin,
            symbology,
            source,
        } => run_scan(
            raw_value.as_deref(),
            stdin,
            symbology.as_deref(),
            source.as_deref(),
            &db_path,
        ),
        Commands::Pending { json } => run_pending(json, &db_path),
        Commands::Assets { json } => run_assets(json, &db_path),
        Commands::Conflicts { json } => run_conflicts(json, &db_path),
        Commands::Resolve {
            id, accept_server, ..
        } => run_resolve(&id, accept_server, &db_path),
        Commands::Sync => run_sync(profile, &db_path).await,
        Commands::Status { json } => run_status(json, profile, &db_path),
        Commands::Config { command } => run_config(command, profile),
        Commands::Auth { command } => run_auth(command, profile).await,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
    }
}
