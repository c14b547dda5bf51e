use crate::auth::{auth_client, clear_stored_session, load_stored_session};
use crate::cli::AuthCommands;
use crate::commands::common::{load_profile, require_client_config};
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let profile = load_profile(global_profile)?;
    match command {
        AuthCommands::Login { username, password } => {
            let config = require_client_config(&profile).map_err(|_| {
                CliError::Config(format!(
                    "Profile '{}' has no backend configured. Run `assetra config init --profile {} --api-base-url <URL> --tenant-id <TENANT>` first.",
                    profile.name, profile.name
                ))
            })?;
            let client = auth_client(&profile.name, &config)?;
            let session = client.sign_in(&username, &password).await?;
            println!(
                "Signed in profile '{}' as {} (tenant {})",
                profile.name, session.username, config.tenant_id
            );
            Ok(())
        }
        AuthCommands::Status => {
            if let Some(session) = load_stored_session(&profile.name)? {
                println!(
                    "Profile '{}' is signed in as {}",
                    profile.name, session.username
                );
            } else {
                println!("Profile '{}' is not signed in.", profile.name);
            }
            Ok(())
        }
        AuthCommands::Logout => {
            clear_stored_session(&profile.name)?;
            println!("Signed out profile '{}'", profile.name);
            Ok(())
        }
    }
}
