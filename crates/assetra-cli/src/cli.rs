use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "assetra")]
#[command(about = "Capture asset scans offline and sync them with the Assetra backend")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to the local mirror database
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name for backend and auth configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a scan in the local mirror
    Scan {
        /// Decoded value; omit with --stdin
        #[arg(required_unless_present = "stdin", conflicts_with = "stdin")]
        raw_value: Option<String>,
        /// Read one scan per line from stdin (keyboard wedge scanners)
        #[arg(long)]
        stdin: bool,
        /// Barcode symbology, e.g. qr or ean13
        #[arg(long, value_name = "NAME")]
        symbology: Option<String>,
        /// Capture source recorded with the event
        #[arg(long, value_name = "SOURCE")]
        source: Option<String>,
    },
    /// List scans waiting to be synced
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List assets known to the local mirror
    Assets {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List conflicts awaiting a decision
    Conflicts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve a conflict by keeping the local value or accepting the server's
    #[command(group(
        ArgGroup::new("decision")
            .required(true)
            .args(["keep_local", "accept_server"])
    ))]
    Resolve {
        /// Conflict ID, usually `{asset_id}:{field}`
        id: String,
        /// Re-send the local value and patch the local asset
        #[arg(long)]
        keep_local: bool,
        /// Take the server value as is
        #[arg(long)]
        accept_server: bool,
    },
    /// Push pending scans and acknowledgements, pull server changes
    Sync,
    /// Show pending work and the last successful sync
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Authenticate a CLI profile against the backend
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Backend base URL, e.g. https://assets.example.com
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Tenant sent as X-Tenant-ID
        #[arg(long, value_name = "TENANT")]
        tenant_id: Option<String>,
        /// Per-request timeout in seconds (0 disables)
        #[arg(long, value_name = "SECS")]
        timeout_secs: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in and store the session in the OS keychain
    Login {
        /// Account username
        #[arg(long, value_name = "USERNAME")]
        username: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show auth status for the profile
    Status,
    /// Forget the stored session
    Logout,
}
