use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use fieldsync_core::models::UserMatchRating;

#[derive(Parser)]
#[command(name = "fieldsync")]
#[command(about = "Record soil observations offline and sync them when online")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local state file
    #[arg(long, global = true, value_name = "PATH")]
    pub state_path: Option<PathBuf>,

    /// Optional path to the sync config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show sync status for local data
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show local data for a site
    Show {
        /// Site ID
        site_id: String,
    },
    /// Replace a site's soil data with a JSON document
    SetSoil {
        /// Site ID
        site_id: String,
        /// JSON file with soil data (stdin when omitted)
        #[arg(short, long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
    /// Rate a soil match at a site
    Rate {
        /// Site ID
        site_id: String,
        /// Soil match ID
        soil_match_id: String,
        /// Rating to record
        #[arg(value_enum)]
        rating: RatingArg,
    },
    /// Delete a site's local soil data
    Delete {
        /// Site ID
        site_id: String,
    },
    /// Print the push request for unsynced changes without sending it
    Pending,
    /// Push unsynced changes once
    Push,
    /// Keep pushing until every change is synced
    Sync,
    /// Manage sync configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
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
pub enum RatingArg {
    Selected,
    Rejected,
    Unsure,
    Clear,
}

impl RatingArg {
    pub const fn into_rating(self) -> Option<UserMatchRating> {
        match self {
            Self::Selected => Some(UserMatchRating::Selected),
            Self::Rejected => Some(UserMatchRating::Rejected),
            Self::Unsure => Some(UserMatchRating::Unsure),
            Self::Clear => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write the sync config file
    Init {
        /// API base URL (push endpoint is derived from it)
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Explicit push endpoint URL
        #[arg(long, value_name = "URL")]
        push_endpoint: Option<String>,
        /// Push debounce window in milliseconds
        #[arg(long, value_name = "MS")]
        push_debounce_ms: Option<u64>,
        /// Push retry interval in milliseconds
        #[arg(long, value_name = "MS")]
        push_retry_interval_ms: Option<u64>,
    },
    /// Show the effective sync config
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
