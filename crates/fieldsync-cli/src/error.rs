use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] fieldsync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Site ID cannot be empty")]
    EmptySiteId,
    #[error("Soil match ID cannot be empty")]
    EmptySoilMatchId,
    #[error("No soil data provided. Pass --file or pipe JSON on stdin.")]
    EmptySoilData,
    #[error("No local data for site: {0}")]
    SiteNotFound(String),
    #[error("Failed to read state at {path}: {message}")]
    State { path: String, message: String },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Run `fieldsync config init --api-base-url <URL>` or set FIELDSYNC_API_URL."
    )]
    SyncNotConfigured,
    #[error("Not logged in. Set FIELDSYNC_ACCESS_TOKEN to push changes.")]
    NotLoggedIn,
}
