//! Shared client state types.

use serde::Serialize;

/// Unified sync state shown by clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Offline,
    Syncing,
    Synced,
    Error,
}

impl SyncState {
    /// Summarize sync status. Being offline hides everything else, and
    /// unsynced changes outrank errors since a push is still pending.
    pub const fn summarize(offline: bool, has_unsynced: bool, has_errors: bool) -> Self {
        if offline {
            Self::Offline
        } else if has_unsynced {
            Self::Syncing
        } else if has_errors {
            Self::Error
        } else {
            Self::Synced
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
