use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use fieldsync_core::config::SyncClientConfig;
use fieldsync_core::sync::{
    HttpUserDataTransport, UserDataPushInput, UserDataPushResponse, UserDataState,
    UserDataTransport,
};
use fieldsync_core::util::normalize_text_option;
use fieldsync_core::SyncService;
use serde::Serialize;

use crate::error::CliError;

const STATE_FILE_NAME: &str = "state.json";
const CONFIG_FILE_NAME: &str = "config.json";

pub fn resolve_state_path(cli_state_path: Option<PathBuf>) -> PathBuf {
    cli_state_path
        .or_else(|| env::var_os("FIELDSYNC_STATE_PATH").map(PathBuf::from))
        .unwrap_or_else(default_state_path)
}

pub fn default_state_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fieldsync")
        .join(STATE_FILE_NAME)
}

pub fn resolve_config_path(cli_config_path: Option<PathBuf>) -> PathBuf {
    cli_config_path
        .or_else(|| env::var_os("FIELDSYNC_CONFIG_PATH").map(PathBuf::from))
        .unwrap_or_else(default_config_path)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fieldsync")
        .join(CONFIG_FILE_NAME)
}

/// Load persisted state. A missing file is an empty state.
pub fn load_state(path: &Path) -> Result<UserDataState, CliError> {
    if !path.exists() {
        return Ok(UserDataState::default());
    }

    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|error| CliError::State {
        path: path.display().to_string(),
        message: error.to_string(),
    })
}

/// Write state through a temporary file so a crash never leaves it half written.
pub fn save_state(path: &Path, state: &UserDataState) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let serialized = serde_json::to_string_pretty(state)?;
    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, serialized)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

pub fn save_config(path: &Path, config: &SyncClientConfig) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

/// Config file values plus environment overrides.
#[derive(Debug, Clone, Default)]
pub struct CliSettings {
    pub config: SyncClientConfig,
    pub access_token: Option<String>,
}

impl CliSettings {
    pub fn load(config_path: &Path) -> Result<Self, CliError> {
        let config = SyncClientConfig::load_from_path(config_path)?;
        Self::with_overrides(
            config,
            env::var("FIELDSYNC_API_URL").ok(),
            env::var("FIELDSYNC_ACCESS_TOKEN").ok(),
        )
    }

    pub fn with_overrides(
        config: SyncClientConfig,
        api_base_url: Option<String>,
        access_token: Option<String>,
    ) -> Result<Self, CliError> {
        let config = match normalize_text_option(api_base_url) {
            Some(api_base_url) => SyncClientConfig {
                api_base_url: Some(api_base_url),
                ..config
            }
            .normalized()?,
            None => config,
        };
        Ok(Self {
            config,
            access_token: normalize_text_option(access_token),
        })
    }
}

/// Transport used by the CLI. Local-only commands work without an endpoint.
#[derive(Debug)]
pub enum CliTransport {
    Http(HttpUserDataTransport),
    Unconfigured,
}

impl CliTransport {
    pub fn from_settings(settings: &CliSettings) -> Result<Self, CliError> {
        match settings.config.resolved_push_endpoint() {
            Some(endpoint) => Ok(Self::Http(HttpUserDataTransport::new(
                endpoint,
                settings.access_token.clone(),
            )?)),
            None => Ok(Self::Unconfigured),
        }
    }

    pub const fn is_configured(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

impl UserDataTransport for CliTransport {
    async fn push_user_data(
        &self,
        input: &UserDataPushInput,
    ) -> fieldsync_core::Result<UserDataPushResponse> {
        match self {
            Self::Http(transport) => transport.push_user_data(input).await,
            Self::Unconfigured => Err(fieldsync_core::Error::Config(
                "push endpoint is not configured".to_string(),
            )),
        }
    }
}

/// Loaded state, settings and the service wrapping them.
pub struct Workspace {
    pub service: SyncService<CliTransport>,
    pub settings: CliSettings,
    pub state_path: PathBuf,
    configured: bool,
}

impl Workspace {
    pub fn open(state_path: PathBuf, config_path: &Path) -> Result<Self, CliError> {
        let settings = CliSettings::load(config_path)?;
        let transport = CliTransport::from_settings(&settings)?;
        let configured = transport.is_configured();
        let state = load_state(&state_path)?;
        tracing::debug!("Loaded state from {}", state_path.display());

        Ok(Self {
            service: SyncService::new(transport, state),
            settings,
            state_path,
            configured,
        })
    }

    pub async fn save(&self) -> Result<(), CliError> {
        save_state(&self.state_path, &self.service.snapshot().await)
    }

    /// Fail unless pushes can be sent.
    pub fn require_push(&self) -> Result<(), CliError> {
        if !self.configured {
            return Err(CliError::SyncNotConfigured);
        }
        if self.settings.access_token.is_none() {
            return Err(CliError::NotLoggedIn);
        }
        Ok(())
    }
}

pub fn normalize_site_id(site_id: &str) -> Result<String, CliError> {
    let trimmed = site_id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptySiteId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_text_option(Some(buffer)))
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

/// Wire name of a serializable enum value, e.g. `NOT_ALLOWED`.
pub fn wire_label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|value| value.as_str().map(ToString::to_string))
        .unwrap_or_else(|| "UNKNOWN".to_string())
}
