//! Sync client configuration.
//!
//! A small JSON document telling clients where to push and how the push
//! dispatcher is timed. Every field is optional; missing timings fall back to
//! the dispatcher defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sync::{DispatcherConfig, PUSH_DEBOUNCE, PUSH_RETRY_INTERVAL};
use crate::util::{is_http_url, normalize_text_option};

const PUSH_PATH: &str = "/v1/sync/push";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncClientConfig {
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Full push URL. Derived from `api_base_url` when absent.
    #[serde(default)]
    pub push_endpoint: Option<String>,
    #[serde(default)]
    pub push_debounce_ms: Option<u64>,
    #[serde(default)]
    pub push_retry_interval_ms: Option<u64>,
}

impl SyncClientConfig {
    /// Parse and validate a config document.
    pub fn parse(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)
            .map_err(|error| Error::Config(format!("invalid sync config JSON: {error}")))?;
        config.normalized()
    }

    /// Load config from `path`. A missing file is an empty config.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(payload) => Self::parse(&payload),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(error.into()),
        }
    }

    /// Trim values, drop empties, and check URL fields.
    pub fn normalized(self) -> Result<Self> {
        let api_base_url = normalize_http_url(self.api_base_url, "api_base_url")?;
        let push_endpoint = normalize_http_url(self.push_endpoint, "push_endpoint")?;
        if self.push_debounce_ms == Some(0) {
            return Err(Error::Config(
                "push_debounce_ms must be greater than zero".to_string(),
            ));
        }
        if self.push_retry_interval_ms == Some(0) {
            return Err(Error::Config(
                "push_retry_interval_ms must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_base_url,
            push_endpoint,
            ..self
        })
    }

    /// URL pushes are posted to, if one is configured.
    pub fn resolved_push_endpoint(&self) -> Option<String> {
        if let Some(endpoint) = normalize_text_option(self.push_endpoint.clone()) {
            return Some(endpoint);
        }
        normalize_text_option(self.api_base_url.clone())
            .map(|base| format!("{}{PUSH_PATH}", base.trim_end_matches('/')))
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            debounce: self
                .push_debounce_ms
                .map_or(PUSH_DEBOUNCE, Duration::from_millis),
            retry_interval: self
                .push_retry_interval_ms
                .map_or(PUSH_RETRY_INTERVAL, Duration::from_millis),
        }
    }
}

fn normalize_http_url(raw: Option<String>, field: &str) -> Result<Option<String>> {
    let Some(value) = normalize_text_option(raw) else {
        return Ok(None);
    };
    if is_http_url(&value) {
        Ok(Some(value.trim_end_matches('/').to_string()))
    } else {
        Err(Error::Config(format!(
            "sync config field '{field}' must include http:// or https://"
        )))
    }
}
