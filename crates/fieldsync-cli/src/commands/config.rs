use std::path::Path;

use fieldsync_core::config::SyncClientConfig;
use fieldsync_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::commands::common::{save_config, CliSettings};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, config_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            api_base_url,
            push_endpoint,
            push_debounce_ms,
            push_retry_interval_ms,
        } => run_config_init(
            config_path,
            SyncClientConfig {
                api_base_url,
                push_endpoint,
                push_debounce_ms,
                push_retry_interval_ms,
            },
        ),
        ConfigCommands::Show { json } => run_config_show(config_path, json),
    }
}

/// Merge explicit values over the existing file and write it back.
pub fn run_config_init(config_path: &Path, explicit: SyncClientConfig) -> Result<(), CliError> {
    let existing = SyncClientConfig::load_from_path(config_path)?;
    let config = merge_config(existing, explicit).normalized()?;
    if config.resolved_push_endpoint().is_none() {
        return Err(CliError::Config(
            "either --api-base-url or --push-endpoint is required".to_string(),
        ));
    }

    save_config(config_path, &config)?;
    println!("Saved sync config to {}", config_path.display());
    Ok(())
}

pub fn merge_config(existing: SyncClientConfig, explicit: SyncClientConfig) -> SyncClientConfig {
    SyncClientConfig {
        api_base_url: normalize_text_option(explicit.api_base_url).or(existing.api_base_url),
        push_endpoint: normalize_text_option(explicit.push_endpoint).or(existing.push_endpoint),
        push_debounce_ms: explicit.push_debounce_ms.or(existing.push_debounce_ms),
        push_retry_interval_ms: explicit
            .push_retry_interval_ms
            .or(existing.push_retry_interval_ms),
    }
}

fn run_config_show(config_path: &Path, as_json: bool) -> Result<(), CliError> {
    let settings = CliSettings::load(config_path)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&settings.config)?);
        return Ok(());
    }

    let dispatcher = settings.config.dispatcher_config();
    println!("Config file: {}", config_path.display());
    println!(
        "Push endpoint: {}",
        settings
            .config
            .resolved_push_endpoint()
            .unwrap_or_else(|| "(not configured)".to_string())
    );
    println!("Push debounce: {} ms", dispatcher.debounce.as_millis());
    println!(
        "Push retry interval: {} ms",
        dispatcher.retry_interval.as_millis()
    );
    println!(
        "Access token: {}",
        if settings.access_token.is_some() {
            "set"
        } else {
            "not set"
        }
    );
    Ok(())
}
