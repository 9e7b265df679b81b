use fieldsync_core::sync::{SyncRecords, UserDataState, UserDataTargets};
use fieldsync_core::SyncState;
use serde::Serialize;

use crate::commands::common::{format_sync_timestamp, wire_label, Workspace};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub state: SyncState,
    pub sites: usize,
    pub unsynced: UserDataTargets,
    pub errors: Vec<SyncErrorItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncErrorItem {
    pub kind: &'static str,
    pub site_id: String,
    pub reason: String,
    pub last_synced_at: Option<i64>,
}

pub async fn run_status(workspace: &Workspace, as_json: bool) -> Result<(), CliError> {
    let state = workspace.service.snapshot().await;
    let report = StatusReport {
        state: workspace.service.sync_state().await,
        sites: site_count(&state),
        unsynced: state.unsynced_targets(),
        errors: sync_error_items(&state),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for line in format_status_lines(&report) {
        println!("{line}");
    }
    Ok(())
}

pub fn site_count(state: &UserDataState) -> usize {
    state
        .soil_data
        .data
        .keys()
        .chain(state.soil_metadata.data.keys())
        .collect::<std::collections::BTreeSet<_>>()
        .len()
}

pub fn sync_error_items(state: &UserDataState) -> Vec<SyncErrorItem> {
    let mut items = error_items("soil data", &state.soil_data.sync);
    items.extend(error_items("soil metadata", &state.soil_metadata.sync));
    items
}

fn error_items<D, E: Serialize>(kind: &'static str, records: &SyncRecords<D, E>) -> Vec<SyncErrorItem> {
    records
        .iter()
        .filter_map(|(site_id, record)| {
            record.last_synced_error.as_ref().map(|error| SyncErrorItem {
                kind,
                site_id: site_id.clone(),
                reason: wire_label(error),
                last_synced_at: record.last_synced_at,
            })
        })
        .collect()
}

pub fn format_status_lines(report: &StatusReport) -> Vec<String> {
    let mut lines = vec![
        format!("Status: {}", report.state),
        format!("Sites with local data: {}", report.sites),
    ];

    if report.unsynced.soil_data_site_ids.is_empty()
        && report.unsynced.soil_metadata_site_ids.is_empty()
    {
        lines.push("No unsynced changes.".to_string());
    } else {
        lines.push(format!(
            "Unsynced soil data: {}",
            report.unsynced.soil_data_site_ids.len()
        ));
        lines.push(format!(
            "Unsynced soil metadata: {}",
            report.unsynced.soil_metadata_site_ids.len()
        ));
    }

    for error in &report.errors {
        let at = error
            .last_synced_at
            .map_or_else(|| "-".to_string(), format_sync_timestamp);
        lines.push(format!(
            "  {} {}: {} ({at})",
            error.kind, error.site_id, error.reason
        ));
    }
    lines
}
