use std::sync::Arc;

use fieldsync_core::sync::{LogNotifier, PushDispatcher, PushReport, PushTargets};

use crate::commands::common::Workspace;
use crate::error::CliError;

pub async fn run_pending(workspace: &Workspace) -> Result<(), CliError> {
    match workspace.service.pending_input().await {
        Some(input) => println!("{}", serde_json::to_string_pretty(&input)?),
        None => println!("Nothing to push."),
    }
    Ok(())
}

pub async fn run_push(workspace: &Workspace) -> Result<(), CliError> {
    workspace.require_push()?;
    let result = workspace.service.push_unsynced().await;
    workspace.save().await?;

    println!("{}", format_push_report(&result?));
    Ok(())
}

/// Run the push dispatcher until nothing is left unsynced or the user
/// interrupts. Failed pushes are retried on the configured interval.
pub async fn run_sync(workspace: &Workspace) -> Result<(), CliError> {
    workspace.require_push()?;
    let service = &workspace.service;
    let mut signals = service.signals();
    if signals.borrow_and_update().unsynced.is_empty() {
        println!("Everything is synced.");
        return Ok(());
    }

    let dispatcher = PushDispatcher::spawn(
        Arc::new(service.clone()),
        Arc::new(LogNotifier),
        service.signals(),
        workspace.settings.config.dispatcher_config(),
    );
    service.set_logged_in(true);

    loop {
        tokio::select! {
            interrupted = tokio::signal::ctrl_c() => {
                interrupted?;
                println!("Interrupted; unsynced changes are kept for the next run.");
                break;
            }
            changed = signals.changed() => {
                if changed.is_err() {
                    break;
                }
                workspace.save().await?;
                if signals.borrow_and_update().unsynced.is_empty() {
                    break;
                }
            }
        }
    }

    dispatcher.shutdown().await;
    workspace.save().await?;
    println!("Sync finished: {}", service.sync_state().await);
    Ok(())
}

pub fn format_push_report(report: &PushReport) -> String {
    if report.synced == 0 && report.errored == 0 && report.stale == 0 {
        return "Nothing to push.".to_string();
    }
    format!(
        "Pushed: {} synced, {} rejected, {} superseded by newer edits",
        report.synced, report.errored, report.stale
    )
}
