//! fieldsync CLI - record soil observations offline and push them when online

mod cli;
mod commands;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::{resolve_config_path, resolve_state_path, Workspace};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::push::{run_pending, run_push, run_sync};
use crate::commands::site::{run_delete, run_rate, run_set_soil, run_show};
use crate::commands::status::run_status;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "fieldsync=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config_path);

    match cli.command {
        Commands::Completions { shell, output } => {
            return run_completions(shell, output.as_deref());
        }
        Commands::Config { command } => return run_config(command, &config_path),
        command => {
            let workspace = Workspace::open(resolve_state_path(cli.state_path), &config_path)?;
            run_workspace_command(command, &workspace).await
        }
    }
}

async fn run_workspace_command(command: Commands, workspace: &Workspace) -> Result<(), CliError> {
    match command {
        Commands::Status { json } => run_status(workspace, json).await,
        Commands::Show { site_id } => run_show(workspace, &site_id).await,
        Commands::SetSoil { site_id, file } => {
            run_set_soil(workspace, &site_id, file.as_deref()).await
        }
        Commands::Rate {
            site_id,
            soil_match_id,
            rating,
        } => run_rate(workspace, &site_id, &soil_match_id, rating).await,
        Commands::Delete { site_id } => run_delete(workspace, &site_id).await,
        Commands::Pending => run_pending(workspace).await,
        Commands::Push => run_push(workspace).await,
        Commands::Sync => run_sync(workspace).await,
        Commands::Config { .. } | Commands::Completions { .. } => Ok(()),
    }
}
