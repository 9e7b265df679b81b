use std::path::Path;

use fieldsync_core::models::{SoilData, SoilMetadata};
use serde::Serialize;

use crate::cli::RatingArg;
use crate::commands::common::{normalize_site_id, read_piped_stdin, Workspace};
use crate::error::CliError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SiteView {
    site_id: String,
    soil_data: Option<SoilData>,
    soil_metadata: Option<SoilMetadata>,
}

pub async fn run_show(workspace: &Workspace, site_id: &str) -> Result<(), CliError> {
    let site_id = normalize_site_id(site_id)?;
    let view = SiteView {
        soil_data: workspace.service.soil_data(&site_id).await,
        soil_metadata: workspace.service.soil_metadata(&site_id).await,
        site_id,
    };
    if view.soil_data.is_none() && view.soil_metadata.is_none() {
        return Err(CliError::SiteNotFound(view.site_id));
    }

    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

pub async fn run_set_soil(
    workspace: &Workspace,
    site_id: &str,
    file: Option<&Path>,
) -> Result<(), CliError> {
    let site_id = normalize_site_id(site_id)?;
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => read_piped_stdin()?.ok_or(CliError::EmptySoilData)?,
    };
    let data = parse_soil_data(&raw)?;

    workspace.service.update_soil_data(&site_id, data).await;
    workspace.save().await?;
    println!("Updated soil data for {site_id}");
    Ok(())
}

pub fn parse_soil_data(raw: &str) -> Result<SoilData, CliError> {
    if raw.trim().is_empty() {
        return Err(CliError::EmptySoilData);
    }
    Ok(serde_json::from_str(raw)?)
}

pub async fn run_rate(
    workspace: &Workspace,
    site_id: &str,
    soil_match_id: &str,
    rating: RatingArg,
) -> Result<(), CliError> {
    let site_id = normalize_site_id(site_id)?;
    let soil_match_id = soil_match_id.trim();
    if soil_match_id.is_empty() {
        return Err(CliError::EmptySoilMatchId);
    }

    workspace
        .service
        .rate_soil_match(&site_id, soil_match_id, rating.into_rating())
        .await;
    workspace.save().await?;
    println!("Rated {soil_match_id} at {site_id}");
    Ok(())
}

pub async fn run_delete(workspace: &Workspace, site_id: &str) -> Result<(), CliError> {
    let site_id = normalize_site_id(site_id)?;
    if workspace.service.delete_soil_data(&site_id).await.is_none() {
        return Err(CliError::SiteNotFound(site_id));
    }

    workspace.save().await?;
    println!("Deleted soil data for {site_id}");
    Ok(())
}
