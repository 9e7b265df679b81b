//! Combined soil data + soil metadata push.
//!
//! Both entity kinds travel in one request, each with its own list of site
//! ids, and come back as two independent result sets.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::dispatcher::PushTargets;
use super::input::{push_response_to_results, unsynced_to_push_input, PushResultEntry};
use super::record::SyncTimestamp;
use super::records::{data_for_records, entity_records, unsynced_records, SyncRecords};
use super::results::{AppliedResults, SyncResults};
use super::slice::EntitySlice;
use crate::error::{Error, Result};
use crate::models::{
    SoilData, SoilDataChangesEntry, SoilDataPushEntry, SoilDataPushFailureReason, SoilMetadata,
    SoilMetadataChangesEntry, SoilMetadataPushEntry, SoilMetadataPushFailureReason,
};

pub type SoilDataSlice = EntitySlice<SoilData, SoilDataPushFailureReason>;
pub type SoilMetadataSlice = EntitySlice<SoilMetadata, SoilMetadataPushFailureReason>;
pub type SoilDataResults = SyncResults<SoilData, SoilDataPushFailureReason>;
pub type SoilMetadataResults = SyncResults<SoilMetadata, SoilMetadataPushFailureReason>;

/// All locally held user data that takes part in sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataState {
    #[serde(default)]
    pub soil_data: SoilDataSlice,
    #[serde(default)]
    pub soil_metadata: SoilMetadataSlice,
}

impl UserDataState {
    pub fn unsynced_targets(&self) -> UserDataTargets {
        UserDataTargets {
            soil_data_site_ids: self.soil_data.unsynced_ids(),
            soil_metadata_site_ids: self.soil_metadata.unsynced_ids(),
        }
    }

    pub fn error_targets(&self) -> UserDataTargets {
        UserDataTargets {
            soil_data_site_ids: self.soil_data.error_ids(),
            soil_metadata_site_ids: self.soil_metadata.error_ids(),
        }
    }

    /// Apply both result sets from one push.
    pub fn apply_results(&mut self, results: &PushUserDataResults, at: SyncTimestamp) -> AppliedResults {
        let mut applied = AppliedResults::default();
        if let Some(soil_data_results) = &results.soil_data_results {
            applied.merge(self.soil_data.apply_results(soil_data_results, at));
        }
        if let Some(soil_metadata_results) = &results.soil_metadata_results {
            applied.merge(self.soil_metadata.apply_results(soil_metadata_results, at));
        }
        applied
    }
}

/// Site ids to push, per entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataTargets {
    #[serde(default)]
    pub soil_data_site_ids: Vec<String>,
    #[serde(default)]
    pub soil_metadata_site_ids: Vec<String>,
}

impl UserDataTargets {
    /// Distinct site ids across both kinds, sorted.
    pub fn site_ids(&self) -> BTreeSet<String> {
        self.soil_data_site_ids
            .iter()
            .chain(&self.soil_metadata_site_ids)
            .cloned()
            .collect()
    }
}

impl PushTargets for UserDataTargets {
    fn is_empty(&self) -> bool {
        self.soil_data_site_ids.is_empty() && self.soil_metadata_site_ids.is_empty()
    }
}

/// Request body for a combined push.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataPushInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_data_entries: Option<Vec<SoilDataChangesEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_metadata_entries: Option<Vec<SoilMetadataChangesEntry>>,
}

impl UserDataPushInput {
    pub fn entry_count(&self) -> usize {
        self.soil_data_entries.as_ref().map_or(0, Vec::len)
            + self.soil_metadata_entries.as_ref().map_or(0, Vec::len)
    }
}

/// Response body for a combined push. A kind that was not sent has no results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataPushResponse {
    #[serde(default)]
    pub soil_data_results: Option<Vec<SoilDataPushEntry>>,
    #[serde(default)]
    pub soil_metadata_results: Option<Vec<SoilMetadataPushEntry>>,
}

impl UserDataPushResponse {
    pub const fn has_results(&self) -> bool {
        self.soil_data_results.is_some() || self.soil_metadata_results.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushUserDataResults {
    pub soil_data_results: Option<SoilDataResults>,
    pub soil_metadata_results: Option<SoilMetadataResults>,
}

impl PushUserDataResults {
    pub fn has_errors(&self) -> bool {
        self.soil_data_results
            .as_ref()
            .is_some_and(SyncResults::has_errors)
            || self
                .soil_metadata_results
                .as_ref()
                .is_some_and(SyncResults::has_errors)
    }
}

/// A push request together with the records it was built from.
///
/// The records are a snapshot: results are tagged with the revisions that
/// were actually sent, even if the live state moves on while the request is
/// in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPush {
    pub input: UserDataPushInput,
    soil_data_records: SyncRecords<SoilData, SoilDataPushFailureReason>,
    soil_metadata_records: SyncRecords<SoilMetadata, SoilMetadataPushFailureReason>,
}

impl PreparedPush {
    /// Tag the response's results with the pushed revisions.
    ///
    /// Every kind that was sent must come back with a results list; a
    /// response missing one is a transport failure.
    pub fn results_from_response(
        &self,
        response: UserDataPushResponse,
    ) -> Result<PushUserDataResults> {
        if has_entries(self.input.soil_data_entries.as_ref())
            && response.soil_data_results.is_none()
        {
            return Err(Error::Transport(
                "push response did not include soil data results".to_string(),
            ));
        }
        if has_entries(self.input.soil_metadata_entries.as_ref())
            && response.soil_metadata_results.is_none()
        {
            return Err(Error::Transport(
                "push response did not include soil metadata results".to_string(),
            ));
        }

        Ok(PushUserDataResults {
            soil_data_results: response.soil_data_results.map(|entries| {
                push_response_to_results(
                    &self.soil_data_records,
                    entries.into_iter().map(PushResultEntry::from).collect(),
                )
            }),
            soil_metadata_results: response.soil_metadata_results.map(|entries| {
                push_response_to_results(
                    &self.soil_metadata_records,
                    entries.into_iter().map(PushResultEntry::from).collect(),
                )
            }),
        })
    }
}

fn has_entries<T>(entries: Option<&Vec<T>>) -> bool {
    entries.is_some_and(|entries| !entries.is_empty())
}

/// Build the push for `targets`, or `None` when none of them has anything to
/// send.
pub fn prepare_user_data_push(state: &UserDataState, targets: &UserDataTargets) -> Option<PreparedPush> {
    let soil_data_records = unsynced_records(&entity_records(
        &state.soil_data.sync,
        &targets.soil_data_site_ids,
    ));
    let soil_metadata_records = unsynced_records(&entity_records(
        &state.soil_metadata.sync,
        &targets.soil_metadata_site_ids,
    ));

    let soil_data_entries: Option<Vec<SoilDataChangesEntry>> =
        (!soil_data_records.is_empty()).then(|| {
            let data = data_for_records(&soil_data_records, &state.soil_data.data);
            unsynced_to_push_input(&soil_data_records, &data).into()
        });
    let soil_metadata_entries: Option<Vec<SoilMetadataChangesEntry>> =
        (!soil_metadata_records.is_empty()).then(|| {
            let data = data_for_records(&soil_metadata_records, &state.soil_metadata.data);
            unsynced_to_push_input(&soil_metadata_records, &data).into()
        });

    let input = UserDataPushInput {
        soil_data_entries,
        soil_metadata_entries,
    };
    if input.entry_count() == 0 {
        return None;
    }

    Some(PreparedPush {
        input,
        soil_data_records,
        soil_metadata_records,
    })
}
