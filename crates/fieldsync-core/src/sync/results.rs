//! Applying push results to local state.
//!
//! A result is only applied while it still describes the entity's current
//! revision. Results for entities that were modified again after the push was
//! sent are dropped; the newer revision is still unsynced and will be pushed on
//! its own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::record::{SyncRecord, SyncTimestamp, SyncedValue};
use super::records::{
    entity_record, mark_entities_error, mark_entities_synced, SyncRecords, SyncedValues,
};

/// Outcome of one push batch keyed by entity ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResults<D, E> {
    #[serde(default = "BTreeMap::new")]
    pub data: SyncedValues<D>,
    #[serde(default = "BTreeMap::new")]
    pub errors: SyncedValues<E>,
}

impl<D, E> Default for SyncResults<D, E> {
    fn default() -> Self {
        Self {
            data: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }
}

impl<D, E> SyncResults<D, E> {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.errors.is_empty()
    }
}

/// What [`apply_sync_results`] did with each entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedResults {
    pub synced: Vec<String>,
    pub errored: Vec<String>,
    pub stale: Vec<String>,
}

impl AppliedResults {
    pub fn merge(&mut self, other: Self) {
        self.synced.extend(other.synced);
        self.errored.extend(other.errored);
        self.stale.extend(other.stale);
    }
}

/// Apply `results` to `data` and `records`, skipping stale entries.
///
/// Successes mark the record synced and overwrite the entity's data with the
/// server's copy. Errors mark the record errored and leave the data as the
/// user left it. Must be called once per result set.
pub fn apply_sync_results<D: Clone, E: Clone>(
    data: &mut BTreeMap<String, D>,
    records: &mut SyncRecords<D, E>,
    results: &SyncResults<D, E>,
    at: SyncTimestamp,
) -> AppliedResults {
    let current_data = values_for_current_revisions(records, &results.data);
    let current_errors = values_for_current_revisions(records, &results.errors);

    let stale = results
        .data
        .keys()
        .filter(|id| !current_data.contains_key(*id))
        .chain(
            results
                .errors
                .keys()
                .filter(|id| !current_errors.contains_key(*id)),
        )
        .cloned()
        .collect::<Vec<_>>();
    for id in &stale {
        tracing::debug!("Dropping stale sync result for {id}");
    }

    mark_entities_synced(records, &current_data, at);
    apply_synced_values_to_data(data, &current_data);

    mark_entities_error(records, &current_errors, at);

    AppliedResults {
        synced: current_data.into_keys().collect(),
        errored: current_errors.into_keys().collect(),
        stale,
    }
}

/// The subset of `values` whose revision matches the entity's current revision.
pub fn values_for_current_revisions<D, E, T>(
    records: &SyncRecords<D, E>,
    values: &SyncedValues<T>,
) -> SyncedValues<T>
where
    D: Clone,
    E: Clone,
    T: Clone,
{
    values
        .iter()
        .filter(|(id, value)| is_value_for_current_revision(&entity_record(records, id), value))
        .map(|(id, value)| (id.clone(), value.clone()))
        .collect()
}

pub fn is_value_for_current_revision<D, E, T>(
    record: &SyncRecord<D, E>,
    value: &SyncedValue<T>,
) -> bool {
    value.is_current_for(record)
}

pub fn apply_synced_values_to_data<D: Clone>(
    data: &mut BTreeMap<String, D>,
    values: &SyncedValues<D>,
) {
    for (id, value) in values {
        data.insert(id.clone(), value.value.clone());
    }
}
