//! Building push input from unsynced entities, and turning push responses
//! back into [`SyncResults`].

use std::collections::BTreeMap;

use serde::Serialize;

use super::record::SyncedValue;
use super::records::{entity_record, SyncRecords};
use super::results::SyncResults;

/// Computes the fields of an entity that changed since its last synced state.
///
/// Implementations must be pure. With no baseline (the entity was never
/// synced) every set field counts as changed.
pub trait ChangeDiff {
    type Changes: Serialize + Clone + PartialEq + std::fmt::Debug;

    fn changes_since(&self, baseline: Option<&Self>) -> Self::Changes;
}

/// One entity's changes in a push request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushInputEntry<C> {
    pub site_id: String,
    #[serde(flatten)]
    pub changes: C,
}

/// All entries for one entity kind in a push request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushInput<C> {
    pub entries: Vec<PushInputEntry<C>>,
}

impl<C> PushInput<C> {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build push input for `unsynced_data`, diffing each entity against the last
/// synced data in its record.
///
/// Entities without live data (deleted locally, or never created) produce no
/// entry.
pub fn unsynced_to_push_input<D, E>(
    unsynced_records: &SyncRecords<D, E>,
    unsynced_data: &BTreeMap<String, Option<D>>,
) -> PushInput<D::Changes>
where
    D: ChangeDiff + Clone,
    E: Clone,
{
    let entries = unsynced_data
        .iter()
        .filter_map(|(site_id, data)| {
            let data = data.as_ref()?;
            let record = entity_record(unsynced_records, site_id);
            Some(PushInputEntry {
                site_id: site_id.clone(),
                changes: data.changes_since(record.last_synced_data.as_ref()),
            })
        })
        .collect();
    PushInput { entries }
}

/// Per-entity outcome reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome<D, E> {
    /// The server accepted the changes and returned its canonical copy.
    Success(D),
    /// The server rejected the changes.
    Failure(E),
}

/// One entity's entry in a push response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushResultEntry<D, E> {
    pub site_id: String,
    pub outcome: PushOutcome<D, E>,
}

/// Convert a push response into results tagged with the revisions that were
/// sent.
///
/// The response does not echo revisions, so each entry is tagged with the
/// revision its entity had in `pushed_records` (the records the request was
/// built from).
pub fn push_response_to_results<D, E>(
    pushed_records: &SyncRecords<D, E>,
    response: Vec<PushResultEntry<D, E>>,
) -> SyncResults<D, E>
where
    D: Clone,
    E: Clone,
{
    let mut results = SyncResults::default();
    for entry in response {
        let revision_id = entity_record(pushed_records, &entry.site_id).revision_id;
        match entry.outcome {
            PushOutcome::Success(data) => {
                results
                    .data
                    .insert(entry.site_id, SyncedValue::new(data, revision_id));
            }
            PushOutcome::Failure(reason) => {
                results
                    .errors
                    .insert(entry.site_id, SyncedValue::new(reason, revision_id));
            }
        }
    }
    results
}
