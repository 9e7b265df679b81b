//! Keyed collections of sync records.
//!
//! Records are keyed by entity ID (a site ID for soil data and metadata). Any
//! lookup of an absent entity yields an empty record, so callers never have to
//! special-case entities that have not been referenced yet.

use std::collections::BTreeMap;

use super::record::{SyncRecord, SyncTimestamp, SyncedValue};

/// Sync records keyed by entity ID.
pub type SyncRecords<D, E> = BTreeMap<String, SyncRecord<D, E>>;

/// Synced values keyed by entity ID.
pub type SyncedValues<T> = BTreeMap<String, SyncedValue<T>>;

/// The record for `id`, or an empty record when none exists.
pub fn entity_record<D: Clone, E: Clone>(records: &SyncRecords<D, E>, id: &str) -> SyncRecord<D, E> {
    records.get(id).cloned().unwrap_or_default()
}

/// The records for `ids`, defaulting absent entities to empty records.
pub fn entity_records<D, E, I, S>(records: &SyncRecords<D, E>, ids: I) -> SyncRecords<D, E>
where
    D: Clone,
    E: Clone,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter()
        .map(|id| {
            let id = id.as_ref();
            (id.to_string(), entity_record(records, id))
        })
        .collect()
}

/// Live data for every entity in `records`; `None` where the entity has no data.
pub fn data_for_records<D: Clone, E>(
    records: &SyncRecords<D, E>,
    data: &BTreeMap<String, D>,
) -> BTreeMap<String, Option<D>> {
    records
        .keys()
        .map(|id| (id.clone(), data.get(id).cloned()))
        .collect()
}

pub fn unsynced_records<D: Clone, E: Clone>(records: &SyncRecords<D, E>) -> SyncRecords<D, E> {
    records
        .iter()
        .filter(|(_, record)| record.is_unsynced())
        .map(|(id, record)| (id.clone(), record.clone()))
        .collect()
}

pub fn error_records<D: Clone, E: Clone>(records: &SyncRecords<D, E>) -> SyncRecords<D, E> {
    records
        .iter()
        .filter(|(_, record)| record.is_error())
        .map(|(id, record)| (id.clone(), record.clone()))
        .collect()
}

/// Fresh records for data that came from the server.
pub fn initialize_entity_records<D: Clone, E>(data: &BTreeMap<String, D>) -> SyncRecords<D, E> {
    data.iter()
        .map(|(id, entity)| (id.clone(), SyncRecord::initial(Some(entity.clone()))))
        .collect()
}

/// Result of replacing local entities with pulled ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedEntities<D, E> {
    pub records: SyncRecords<D, E>,
    pub data: BTreeMap<String, D>,
}

/// Replace local state with `new_data`, keeping entities that are still unsynced.
///
/// Unsynced entities keep both their local record and their local data (or the
/// absence of it, for locally deleted entities) so pending pushes are not lost.
pub fn merge_unsynced_entities<D: Clone, E: Clone>(
    records: &SyncRecords<D, E>,
    data: &BTreeMap<String, D>,
    new_data: BTreeMap<String, D>,
) -> MergedEntities<D, E> {
    let unsynced = unsynced_records(records);

    let mut merged_records = initialize_entity_records(&new_data);
    let mut merged_data = new_data;

    for (id, record) in unsynced {
        match data.get(&id) {
            Some(local) => {
                merged_data.insert(id.clone(), local.clone());
            }
            None => {
                merged_data.remove(&id);
            }
        }
        merged_records.insert(id, record);
    }

    MergedEntities {
        records: merged_records,
        data: merged_data,
    }
}

pub fn mark_entity_modified<D: Clone, E: Clone>(
    records: &mut SyncRecords<D, E>,
    id: &str,
    at: SyncTimestamp,
) {
    let record = entity_record(records, id).modified(at);
    records.insert(id.to_string(), record);
}

pub fn mark_entities_modified<D, E, I, S>(records: &mut SyncRecords<D, E>, ids: I, at: SyncTimestamp)
where
    D: Clone,
    E: Clone,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for id in ids {
        mark_entity_modified(records, id.as_ref(), at);
    }
}

pub fn mark_entity_synced<D: Clone, E: Clone>(
    records: &mut SyncRecords<D, E>,
    id: &str,
    value: &SyncedValue<D>,
    at: SyncTimestamp,
) {
    let record = entity_record(records, id).synced(value.value.clone(), value.revision_id, at);
    records.insert(id.to_string(), record);
}

pub fn mark_entities_synced<D: Clone, E: Clone>(
    records: &mut SyncRecords<D, E>,
    values: &SyncedValues<D>,
    at: SyncTimestamp,
) {
    for (id, value) in values {
        mark_entity_synced(records, id, value, at);
    }
}

pub fn mark_entity_error<D: Clone, E: Clone>(
    records: &mut SyncRecords<D, E>,
    id: &str,
    error: &SyncedValue<E>,
    at: SyncTimestamp,
) {
    let record = entity_record(records, id).errored(error.value.clone(), error.revision_id, at);
    records.insert(id.to_string(), record);
}

pub fn mark_entities_error<D: Clone, E: Clone>(
    records: &mut SyncRecords<D, E>,
    errors: &SyncedValues<E>,
    at: SyncTimestamp,
) {
    for (id, error) in errors {
        mark_entity_error(records, id, error, at);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sync::RevisionId;

    type Records = SyncRecords<String, String>;

    fn rev(value: u64) -> Option<RevisionId> {
        Some(RevisionId::new(value))
    }

    fn unsynced(revision: u64) -> SyncRecord<String, String> {
        SyncRecord {
            revision_id: rev(revision),
            ..SyncRecord::default()
        }
    }

    fn synced(revision: u64) -> SyncRecord<String, String> {
        SyncRecord {
            revision_id: rev(revision),
            last_synced_revision_id: rev(revision),
            ..SyncRecord::default()
        }
    }

    #[test]
    fn entity_record_defaults_to_empty() {
        let records = Records::new();
        assert_eq!(entity_record(&records, "missing"), SyncRecord::default());
    }

    #[test]
    fn entity_records_projects_requested_ids() {
        let records = Records::from([
            ("a".to_string(), unsynced(1)),
            ("b".to_string(), synced(2)),
        ]);
        let projected = entity_records(&records, ["a", "c"]);
        assert_eq!(
            projected,
            Records::from([
                ("a".to_string(), unsynced(1)),
                ("c".to_string(), SyncRecord::default()),
            ])
        );
    }

    #[test]
    fn data_for_records_defaults_missing_to_none() {
        let records = Records::from([
            ("a".to_string(), unsynced(1)),
            ("b".to_string(), unsynced(1)),
        ]);
        let data = BTreeMap::from([
            ("a".to_string(), "A".to_string()),
            ("z".to_string(), "Z".to_string()),
        ]);
        assert_eq!(
            data_for_records(&records, &data),
            BTreeMap::from([
                ("a".to_string(), Some("A".to_string())),
                ("b".to_string(), None),
            ])
        );
    }

    #[test]
    fn unsynced_and_error_filters() {
        let errored = synced(1).errored("INVALID_DATA".to_string(), rev(1), 5);
        let records = Records::from([
            ("new".to_string(), unsynced(1)),
            ("clean".to_string(), synced(3)),
            ("errored".to_string(), errored.clone()),
            ("untouched".to_string(), SyncRecord::default()),
        ]);

        assert_eq!(
            unsynced_records(&records),
            Records::from([("new".to_string(), unsynced(1))])
        );
        assert_eq!(
            error_records(&records),
            Records::from([("errored".to_string(), errored)])
        );
    }

    #[test]
    fn mark_modified_creates_missing_records() {
        let mut records = Records::new();
        mark_entities_modified(&mut records, ["a", "b"], 10);
        mark_entity_modified(&mut records, "a", 20);

        assert_eq!(records["a"].revision_id, rev(2));
        assert_eq!(records["a"].last_modified_at, Some(20));
        assert_eq!(records["b"].revision_id, rev(1));
    }

    #[test]
    fn mark_synced_and_error_in_bulk() {
        let mut records = Records::from([
            ("a".to_string(), unsynced(1)),
            ("b".to_string(), unsynced(4)),
        ]);
        mark_entities_synced(
            &mut records,
            &SyncedValues::from([("a".to_string(), SyncedValue::new("A".to_string(), rev(1)))]),
            30,
        );
        mark_entities_error(
            &mut records,
            &SyncedValues::from([(
                "b".to_string(),
                SyncedValue::new("NOT_ALLOWED".to_string(), rev(4)),
            )]),
            30,
        );

        assert!(!records["a"].is_unsynced());
        assert_eq!(records["a"].last_synced_data.as_deref(), Some("A"));
        assert!(records["b"].is_error());
        assert_eq!(records["b"].last_synced_data, None);
    }

    #[test]
    fn initialize_entity_records_seeds_synced_data() {
        let data = BTreeMap::from([("a".to_string(), "A".to_string())]);
        let records: Records = initialize_entity_records(&data);
        assert_eq!(records["a"], SyncRecord::initial(Some("A".to_string())));
    }

    #[test]
    fn merge_keeps_unsynced_local_entities() {
        let records = Records::from([
            ("local_edit".to_string(), unsynced(2)),
            ("local_delete".to_string(), unsynced(3)),
            ("clean".to_string(), synced(1)),
        ]);
        let data = BTreeMap::from([
            ("local_edit".to_string(), "mine".to_string()),
            ("clean".to_string(), "old".to_string()),
        ]);
        let pulled = BTreeMap::from([
            ("local_edit".to_string(), "theirs".to_string()),
            ("local_delete".to_string(), "theirs".to_string()),
            ("clean".to_string(), "new".to_string()),
            ("remote_only".to_string(), "remote".to_string()),
        ]);

        let merged = merge_unsynced_entities(&records, &data, pulled);

        assert_eq!(
            merged.data,
            BTreeMap::from([
                ("local_edit".to_string(), "mine".to_string()),
                ("clean".to_string(), "new".to_string()),
                ("remote_only".to_string(), "remote".to_string()),
            ])
        );
        assert_eq!(merged.records["local_edit"], unsynced(2));
        assert_eq!(merged.records["local_delete"], unsynced(3));
        assert_eq!(
            merged.records["clean"],
            SyncRecord::initial(Some("new".to_string()))
        );
        assert!(!merged.records["remote_only"].is_unsynced());
    }
}
