//! Sync record model
//!
//! A [`SyncRecord`] tracks the modification history of one entity through an
//! incrementing revision ID and modification timestamp. It can be marked as
//! synced, which records the synced data and revision, or as errored, which
//! records the revision that failed while keeping the data from the last
//! successful sync.
//!
//! Records are values: every transformation returns a new record and leaves
//! the previous one untouched.

use serde::{Deserialize, Serialize};

use super::revision::{next_revision_id, revision_ids_match, RevisionId};

/// Timestamp format used by the sync system (Unix ms).
pub type SyncTimestamp = i64;

/// Sync state of a single entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord<D, E> {
    /// Current local revision, bumped on every local change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<RevisionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<SyncTimestamp>,

    /// Revision last resolved with the server, successfully or not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_revision_id: Option<RevisionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<SyncTimestamp>,
    /// Data as of the last successful sync; the baseline for diffs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_data: Option<D>,
    /// Last sync failure (cleared on sync success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_error: Option<E>,
}

impl<D, E> Default for SyncRecord<D, E> {
    fn default() -> Self {
        Self {
            revision_id: None,
            last_modified_at: None,
            last_synced_revision_id: None,
            last_synced_at: None,
            last_synced_data: None,
            last_synced_error: None,
        }
    }
}

impl<D, E> SyncRecord<D, E> {
    /// A record with no modification or sync history, optionally seeded with
    /// already-synced data.
    #[must_use]
    pub fn initial(data: Option<D>) -> Self {
        Self {
            last_synced_data: data,
            ..Self::default()
        }
    }

    /// The entity has a local revision the server has not confirmed.
    pub fn is_unsynced(&self) -> bool {
        !revision_ids_match(self.revision_id, self.last_synced_revision_id)
    }

    pub const fn is_error(&self) -> bool {
        self.last_synced_error.is_some()
    }
}

impl<D: Clone, E: Clone> SyncRecord<D, E> {
    /// Record a local modification at `at`.
    #[must_use]
    pub fn modified(&self, at: SyncTimestamp) -> Self {
        Self {
            revision_id: Some(next_revision_id(self.revision_id)),
            last_modified_at: Some(at),
            ..self.clone()
        }
    }

    /// Record a successful sync of `revision_id` which produced `data`.
    #[must_use]
    pub fn synced(&self, data: D, revision_id: Option<RevisionId>, at: SyncTimestamp) -> Self {
        Self {
            last_synced_revision_id: revision_id,
            last_synced_data: Some(data),
            last_synced_error: None,
            last_synced_at: Some(at),
            ..self.clone()
        }
    }

    /// Record a failed sync of `revision_id`. The last synced data is kept.
    #[must_use]
    pub fn errored(&self, error: E, revision_id: Option<RevisionId>, at: SyncTimestamp) -> Self {
        Self {
            last_synced_revision_id: revision_id,
            last_synced_error: Some(error),
            last_synced_at: Some(at),
            ..self.clone()
        }
    }
}

/// A value produced by syncing an entity at a given revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedValue<T> {
    pub value: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<RevisionId>,
}

impl<T> SyncedValue<T> {
    pub const fn new(value: T, revision_id: Option<RevisionId>) -> Self {
        Self { value, revision_id }
    }

    /// Whether this value still describes the record's current revision.
    pub fn is_current_for<D, E>(&self, record: &SyncRecord<D, E>) -> bool {
        revision_ids_match(record.revision_id, self.revision_id)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    type Record = SyncRecord<String, String>;

    fn rev(value: u64) -> Option<RevisionId> {
        Some(RevisionId::new(value))
    }

    #[test]
    fn initial_record_has_only_data() {
        let record = Record::initial(Some("data".to_string()));
        assert_eq!(
            record,
            Record {
                last_synced_data: Some("data".to_string()),
                ..Record::default()
            }
        );
        assert!(!record.is_unsynced());
        assert!(!record.is_error());
    }

    #[test]
    fn modified_bumps_revision_and_stamps_time() {
        let record = Record::default().modified(100);
        assert_eq!(record.revision_id, rev(1));
        assert_eq!(record.last_modified_at, Some(100));
        assert!(record.is_unsynced());

        let record = record.modified(200);
        assert_eq!(record.revision_id, rev(2));
        assert_eq!(record.last_modified_at, Some(200));
    }

    #[test]
    fn modified_keeps_sync_fields() {
        let record = Record::default()
            .modified(1)
            .synced("synced".to_string(), rev(1), 2)
            .modified(3);
        assert_eq!(record.last_synced_revision_id, rev(1));
        assert_eq!(record.last_synced_data.as_deref(), Some("synced"));
        assert_eq!(record.last_synced_at, Some(2));
    }

    #[test]
    fn modified_does_not_touch_the_original() {
        let original = Record::default().modified(1);
        let _next = original.modified(2);
        assert_eq!(original.revision_id, rev(1));
        assert_eq!(original.last_modified_at, Some(1));
    }

    #[test]
    fn synced_records_data_and_clears_error() {
        let record = Record {
            revision_id: rev(2),
            last_synced_error: Some("boom".to_string()),
            ..Record::default()
        };
        let synced = record.synced("server".to_string(), rev(2), 500);
        assert_eq!(synced.last_synced_error, None);
        assert_eq!(synced.last_synced_data.as_deref(), Some("server"));
        assert_eq!(synced.last_synced_revision_id, rev(2));
        assert_eq!(synced.last_synced_at, Some(500));
        assert!(!synced.is_unsynced());
        assert!(!synced.is_error());
    }

    #[test]
    fn errored_keeps_last_synced_data() {
        let record = Record {
            revision_id: rev(3),
            last_synced_data: Some("good".to_string()),
            ..Record::default()
        };
        let errored = record.errored("NOT_ALLOWED".to_string(), rev(3), 700);
        assert_eq!(errored.last_synced_data.as_deref(), Some("good"));
        assert_eq!(errored.last_synced_error.as_deref(), Some("NOT_ALLOWED"));
        assert_eq!(errored.last_synced_revision_id, rev(3));
        assert_eq!(errored.last_synced_at, Some(700));
        assert!(errored.is_error());
        assert!(!errored.is_unsynced());
    }

    #[test]
    fn unsynced_is_negated_revision_match() {
        let cases = [
            (None, None),
            (rev(1), None),
            (None, rev(1)),
            (rev(1), rev(0)),
            (rev(4), rev(4)),
        ];
        for (revision_id, last_synced_revision_id) in cases {
            let record = Record {
                revision_id,
                last_synced_revision_id,
                ..Record::default()
            };
            assert_eq!(
                record.is_unsynced(),
                !revision_ids_match(revision_id, last_synced_revision_id)
            );
        }
    }

    #[test]
    fn synced_value_matches_current_revision_only() {
        let record = Record {
            revision_id: rev(2),
            ..Record::default()
        };
        assert!(SyncedValue::new("x", rev(2)).is_current_for(&record));
        assert!(!SyncedValue::new("x", rev(1)).is_current_for(&record));
        assert!(SyncedValue::new("x", None).is_current_for(&Record::default()));
    }

    #[test]
    fn record_deserializes_with_missing_fields() {
        let record: Record = serde_json::from_str("{}").unwrap();
        assert_eq!(record, Record::default());

        let record: Record =
            serde_json::from_str(r#"{"revisionId":2,"lastSyncedRevisionId":1}"#).unwrap();
        assert!(record.is_unsynced());
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    enum Reason {
        NotAllowed,
    }

    #[test]
    fn record_deserializes_without_default_payload_types() {
        let record: SyncRecord<Vec<u8>, Reason> =
            serde_json::from_str(r#"{"revisionId":1,"lastSyncedRevisionId":1}"#).unwrap();
        assert_eq!(record.last_synced_data, None);
        assert_eq!(record.last_synced_error, None);

        let record: SyncRecord<Vec<u8>, Reason> =
            serde_json::from_str(r#"{"revisionId":1,"lastSyncedError":"NotAllowed"}"#).unwrap();
        assert_eq!(record.last_synced_error, Some(Reason::NotAllowed));
    }
}
