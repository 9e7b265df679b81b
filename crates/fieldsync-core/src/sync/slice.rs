//! Entity data paired with its sync records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::record::SyncTimestamp;
use super::records::{
    error_records, mark_entity_modified, merge_unsynced_entities, unsynced_records, SyncRecords,
};
use super::results::{apply_sync_results, AppliedResults, SyncResults};

/// Live data for one entity kind and the sync records tracking it.
///
/// All local writes go through this type so every data change also bumps the
/// entity's revision. Deletion is local only and forgets the entity entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySlice<D, E> {
    #[serde(default = "BTreeMap::new")]
    pub data: BTreeMap<String, D>,
    #[serde(default = "BTreeMap::new")]
    pub sync: SyncRecords<D, E>,
}

impl<D, E> Default for EntitySlice<D, E> {
    fn default() -> Self {
        Self {
            data: BTreeMap::new(),
            sync: BTreeMap::new(),
        }
    }
}

impl<D: Clone, E: Clone> EntitySlice<D, E> {
    /// Slice seeded with data that is already in sync with the server.
    pub fn from_synced(data: BTreeMap<String, D>) -> Self {
        let sync = super::records::initialize_entity_records(&data);
        Self { data, sync }
    }

    pub fn get(&self, id: &str) -> Option<&D> {
        self.data.get(id)
    }

    /// Store new local data for `id` and record the modification.
    pub fn update(&mut self, id: &str, data: D, at: SyncTimestamp) {
        self.data.insert(id.to_string(), data);
        mark_entity_modified(&mut self.sync, id, at);
    }

    /// Drop local data for `id` along with its sync record.
    ///
    /// Nothing is pushed for a deletion. Returns the removed data, if any.
    pub fn delete(&mut self, id: &str) -> Option<D> {
        self.sync.remove(id);
        self.data.remove(id)
    }

    pub fn unsynced_ids(&self) -> Vec<String> {
        unsynced_records(&self.sync).into_keys().collect()
    }

    pub fn error_ids(&self) -> Vec<String> {
        error_records(&self.sync).into_keys().collect()
    }

    pub fn apply_results(&mut self, results: &SyncResults<D, E>, at: SyncTimestamp) -> AppliedResults {
        apply_sync_results(&mut self.data, &mut self.sync, results, at)
    }

    /// Replace the slice with pulled data, keeping unsynced local entities.
    pub fn replace_from_pull(&mut self, pulled: BTreeMap<String, D>) {
        let merged = merge_unsynced_entities(&self.sync, &self.data, pulled);
        self.data = merged.data;
        self.sync = merged.records;
    }
}
