//! Offline-first sync engine.
//!
//! Local edits bump an entity's revision in its [`SyncRecord`]. Pushes send
//! the changes of unsynced entities, and results are only applied to entities
//! whose revision has not moved on since the push was built.

mod dispatcher;
mod input;
mod record;
mod records;
mod results;
mod revision;
mod slice;
mod timer;
mod transport;
mod user_data;

pub use dispatcher::{
    DispatcherConfig, DispatcherState, LogNotifier, PushDispatcher, PushHandler, PushReport,
    PushTargets, SyncNotifier, SyncSignals, PUSH_DEBOUNCE, PUSH_RETRY_INTERVAL,
};
pub use input::{
    push_response_to_results, unsynced_to_push_input, ChangeDiff, PushInput, PushInputEntry,
    PushOutcome, PushResultEntry,
};
pub use record::{SyncRecord, SyncTimestamp, SyncedValue};
pub use records::{
    data_for_records, entity_record, entity_records, error_records, initialize_entity_records,
    mark_entities_error, mark_entities_modified, mark_entities_synced, mark_entity_error,
    mark_entity_modified, mark_entity_synced, merge_unsynced_entities, unsynced_records,
    MergedEntities, SyncRecords, SyncedValues,
};
pub use results::{
    apply_sync_results, apply_synced_values_to_data, is_value_for_current_revision,
    values_for_current_revisions, AppliedResults, SyncResults,
};
pub use revision::{next_revision_id, revision_ids_match, RevisionId};
pub use slice::EntitySlice;
pub use timer::RetryTimer;
pub use transport::{HttpUserDataTransport, UserDataTransport};
pub use user_data::{
    prepare_user_data_push, PreparedPush, PushUserDataResults, SoilDataResults, SoilDataSlice,
    SoilMetadataResults, SoilMetadataSlice, UserDataPushInput, UserDataPushResponse,
    UserDataState, UserDataTargets,
};
