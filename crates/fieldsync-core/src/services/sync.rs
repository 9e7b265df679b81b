//! Shared sync service used by clients.
//!
//! Owns the user data state, publishes the signals the push dispatcher
//! watches, and performs pushes against a [`UserDataTransport`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::models::{SoilData, SoilMetadata, UserMatchRating};
use crate::state::SyncState;
use crate::sync::{
    prepare_user_data_push, PushHandler, PushReport, PushTargets, SyncSignals, UserDataPushInput,
    UserDataState, UserDataTargets, UserDataTransport,
};
use crate::util::sync_timestamp_now;
use crate::Result;

pub type UserDataSignals = SyncSignals<UserDataTargets>;

/// Thread-safe holder for sync state and its push transport.
pub struct SyncService<T> {
    state: Arc<Mutex<UserDataState>>,
    transport: Arc<T>,
    signals: Arc<watch::Sender<UserDataSignals>>,
}

impl<T> Clone for SyncService<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            transport: Arc::clone(&self.transport),
            signals: Arc::clone(&self.signals),
        }
    }
}

impl<T: UserDataTransport> SyncService<T> {
    /// Service over previously persisted (or empty) state. Starts logged out
    /// and online.
    pub fn new(transport: T, state: UserDataState) -> Self {
        let signals = SyncSignals {
            logged_in: false,
            offline: false,
            unsynced: state.unsynced_targets(),
        };
        let (signals, _) = watch::channel(signals);
        Self {
            state: Arc::new(Mutex::new(state)),
            transport: Arc::new(transport),
            signals: Arc::new(signals),
        }
    }

    /// Receiver for the dispatcher.
    pub fn signals(&self) -> watch::Receiver<UserDataSignals> {
        self.signals.subscribe()
    }

    pub fn current_signals(&self) -> UserDataSignals {
        self.signals.borrow().clone()
    }

    pub fn set_logged_in(&self, logged_in: bool) {
        self.signals.send_if_modified(|signals| {
            let changed = signals.logged_in != logged_in;
            signals.logged_in = logged_in;
            changed
        });
    }

    pub fn set_offline(&self, offline: bool) {
        self.signals.send_if_modified(|signals| {
            let changed = signals.offline != offline;
            signals.offline = offline;
            changed
        });
    }

    pub async fn snapshot(&self) -> UserDataState {
        self.state.lock().await.clone()
    }

    pub async fn soil_data(&self, site_id: &str) -> Option<SoilData> {
        self.state.lock().await.soil_data.get(site_id).cloned()
    }

    pub async fn soil_metadata(&self, site_id: &str) -> Option<SoilMetadata> {
        self.state.lock().await.soil_metadata.get(site_id).cloned()
    }

    pub async fn update_soil_data(&self, site_id: &str, data: SoilData) {
        let mut state = self.state.lock().await;
        state.soil_data.update(site_id, data, sync_timestamp_now());
        self.publish_local_change(&state);
    }

    /// Forget a site's soil data locally. Deletions are never pushed.
    pub async fn delete_soil_data(&self, site_id: &str) -> Option<SoilData> {
        let mut state = self.state.lock().await;
        let removed = state.soil_data.delete(site_id);
        self.publish_unsynced(&state);
        removed
    }

    pub async fn update_soil_metadata(&self, site_id: &str, metadata: SoilMetadata) {
        let mut state = self.state.lock().await;
        state
            .soil_metadata
            .update(site_id, metadata, sync_timestamp_now());
        self.publish_local_change(&state);
    }

    /// Set or clear the user's rating of one soil match at a site.
    pub async fn rate_soil_match(
        &self,
        site_id: &str,
        soil_match_id: &str,
        rating: Option<UserMatchRating>,
    ) {
        let mut state = self.state.lock().await;
        let metadata = state
            .soil_metadata
            .get(site_id)
            .cloned()
            .unwrap_or_default()
            .with_rating(soil_match_id, rating);
        state
            .soil_metadata
            .update(site_id, metadata, sync_timestamp_now());
        self.publish_local_change(&state);
    }

    /// Replace local data with pulled server data, keeping unsynced edits.
    pub async fn apply_pull(
        &self,
        soil_data: BTreeMap<String, SoilData>,
        soil_metadata: BTreeMap<String, SoilMetadata>,
    ) {
        let mut state = self.state.lock().await;
        state.soil_data.replace_from_pull(soil_data);
        state.soil_metadata.replace_from_pull(soil_metadata);
        self.publish_unsynced(&state);
    }

    /// The request a push of everything unsynced would send right now.
    pub async fn pending_input(&self) -> Option<UserDataPushInput> {
        let state = self.state.lock().await;
        prepare_user_data_push(&state, &state.unsynced_targets()).map(|prepared| prepared.input)
    }

    pub async fn sync_state(&self) -> SyncState {
        let offline = self.signals.borrow().offline;
        let state = self.state.lock().await;
        SyncState::summarize(
            offline,
            !state.unsynced_targets().is_empty(),
            !state.error_targets().is_empty(),
        )
    }

    /// Push everything currently unsynced.
    pub async fn push_unsynced(&self) -> Result<PushReport> {
        let targets = self.state.lock().await.unsynced_targets();
        self.push_targets(&targets).await
    }

    /// Push the unsynced entities among `targets` and apply the results.
    ///
    /// The state lock is released while the request is in flight. Edits made
    /// meanwhile win over the response for the entities they touch.
    pub async fn push_targets(&self, targets: &UserDataTargets) -> Result<PushReport> {
        let prepared = {
            let state = self.state.lock().await;
            prepare_user_data_push(&state, targets)
        };
        let Some(prepared) = prepared else {
            tracing::debug!("Nothing to push for {:?}", targets);
            return Ok(PushReport::default());
        };

        tracing::info!("Pushing {} entries", prepared.input.entry_count());
        let response = self.transport.push_user_data(&prepared.input).await?;
        let results = prepared.results_from_response(response)?;
        let rejected = results.soil_data_results.as_ref().map_or(0, |r| r.errors.len())
            + results
                .soil_metadata_results
                .as_ref()
                .map_or(0, |r| r.errors.len());

        let mut state = self.state.lock().await;
        let applied = state.apply_results(&results, sync_timestamp_now());
        self.publish_unsynced(&state);

        tracing::info!(
            "Push applied: {} synced, {} rejected, {} stale",
            applied.synced.len(),
            rejected,
            applied.stale.len()
        );
        Ok(PushReport {
            synced: applied.synced.len(),
            errored: rejected,
            stale: applied.stale.len(),
        })
    }

    /// Every local edit is a new trigger, even if the unsynced set is unchanged.
    fn publish_local_change(&self, state: &UserDataState) {
        let unsynced = state.unsynced_targets();
        self.signals.send_modify(|signals| signals.unsynced = unsynced);
    }

    fn publish_unsynced(&self, state: &UserDataState) {
        let unsynced = state.unsynced_targets();
        self.signals.send_if_modified(|signals| {
            let changed = signals.unsynced != unsynced;
            signals.unsynced = unsynced;
            changed
        });
    }
}

impl<T: UserDataTransport> PushHandler for SyncService<T> {
    type Targets = UserDataTargets;

    async fn push(&self, targets: &UserDataTargets) -> Result<PushReport> {
        self.push_targets(targets).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use tokio::sync::Notify;

    use super::*;
    use crate::models::{
        SoilDataPushEntry, SoilDataPushFailureReason, SoilDataPushResult,
    };
    use crate::sync::{
        DispatcherConfig, LogNotifier, PushDispatcher, SoilDataSlice, UserDataPushResponse,
    };
    use crate::Error;

    #[derive(Default)]
    struct MockTransport {
        inputs: StdMutex<Vec<serde_json::Value>>,
        responses: StdMutex<VecDeque<Result<UserDataPushResponse>>>,
        started: Notify,
        gate: Option<Arc<Notify>>,
    }

    impl MockTransport {
        fn responding(responses: Vec<Result<UserDataPushResponse>>) -> Self {
            Self {
                responses: StdMutex::new(responses.into()),
                ..Self::default()
            }
        }

        fn inputs(&self) -> Vec<serde_json::Value> {
            self.inputs.lock().unwrap().clone()
        }
    }

    impl UserDataTransport for MockTransport {
        async fn push_user_data(&self, input: &UserDataPushInput) -> Result<UserDataPushResponse> {
            self.inputs
                .lock()
                .unwrap()
                .push(serde_json::to_value(input).unwrap());
            self.started.notify_one();
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(UserDataPushResponse::default()))
        }
    }

    fn soil(aspect: u32) -> SoilData {
        SoilData {
            slope_aspect: Some(aspect),
            ..SoilData::default()
        }
    }

    fn soil_success(site_id: &str, data: SoilData) -> UserDataPushResponse {
        UserDataPushResponse {
            soil_data_results: Some(vec![SoilDataPushEntry {
                site_id: site_id.to_string(),
                result: SoilDataPushResult::Success { soil_data: data },
            }]),
            soil_metadata_results: None,
        }
    }

    #[tokio::test]
    async fn push_syncs_local_edit() {
        let server_copy = SoilData {
            grazing_select: Some("NONE".to_string()),
            ..soil(90)
        };
        let service = SyncService::new(
            MockTransport::responding(vec![Ok(soil_success("site-1", server_copy.clone()))]),
            UserDataState::default(),
        );
        let signals = service.signals();

        service.update_soil_data("site-1", soil(90)).await;
        assert_eq!(
            signals.borrow().unsynced.soil_data_site_ids,
            vec!["site-1".to_string()]
        );
        assert_eq!(service.sync_state().await, SyncState::Syncing);

        let report = service.push_unsynced().await.unwrap();

        assert_eq!(report.synced, 1);
        assert_eq!(service.transport.inputs().len(), 1);
        assert_eq!(service.soil_data("site-1").await, Some(server_copy));
        assert!(signals.borrow().unsynced.is_empty());
        assert_eq!(service.sync_state().await, SyncState::Synced);
        assert!(service.pending_input().await.is_none());
    }

    #[tokio::test]
    async fn edit_during_push_wins_over_stale_response() {
        let gate = Arc::new(Notify::new());
        let transport = MockTransport {
            responses: StdMutex::new(VecDeque::from([
                Ok(soil_success("site-1", soil(1))),
                Ok(soil_success("site-1", soil(2))),
            ])),
            gate: Some(Arc::clone(&gate)),
            ..MockTransport::default()
        };
        let service = SyncService::new(transport, UserDataState::default());
        service.update_soil_data("site-1", soil(1)).await;

        let in_flight = tokio::spawn({
            let service = service.clone();
            async move { service.push_unsynced().await }
        });
        service.transport.started.notified().await;
        service.update_soil_data("site-1", soil(2)).await;
        gate.notify_one();

        let report = in_flight.await.unwrap().unwrap();
        assert_eq!(report.stale, 1);
        assert_eq!(service.soil_data("site-1").await, Some(soil(2)));
        assert_eq!(
            service.current_signals().unsynced.soil_data_site_ids,
            vec!["site-1".to_string()]
        );

        let second = tokio::spawn({
            let service = service.clone();
            async move { service.push_unsynced().await }
        });
        service.transport.started.notified().await;
        gate.notify_one();
        let report = second.await.unwrap().unwrap();

        assert_eq!(report.synced, 1);
        let inputs = service.transport.inputs();
        assert_eq!(inputs[1]["soilDataEntries"][0]["soilData"]["slopeAspect"], 2);
        assert!(service.current_signals().unsynced.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_leaves_records_untouched() {
        let service = SyncService::new(
            MockTransport::responding(vec![Err(Error::Transport("offline".to_string()))]),
            UserDataState::default(),
        );
        service.update_soil_data("site-1", soil(5)).await;
        let before = service.snapshot().await;

        assert!(service.push_unsynced().await.is_err());

        assert_eq!(service.snapshot().await, before);
    }

    #[tokio::test]
    async fn response_without_results_is_a_transport_failure() {
        let service = SyncService::new(
            MockTransport::responding(vec![Ok(UserDataPushResponse::default())]),
            UserDataState::default(),
        );
        service.update_soil_data("site-1", soil(5)).await;
        let before = service.snapshot().await;

        let result = service.push_unsynced().await;

        assert!(matches!(result, Err(Error::Transport(_))));
        assert_eq!(service.snapshot().await, before);
        assert_eq!(
            service.current_signals().unsynced.soil_data_site_ids,
            vec!["site-1".to_string()]
        );
    }

    #[tokio::test]
    async fn deleted_synced_site_is_not_pending() {
        let state = UserDataState {
            soil_data: SoilDataSlice::from_synced(BTreeMap::from([(
                "site-1".to_string(),
                soil(3),
            )])),
            ..UserDataState::default()
        };
        let service = SyncService::new(MockTransport::default(), state);

        assert_eq!(service.delete_soil_data("site-1").await, Some(soil(3)));

        assert!(service.current_signals().unsynced.is_empty());
        assert!(service.pending_input().await.is_none());
        assert_eq!(service.sync_state().await, SyncState::Synced);
        assert_eq!(service.push_unsynced().await.unwrap(), PushReport::default());
        assert!(service.transport.inputs().is_empty());
        assert_eq!(service.delete_soil_data("site-1").await, None);
    }

    #[tokio::test]
    async fn rejected_entity_is_recorded_as_error() {
        let service = SyncService::new(
            MockTransport::responding(vec![Ok(UserDataPushResponse {
                soil_data_results: Some(vec![SoilDataPushEntry {
                    site_id: "site-1".to_string(),
                    result: SoilDataPushResult::Failure {
                        reason: SoilDataPushFailureReason::NotAllowed,
                    },
                }]),
                soil_metadata_results: None,
            })]),
            UserDataState::default(),
        );
        service.update_soil_data("site-1", soil(5)).await;

        let report = service.push_unsynced().await.unwrap();

        assert!(report.has_entity_errors());
        let state = service.snapshot().await;
        assert_eq!(
            state.soil_data.sync["site-1"].last_synced_error,
            Some(SoilDataPushFailureReason::NotAllowed)
        );
        assert_eq!(state.soil_data.get("site-1"), Some(&soil(5)));
        assert_eq!(service.sync_state().await, SyncState::Error);
    }

    #[tokio::test]
    async fn rating_updates_metadata_and_signals() {
        let service = SyncService::new(MockTransport::default(), UserDataState::default());

        service
            .rate_soil_match("site-1", "match-1", Some(UserMatchRating::Rejected))
            .await;

        let metadata = service.soil_metadata("site-1").await.unwrap();
        assert_eq!(metadata.rating_for("match-1"), Some(UserMatchRating::Rejected));
        assert_eq!(
            service.current_signals().unsynced.soil_metadata_site_ids,
            vec!["site-1".to_string()]
        );
    }

    #[tokio::test]
    async fn pull_keeps_unsynced_edits() {
        let service = SyncService::new(MockTransport::default(), UserDataState::default());
        service.update_soil_data("site-1", soil(1)).await;

        service
            .apply_pull(
                BTreeMap::from([
                    ("site-1".to_string(), soil(100)),
                    ("site-2".to_string(), soil(200)),
                ]),
                BTreeMap::new(),
            )
            .await;

        assert_eq!(service.soil_data("site-1").await, Some(soil(1)));
        assert_eq!(service.soil_data("site-2").await, Some(soil(200)));
    }

    #[tokio::test(start_paused = true)]
    async fn dispatcher_pushes_local_edits() {
        let service = SyncService::new(
            MockTransport::responding(vec![Ok(soil_success("site-1", soil(7)))]),
            UserDataState::default(),
        );
        let dispatcher = PushDispatcher::spawn(
            Arc::new(service.clone()),
            Arc::new(LogNotifier),
            service.signals(),
            DispatcherConfig::default(),
        );

        service.update_soil_data("site-1", soil(7)).await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(service.transport.inputs().is_empty());

        service.set_logged_in(true);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(service.transport.inputs().len(), 1);
        assert!(service.current_signals().unsynced.is_empty());
        assert_eq!(service.sync_state().await, SyncState::Synced);

        dispatcher.shutdown().await;
    }
}
