//! Background push dispatcher.
//!
//! Watches the auth, connectivity and unsynced-entity signals, waits for them
//! to settle, and pushes whenever the user is logged in, online and has
//! unsynced data. Failed pushes are retried on a fixed interval until they
//! succeed or the signals change.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use super::timer::RetryTimer;
use crate::error::Result;

pub const PUSH_DEBOUNCE: Duration = Duration::from_millis(500);
pub const PUSH_RETRY_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// How long the signals must stay unchanged before they are acted on.
    pub debounce: Duration,
    /// Fixed delay before retrying a failed push.
    pub retry_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            debounce: PUSH_DEBOUNCE,
            retry_interval: PUSH_RETRY_INTERVAL,
        }
    }
}

/// The set of entities a push should cover.
pub trait PushTargets: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    fn is_empty(&self) -> bool;
}

impl PushTargets for Vec<String> {
    fn is_empty(&self) -> bool {
        Vec::is_empty(self)
    }
}

/// External inputs that decide whether a push is needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSignals<T> {
    pub logged_in: bool,
    pub offline: bool,
    pub unsynced: T,
}

impl<T: PushTargets> SyncSignals<T> {
    pub fn needs_push(&self) -> bool {
        self.logged_in && !self.offline && !self.unsynced.is_empty()
    }
}

/// Counts of what happened to the entities in one push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushReport {
    pub synced: usize,
    pub errored: usize,
    pub stale: usize,
}

impl PushReport {
    pub const fn has_entity_errors(&self) -> bool {
        self.errored > 0
    }
}

/// Performs one push for the given targets and applies its results.
///
/// `Err` means the push as a whole failed and nothing was applied.
pub trait PushHandler: Send + Sync + 'static {
    type Targets: PushTargets;

    fn push(&self, targets: &Self::Targets) -> impl Future<Output = Result<PushReport>> + Send;
}

/// User-facing sink for sync failures.
pub trait SyncNotifier: Send + Sync + 'static {
    fn show_sync_error(&self);
}

/// Notifier that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl SyncNotifier for LogNotifier {
    fn show_sync_error(&self) {
        tracing::warn!("Some changes could not be synced");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Pushing,
    RetryWaiting,
}

/// What a pending retry does when it fires.
#[derive(Debug, Clone)]
enum RetryPlan<T> {
    /// Push the batch that failed in transport again.
    SameBatch(T),
    /// Push whatever is unsynced at that point.
    Reevaluate,
}

/// Handle to the dispatcher task. Dropping it stops the task.
#[derive(Debug)]
pub struct PushDispatcher {
    state: watch::Receiver<DispatcherState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PushDispatcher {
    pub fn spawn<P, N>(
        handler: Arc<P>,
        notifier: Arc<N>,
        signals: watch::Receiver<SyncSignals<P::Targets>>,
        config: DispatcherConfig,
    ) -> Self
    where
        P: PushHandler,
        N: SyncNotifier,
    {
        let (state_tx, state_rx) = watch::channel(DispatcherState::Idle);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let worker = DispatchLoop {
            handler,
            notifier,
            signals,
            config,
            state: state_tx,
            retry: RetryTimer::new(),
            plan: None,
        };
        let task = tokio::spawn(worker.run(shutdown_rx));

        Self {
            state: state_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    pub fn state(&self) -> DispatcherState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<DispatcherState> {
        self.state.clone()
    }

    /// Stop the task and clear any pending retry.
    ///
    /// A push already in flight is allowed to finish first.
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                tracing::warn!("Push dispatcher task ended abnormally: {}", error);
            }
        }
    }
}

impl Drop for PushDispatcher {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct DispatchLoop<P: PushHandler, N> {
    handler: Arc<P>,
    notifier: Arc<N>,
    signals: watch::Receiver<SyncSignals<P::Targets>>,
    config: DispatcherConfig,
    state: watch::Sender<DispatcherState>,
    retry: RetryTimer,
    plan: Option<RetryPlan<P::Targets>>,
}

impl<P: PushHandler, N: SyncNotifier> DispatchLoop<P, N> {
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        tracing::debug!("Push dispatcher started");

        if self.settle(&mut shutdown).await {
            self.evaluate().await;

            loop {
                tokio::select! {
                    _ = &mut shutdown => break,
                    changed = self.signals.changed() => {
                        if changed.is_err() || !self.settle(&mut shutdown).await {
                            break;
                        }
                        self.evaluate().await;
                    }
                    () = self.retry.fired() => self.run_retry().await,
                }
            }
        }

        self.retry.cancel();
        self.plan = None;
        self.set_state(DispatcherState::Idle);
        tracing::debug!("Push dispatcher stopped");
    }

    /// Wait until the signals have been quiet for the debounce window.
    ///
    /// Returns false when the dispatcher should stop.
    async fn settle(&mut self, shutdown: &mut oneshot::Receiver<()>) -> bool {
        loop {
            tokio::select! {
                _ = &mut *shutdown => return false,
                changed = self.signals.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
                () = tokio::time::sleep(self.config.debounce) => return true,
            }
        }
    }

    /// Re-read the settled signals. Any change cancels a pending retry.
    async fn evaluate(&mut self) {
        let signals = self.signals.borrow_and_update().clone();

        if self.retry.cancel() {
            tracing::debug!("Cancelled pending push retry; sync inputs changed");
        }
        self.plan = None;

        if signals.needs_push() {
            self.dispatch(signals.unsynced).await;
        } else {
            self.set_state(DispatcherState::Idle);
        }
    }

    async fn run_retry(&mut self) {
        match self.plan.take() {
            Some(RetryPlan::SameBatch(targets)) => {
                tracing::info!("Retrying failed push");
                self.dispatch(targets).await;
            }
            Some(RetryPlan::Reevaluate) => {
                let signals = self.signals.borrow().clone();
                if signals.needs_push() {
                    tracing::info!("Retrying push for unsynced entities");
                    self.dispatch(signals.unsynced).await;
                } else {
                    self.set_state(DispatcherState::Idle);
                }
            }
            None => self.set_state(DispatcherState::Idle),
        }
    }

    async fn dispatch(&mut self, targets: P::Targets) {
        self.set_state(DispatcherState::Pushing);
        tracing::debug!("Pushing {:?}", targets);

        match self.handler.push(&targets).await {
            Ok(report) if !report.has_entity_errors() => {
                tracing::debug!(
                    "Push finished: {} synced, {} stale",
                    report.synced,
                    report.stale
                );
                self.retry.cancel();
                self.set_state(DispatcherState::Idle);
            }
            Ok(report) => {
                tracing::warn!("Push finished with {} entity errors", report.errored);
                self.notifier.show_sync_error();
                self.schedule_retry(RetryPlan::Reevaluate);
            }
            Err(error) => {
                tracing::warn!("Push failed: {}", error);
                self.notifier.show_sync_error();
                self.schedule_retry(RetryPlan::SameBatch(targets));
            }
        }
    }

    fn schedule_retry(&mut self, plan: RetryPlan<P::Targets>) {
        self.plan = Some(plan);
        self.retry.schedule(self.config.retry_interval);
        self.set_state(DispatcherState::RetryWaiting);
    }

    fn set_state(&self, state: DispatcherState) {
        self.state.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }
}
