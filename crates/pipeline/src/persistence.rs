//! Debounced, best-effort persistence of a workspace's components.
//!
//! Mutations call [`PersistenceBridge::schedule`] with the latest snapshot.
//! A background task waits for a quiet period and then saves the most recent
//! snapshot only, retrying once with a short backoff. Failures are logged and
//! exposed through [`PersistenceBridge::status`]; they never reach the action
//! that triggered the save and never roll back in-memory state.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use mosaico_core::project::SaveComponentsRequest;
use mosaico_core::registry::{ComponentRecord, ComponentRegistry};
use mosaico_core::types::DbId;

use crate::collaborators::ProjectStore;

/// Default quiet period before a scheduled save runs.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Default delay before the retry of a failed save.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Tunable parameters for the bridge.
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    pub debounce: Duration,
    /// Delay before the first retry.
    pub retry_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_retry_delay: Duration,
    /// Total attempts per save, the first one included.
    pub max_attempts: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_retry_delay: Duration::from_secs(5),
            max_attempts: 2,
        }
    }
}

/// Double the delay, clamped to [`PersistenceConfig::max_retry_delay`].
pub fn next_delay(current: Duration, config: &PersistenceConfig) -> Duration {
    (current * 2).min(config.max_retry_delay)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistState {
    Idle,
    Pending,
    Saving,
    Saved,
    Failed,
}

/// Soft status indicator for the last save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistStatus {
    pub state: PersistState,
    /// Workspace version of the last successfully saved snapshot.
    pub saved_version: Option<u64>,
    pub last_error: Option<String>,
}

impl Default for PersistStatus {
    fn default() -> Self {
        Self {
            state: PersistState::Idle,
            saved_version: None,
            last_error: None,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingSave {
    version: u64,
    records: Vec<ComponentRecord>,
}

pub struct PersistenceBridge {
    project_id: DbId,
    store: Arc<dyn ProjectStore>,
    config: PersistenceConfig,
    pending: watch::Sender<Option<PendingSave>>,
    status: watch::Sender<PersistStatus>,
    /// Serializes saves from the background task and [`Self::flush`].
    save_lock: Mutex<()>,
    cancel: CancellationToken,
}

impl PersistenceBridge {
    /// Create the bridge and spawn its debounce task. The task stops when
    /// `cancel` is triggered; [`Self::flush`] keeps working afterwards.
    pub fn start(
        project_id: DbId,
        store: Arc<dyn ProjectStore>,
        config: PersistenceConfig,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let (pending, rx) = watch::channel(None);
        let (status, _) = watch::channel(PersistStatus::default());

        let bridge = Arc::new(Self {
            project_id,
            store,
            config,
            pending,
            status,
            save_lock: Mutex::new(()),
            cancel,
        });

        tokio::spawn(bridge.clone().run(rx));
        bridge
    }

    /// Schedule a save of `registry` as of workspace `version`. Only the
    /// latest scheduled snapshot is ever written; a version at or below the
    /// pending one is ignored.
    pub fn schedule(&self, version: u64, registry: &ComponentRegistry) {
        let accepted = self.pending.send_if_modified(|pending| {
            if pending.as_ref().is_some_and(|p| p.version >= version) {
                return false;
            }
            *pending = Some(PendingSave {
                version,
                records: registry.records().to_vec(),
            });
            true
        });
        if accepted {
            self.status.send_modify(|s| s.state = PersistState::Pending);
        } else {
            tracing::debug!(
                project_id = self.project_id,
                version,
                "Ignoring save older than the pending one",
            );
        }
    }

    pub fn status(&self) -> PersistStatus {
        self.status.borrow().clone()
    }

    /// Save the latest scheduled snapshot now. Returns `false` when the save
    /// failed after its retries.
    pub async fn flush(&self) -> bool {
        self.persist_latest().await
    }

    // ---- private helpers ----

    async fn run(self: Arc<Self>, mut rx: watch::Receiver<Option<PendingSave>>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }

            // Restart the quiet period on every new schedule.
            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => return,
                    _ = tokio::time::sleep(self.config.debounce) => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }
            }

            self.persist_latest().await;
        }
        tracing::debug!(project_id = self.project_id, "Persistence task stopped");
    }

    async fn persist_latest(&self) -> bool {
        let _guard = self.save_lock.lock().await;

        let Some(pending) = self.pending.borrow().clone() else {
            return true;
        };
        if self.status.borrow().saved_version >= Some(pending.version) {
            return true;
        }

        self.status.send_modify(|s| s.state = PersistState::Saving);
        let request = SaveComponentsRequest {
            components: pending.records,
        };

        let mut delay = self.config.retry_delay;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.store.save_components(self.project_id, &request).await {
                Ok(resp) => {
                    tracing::info!(
                        project_id = self.project_id,
                        version = pending.version,
                        saved = resp.saved_count,
                        attempt,
                        "Components persisted",
                    );
                    self.status.send_modify(|s| {
                        s.state = PersistState::Saved;
                        s.saved_version = Some(pending.version);
                        s.last_error = None;
                    });
                    return true;
                }
                Err(e) if attempt < self.config.max_attempts => {
                    tracing::warn!(
                        project_id = self.project_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Persisting components failed, retrying",
                    );
                    tokio::time::sleep(delay).await;
                    delay = next_delay(delay, &self.config);
                }
                Err(e) => {
                    tracing::warn!(
                        project_id = self.project_id,
                        attempt,
                        error = %e,
                        "Persisting components failed",
                    );
                    self.status.send_modify(|s| {
                        s.state = PersistState::Failed;
                        s.last_error = Some(e.to_string());
                    });
                    return false;
                }
            }
        }
    }
}

impl fmt::Debug for PersistenceBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceBridge")
            .field("project_id", &self.project_id)
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use mosaico_core::project::{Project, ProjectUpdate};
    use mosaico_core::ComponentType;
    use mosaico_gateway::messages::SaveComponentsResponse;
    use mosaico_gateway::GatewayError;

    /// Records every save; fails the first `failures` calls.
    #[derive(Default)]
    struct RecordingStore {
        saves: StdMutex<Vec<Vec<ComponentRecord>>>,
        failures: StdMutex<u32>,
    }

    impl RecordingStore {
        fn failing(n: u32) -> Self {
            Self {
                failures: StdMutex::new(n),
                ..Default::default()
            }
        }

        fn save_count(&self) -> usize {
            self.saves.lock().unwrap().len()
        }
    }

    fn unavailable() -> GatewayError {
        GatewayError::Api {
            operation: "save components",
            status: 503,
            body: String::new(),
        }
    }

    #[async_trait]
    impl ProjectStore for RecordingStore {
        async fn get_project(&self, _: DbId) -> Result<Project, GatewayError> {
            Err(unavailable())
        }

        async fn update_project(&self, _: DbId, _: &ProjectUpdate) -> Result<Project, GatewayError> {
            Err(unavailable())
        }

        async fn save_components(
            &self,
            project_id: DbId,
            request: &SaveComponentsRequest,
        ) -> Result<SaveComponentsResponse, GatewayError> {
            self.saves.lock().unwrap().push(request.components.clone());
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(unavailable());
            }
            Ok(SaveComponentsResponse {
                project_id,
                saved_count: request.components.len(),
            })
        }
    }

    fn registry(text: &str) -> ComponentRegistry {
        ComponentRegistry::default().upsert(ComponentType::Title, 1, text)
    }

    fn bridge(store: Arc<RecordingStore>) -> Arc<PersistenceBridge> {
        PersistenceBridge::start(1, store, PersistenceConfig::default(), CancellationToken::new())
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_schedules_collapse_into_latest_save() {
        let store = Arc::new(RecordingStore::default());
        let bridge = bridge(store.clone());

        bridge.schedule(1, &registry("a"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        bridge.schedule(2, &registry("b"));
        bridge.schedule(3, &registry("c"));
        tokio::time::sleep(Duration::from_secs(2)).await;

        let saves = store.saves.lock().unwrap().clone();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0][0].generated_content, "c");
        assert_eq!(bridge.status().saved_version, Some(3));
        assert_eq!(bridge.status().state, PersistState::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn one_failure_is_retried() {
        let store = Arc::new(RecordingStore::failing(1));
        let bridge = bridge(store.clone());

        bridge.schedule(1, &registry("a"));
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(store.save_count(), 2);
        assert_eq!(bridge.status().state, PersistState::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_failure_sets_soft_status() {
        let store = Arc::new(RecordingStore::failing(5));
        let bridge = bridge(store.clone());

        bridge.schedule(1, &registry("a"));
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(store.save_count(), 2);
        let status = bridge.status();
        assert_eq!(status.state, PersistState::Failed);
        assert_eq!(status.saved_version, None);
        assert_eq!(status.last_error.as_deref(), Some("Failed to save components: 503"));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_saves_immediately_once() {
        let store = Arc::new(RecordingStore::default());
        let bridge = bridge(store.clone());

        bridge.schedule(4, &registry("a"));
        assert!(bridge.flush().await);
        assert_eq!(store.save_count(), 1);

        // Already saved: neither a second flush nor the debounce task write again.
        assert!(bridge.flush().await);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn older_schedule_does_not_replace_newer() {
        let store = Arc::new(RecordingStore::default());
        let bridge = bridge(store.clone());

        bridge.schedule(2, &registry("newer"));
        bridge.schedule(1, &registry("older"));
        assert!(bridge.flush().await);

        let saves = store.saves.lock().unwrap().clone();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0][0].generated_content, "newer");
        assert_eq!(bridge.status().saved_version, Some(2));
    }

    #[test]
    fn backoff_doubles_and_clamps() {
        let config = PersistenceConfig::default();
        assert_eq!(next_delay(Duration::from_millis(250), &config), Duration::from_millis(500));
        assert_eq!(next_delay(Duration::from_secs(4), &config), Duration::from_secs(5));
    }
}
