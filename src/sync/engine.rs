//! SyncEngine - the periodic pull/push loop
//!
//! Each tick runs the sync process in strict phase order:
//!
//! 1. classify the connection (offline / missing config / ready)
//! 2. pull everything published since `lastPulledAt` minus the overlap
//! 3. reconcile pulled entities with the change queue (fresher queued
//!    changes win; stale ones are dropped so they cannot overwrite
//!    newer remote state)
//! 4. reconcile the survivors with the domain and apply them through
//!    the stores' external-source path
//! 5. drain the queue by pushing each pending change
//!
//! Ticks are serialized; a new tick never starts before the previous
//! one finished. The loop never returns errors: every failure folds
//! into a status transition.

use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::Client;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};

use crate::config::{ClientConfig, PULL_OVERLAP_SECONDS};
use crate::domain::{Metric, Symptom};
use crate::persistence::LocalStore;
use crate::remote::{ApiClient, PushAllOutcome, RemoteConfig, RemoteError};
use crate::store::{MetricStore, SettingsStore, SymptomStore};

use super::change::ChangeToPush;
use super::queue::ChangeQueue;
use super::status::{classify_connection, ConnectionStatus, ConnectivityProbe, SyncStatus};

const STATUS_CHANNEL_CAPACITY: usize = 64;

/// Knobs for the sync process
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Backward shift applied to `lastPulledAt` before each pull
    pub pull_overlap_seconds: i64,
    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pull_overlap_seconds: PULL_OVERLAP_SECONDS,
            request_timeout_ms: 5000,
        }
    }
}

impl From<&ClientConfig> for SyncConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            pull_overlap_seconds: config.pull_overlap_seconds,
            request_timeout_ms: config.request_timeout_ms,
        }
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub status: SyncStatus,
    /// Pulled symptoms that survived reconciliation and were applied
    pub pulled_symptoms: usize,
    /// Pulled metrics that survived reconciliation and were applied
    pub pulled_metrics: usize,
    /// Queued changes successfully published
    pub pushed: usize,
}

impl TickOutcome {
    fn skipped(status: SyncStatus) -> Self {
        Self {
            status,
            pulled_symptoms: 0,
            pulled_metrics: 0,
            pushed: 0,
        }
    }

    /// Whether the tick applied any pulled data to the domain
    pub fn applied_pull(&self) -> bool {
        self.pulled_symptoms > 0 || self.pulled_metrics > 0
    }
}

/// Errors from the user-initiated bulk upload
///
/// The periodic loop never surfaces these; only `push_all` does.
#[derive(Error, Debug)]
pub enum SyncError {
    /// API URL or token is not configured
    #[error("API URL or token not configured")]
    MissingConfig,

    /// The remote call failed
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Single-writer cooperative sync loop over the three stores
pub struct SyncEngine {
    symptoms: Arc<RwLock<SymptomStore>>,
    metrics: Arc<RwLock<MetricStore>>,
    settings: Arc<RwLock<SettingsStore>>,
    local: Arc<LocalStore>,
    queue: RwLock<ChangeQueue>,
    http: Client,
    connectivity: Arc<dyn ConnectivityProbe>,
    status: RwLock<SyncStatus>,
    status_tx: broadcast::Sender<SyncStatus>,
    config: SyncConfig,
    /// Serializes ticks; a tick in flight blocks the next one
    tick: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        symptoms: Arc<RwLock<SymptomStore>>,
        metrics: Arc<RwLock<MetricStore>>,
        settings: Arc<RwLock<SettingsStore>>,
        local: Arc<LocalStore>,
        connectivity: Arc<dyn ConnectivityProbe>,
        config: SyncConfig,
    ) -> Self {
        let http = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .expect("failed to create HTTP client");
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);

        Self {
            symptoms,
            metrics,
            settings,
            local,
            queue: RwLock::new(ChangeQueue::new()),
            http,
            connectivity,
            status: RwLock::new(SyncStatus::WaitingToSync),
            status_tx,
            config,
            tick: Mutex::new(()),
        }
    }

    /// Subscribe to status transitions
    pub fn subscribe_status(&self) -> broadcast::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    /// Current sync status
    pub async fn status(&self) -> SyncStatus {
        *self.status.read().await
    }

    pub async fn queue_len(&self) -> usize {
        self.queue.read().await.len()
    }

    pub async fn queue_is_empty(&self) -> bool {
        self.queue.read().await.is_empty()
    }

    /// Load a persisted queue snapshot on startup
    ///
    /// The changes are replayed by the next tick.
    pub async fn hydrate_queue(&self, changes: Vec<ChangeToPush>) {
        self.queue.write().await.hydrate(changes);
    }

    /// Enqueue a local mutation for the next push
    ///
    /// Merges with any pending change for the same entity and persists
    /// the queue before returning.
    pub async fn queue_change(&self, change: ChangeToPush) {
        self.queue.write().await.enqueue(change);
        self.persist_queue().await;
        self.publish(SyncStatus::WaitingToSync).await;
    }

    /// Run one sync tick
    pub async fn sync_once(&self) -> TickOutcome {
        let _tick = self.tick.lock().await;

        // 1. Classify
        let settings = self.settings.read().await.settings().clone();
        let device_online = self.connectivity.is_online();

        let remote_config = match classify_connection(&settings, device_online) {
            ConnectionStatus::DeviceReady => RemoteConfig::new(
                settings.api_url.clone().unwrap_or_default(),
                settings.api_token.clone().unwrap_or_default(),
            ),
            reason => {
                if reason == ConnectionStatus::MissingConfig {
                    tracing::debug!("sync skipped, API URL or token not configured");
                }
                let status = if self.queue.read().await.is_empty() {
                    SyncStatus::Offline
                } else {
                    SyncStatus::OfflinePendingPush
                };
                self.publish(status).await;
                return TickOutcome::skipped(status);
            }
        };

        let client = ApiClient::from_parts(self.http.clone(), remote_config);

        // 2. Pull
        self.publish(SyncStatus::Pulling).await;
        let since = settings
            .last_pulled_at
            .map(|anchor| anchor - Duration::seconds(self.config.pull_overlap_seconds));
        let current_pull_date = Utc::now();

        let batch = match client.read_all(since).await {
            Ok(batch) => batch,
            Err(error) => {
                tracing::warn!(error = %error, "pull failed");
                self.publish(SyncStatus::OnlineButSyncFailed).await;
                return TickOutcome::skipped(SyncStatus::OnlineButSyncFailed);
            }
        };

        // The anchor advances only after a successful pull, to the
        // instant recorded before the request went out
        self.settings
            .write()
            .await
            .set_last_pulled_at(current_pull_date);
        if let Err(error) = self.local.write_last_pull_date(current_pull_date).await {
            tracing::warn!(error = %error, "failed to persist last pull date");
        }

        // 3. Reconcile pulled entities with the queue
        let mut queue_changed = false;
        let (mut symptoms, mut metrics) = {
            let mut queue = self.queue.write().await;
            let symptoms: Vec<Symptom> = batch
                .symptoms
                .into_iter()
                .filter(|pulled| {
                    survives_queue(&mut queue, &pulled.id, pulled.last_modified, &mut queue_changed)
                })
                .collect();
            let metrics: Vec<Metric> = batch
                .metrics
                .into_iter()
                .filter(|pulled| {
                    survives_queue(&mut queue, &pulled.id, pulled.last_modified, &mut queue_changed)
                })
                .collect();
            (symptoms, metrics)
        };
        if queue_changed {
            self.persist_queue().await;
        }

        // 4. Reconcile the survivors with the domain and apply them
        {
            let store = self.symptoms.read().await;
            symptoms.retain(|pulled| keep_pulled_symptom(&store, pulled));
        }
        {
            let store = self.metrics.read().await;
            metrics.retain(|pulled| keep_pulled_metric(&store, pulled));
        }

        let pulled_symptoms = symptoms.len();
        let pulled_metrics = metrics.len();

        if pulled_symptoms > 0 {
            self.symptoms.write().await.add_pulled_data(symptoms);
        }
        if pulled_metrics > 0 {
            {
                let known = self.symptoms.read().await;
                for metric in &metrics {
                    if known.get(&metric.symptom_id).is_none() {
                        tracing::warn!(
                            metric = %metric.id,
                            symptom = %metric.symptom_id,
                            "pulled metric references an unknown symptom"
                        );
                    }
                }
            }
            self.metrics.write().await.add_pulled_data(metrics);
        }

        // 5. Push
        self.publish(SyncStatus::Pushing).await;
        let pending = self.queue.read().await.snapshot();
        let mut pushed = 0usize;
        let mut failed = false;

        for change in pending {
            match push_change(&client, &change).await {
                Ok(()) => {
                    self.queue.write().await.remove(change.entity_id());
                    self.persist_queue().await;
                    pushed += 1;
                }
                Err(RemoteError::SymptomNotFound(_)) | Err(RemoteError::MetricNotFound(_))
                    if change.is_delete() =>
                {
                    // Already gone on the server: goal achieved
                    tracing::info!(id = %change.entity_id(), "remote entity already deleted");
                    self.queue.write().await.remove(change.entity_id());
                    self.persist_queue().await;
                    pushed += 1;
                }
                Err(error) if error.is_transport() => {
                    tracing::warn!(error = %error, "push interrupted, retaining pending changes");
                    failed = true;
                    break;
                }
                Err(error) => {
                    tracing::error!(
                        id = %change.entity_id(),
                        error = %error,
                        "push rejected, retaining change"
                    );
                    failed = true;
                }
            }
        }

        // 6. Final status
        let queue_empty = self.queue.read().await.is_empty();
        let status = if failed || !queue_empty {
            SyncStatus::OnlineButSyncFailed
        } else {
            SyncStatus::OnlineAndSynced
        };
        self.publish(status).await;

        TickOutcome {
            status,
            pulled_symptoms,
            pulled_metrics,
            pushed,
        }
    }

    /// Bulk-upload every in-domain entity, bypassing the queue
    ///
    /// Does not touch `lastPulledAt`; failures surface to the caller
    /// instead of the status machine.
    pub async fn push_all(&self) -> Result<PushAllOutcome, SyncError> {
        let settings = self.settings.read().await.settings().clone();
        let (url, token) = match (settings.api_url, settings.api_token) {
            (Some(url), Some(token)) => (url, token),
            _ => return Err(SyncError::MissingConfig),
        };

        let client = ApiClient::from_parts(self.http.clone(), RemoteConfig::new(url, token));
        let symptoms = self.symptoms.read().await.get_all();
        let metrics = self.metrics.read().await.get_all();

        let outcome = client.push_all(&symptoms, &metrics).await?;
        tracing::info!(
            symptoms_ok = outcome.symptoms.successful.len(),
            symptoms_failed = outcome.symptoms.failed.len(),
            metrics_ok = outcome.metrics.successful.len(),
            metrics_failed = outcome.metrics.failed.len(),
            "push-all completed"
        );
        Ok(outcome)
    }

    async fn persist_queue(&self) {
        let snapshot = self.queue.read().await.snapshot();
        if let Err(error) = self.local.write_changes_to_push(&snapshot).await {
            tracing::warn!(error = %error, "failed to persist change queue");
        }
    }

    async fn publish(&self, status: SyncStatus) {
        let mut current = self.status.write().await;
        if *current != status {
            *current = status;
            let _ = self.status_tx.send(status);
        }
    }
}

/// Whether a pulled entity passes the queue: a strictly newer queued
/// change wins and the pulled entity is discarded; otherwise the stale
/// queued change is removed so it cannot overwrite fresher remote state
pub(crate) fn survives_queue(
    queue: &mut ChangeQueue,
    id: &str,
    pulled_last_modified: chrono::DateTime<Utc>,
    queue_changed: &mut bool,
) -> bool {
    match queue.get(id).map(|change| change.change_date()) {
        None => true,
        Some(queued_date) if queued_date > pulled_last_modified => {
            tracing::debug!(id = %id, "queued change is newer than pulled entity, local wins");
            false
        }
        Some(_) => {
            queue.remove(id);
            *queue_changed = true;
            true
        }
    }
}

/// Keep a pulled symptom iff it is at least as new as the local one
pub(crate) fn keep_pulled_symptom(store: &SymptomStore, pulled: &Symptom) -> bool {
    match store.get(&pulled.id) {
        Some(local) => pulled.last_modified >= local.last_modified,
        None => true,
    }
}

/// Keep a pulled metric iff it is at least as new as the local one
pub(crate) fn keep_pulled_metric(store: &MetricStore, pulled: &Metric) -> bool {
    match store.get(&pulled.id) {
        Some(local) => pulled.last_modified >= local.last_modified,
        None => true,
    }
}

async fn push_change(client: &ApiClient, change: &ChangeToPush) -> Result<(), RemoteError> {
    match change {
        ChangeToPush::AddSymptom { symptom } => client.create_symptom(symptom).await,
        ChangeToPush::UpdateSymptom { symptom } => client.update_symptom(symptom).await,
        ChangeToPush::DeleteSymptom { id, .. } => client.delete_symptom(id).await,
        ChangeToPush::AddMetric { metric } => client.create_metric(metric).await,
        ChangeToPush::UpdateMetric { metric } => client.update_metric(metric).await,
        ChangeToPush::DeleteMetric { id, .. } => client.delete_metric(id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Settings;
    use crate::persistence::MemoryBackend;
    use crate::sync::AlwaysOnline;
    use chrono::TimeZone;

    struct NeverOnline;

    impl ConnectivityProbe for NeverOnline {
        fn is_online(&self) -> bool {
            false
        }
    }

    fn symptom_at(id: &str, name: &str, hour: u32) -> Symptom {
        Symptom {
            id: id.to_string(),
            name: name.to_string(),
            other_names: vec![],
            last_modified: Utc.with_ymd_and_hms(2024, 1, 2, hour, 0, 0).unwrap(),
        }
    }

    fn engine_with(
        connectivity: Arc<dyn ConnectivityProbe>,
        settings: Settings,
    ) -> (SyncEngine, Arc<LocalStore>) {
        let local = Arc::new(LocalStore::new(Arc::new(MemoryBackend::new()), "health"));

        let mut settings_store = SettingsStore::new();
        settings_store.initialize(settings).unwrap();

        let mut symptom_store = SymptomStore::new();
        symptom_store.initialize(vec![]).unwrap();
        let mut metric_store = MetricStore::new();
        metric_store.initialize(vec![]).unwrap();

        let engine = SyncEngine::new(
            Arc::new(RwLock::new(symptom_store)),
            Arc::new(RwLock::new(metric_store)),
            Arc::new(RwLock::new(settings_store)),
            local.clone(),
            connectivity,
            SyncConfig::default(),
        );
        (engine, local)
    }

    #[tokio::test]
    async fn test_unconfigured_tick_goes_offline_without_network() {
        let (engine, local) = engine_with(Arc::new(AlwaysOnline), Settings::default());

        let outcome = engine.sync_once().await;

        assert_eq!(outcome.status, SyncStatus::Offline);
        assert_eq!(outcome.pushed, 0);
        assert!(!outcome.applied_pull());
        assert!(engine.queue_is_empty().await);
        // No pull happened, so no anchor was written
        assert!(local.read_last_pull_date().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_offline_with_pending_changes() {
        let settings = Settings {
            api_url: Some("https://api.example.com".to_string()),
            api_token: Some("token".to_string()),
            last_pulled_at: None,
        };
        let (engine, _) = engine_with(Arc::new(NeverOnline), settings);

        engine
            .queue_change(ChangeToPush::AddSymptom {
                symptom: symptom_at("sym_a", "nausea", 10),
            })
            .await;

        let outcome = engine.sync_once().await;
        assert_eq!(outcome.status, SyncStatus::OfflinePendingPush);
        assert_eq!(engine.queue_len().await, 1);
    }

    #[tokio::test]
    async fn test_queue_change_persists_and_publishes() {
        let (engine, local) = engine_with(Arc::new(AlwaysOnline), Settings::default());
        let mut status_rx = engine.subscribe_status();

        engine
            .queue_change(ChangeToPush::AddSymptom {
                symptom: symptom_at("sym_a", "nausea", 10),
            })
            .await;

        // Initial status is already WaitingToSync, so no transition is
        // published; the queue itself is durable immediately
        let persisted = local.read_changes_to_push().await.unwrap().unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].entity_id(), "sym_a");
        assert!(status_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_add_then_delete_never_reaches_the_wire() {
        let (engine, local) = engine_with(Arc::new(AlwaysOnline), Settings::default());

        engine
            .queue_change(ChangeToPush::AddSymptom {
                symptom: symptom_at("sym_a", "nausea", 10),
            })
            .await;
        engine
            .queue_change(ChangeToPush::DeleteSymptom {
                id: "sym_a".to_string(),
                deletion_date: Utc.with_ymd_and_hms(2024, 1, 2, 11, 0, 0).unwrap(),
            })
            .await;

        assert!(engine.queue_is_empty().await);
        let persisted = local.read_changes_to_push().await.unwrap().unwrap();
        assert!(persisted.is_empty());
    }

    #[tokio::test]
    async fn test_push_all_requires_config() {
        let (engine, _) = engine_with(Arc::new(AlwaysOnline), Settings::default());

        let result = engine.push_all().await;
        assert!(matches!(result, Err(SyncError::MissingConfig)));
    }

    #[test]
    fn test_pulled_entity_vs_fresher_queued_change() {
        let mut queue = ChangeQueue::new();
        queue.enqueue(ChangeToPush::UpdateSymptom {
            symptom: symptom_at("sym_a", "local edit", 12),
        });

        let mut changed = false;
        let pulled_stamp = Utc.with_ymd_and_hms(2024, 1, 2, 11, 0, 0).unwrap();

        // The queued change is newer: local wins, pulled is discarded
        assert!(!survives_queue(&mut queue, "sym_a", pulled_stamp, &mut changed));
        assert!(!changed);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_stale_queued_change_is_dropped_for_pulled_entity() {
        let mut queue = ChangeQueue::new();
        queue.enqueue(ChangeToPush::UpdateSymptom {
            symptom: symptom_at("sym_a", "stale edit", 10),
        });

        let mut changed = false;
        let pulled_stamp = Utc.with_ymd_and_hms(2024, 1, 2, 11, 0, 0).unwrap();

        assert!(survives_queue(&mut queue, "sym_a", pulled_stamp, &mut changed));
        assert!(changed);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_equal_dates_drop_the_queued_change() {
        let mut queue = ChangeQueue::new();
        queue.enqueue(ChangeToPush::UpdateSymptom {
            symptom: symptom_at("sym_a", "edit", 11),
        });

        let mut changed = false;
        let pulled_stamp = Utc.with_ymd_and_hms(2024, 1, 2, 11, 0, 0).unwrap();

        assert!(survives_queue(&mut queue, "sym_a", pulled_stamp, &mut changed));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_unqueued_entity_passes_through() {
        let mut queue = ChangeQueue::new();
        let mut changed = false;
        let pulled_stamp = Utc.with_ymd_and_hms(2024, 1, 2, 11, 0, 0).unwrap();

        assert!(survives_queue(&mut queue, "sym_a", pulled_stamp, &mut changed));
        assert!(!changed);
    }

    #[tokio::test]
    async fn test_domain_reconciliation_prefers_newer_or_equal() {
        let mut store = SymptomStore::new();
        store
            .initialize(vec![symptom_at("sym_a", "local", 11)])
            .unwrap();

        let older = symptom_at("sym_a", "older remote", 10);
        let equal = symptom_at("sym_a", "equal remote", 11);
        let newer = symptom_at("sym_a", "newer remote", 12);
        let unseen = symptom_at("sym_b", "brand new", 9);

        assert!(!keep_pulled_symptom(&store, &older));
        assert!(keep_pulled_symptom(&store, &equal));
        assert!(keep_pulled_symptom(&store, &newer));
        assert!(keep_pulled_symptom(&store, &unseen));
    }
}
