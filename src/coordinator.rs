//! Coordinator
//!
//! The application root: owns the stores, the local store, and the sync
//! engine, and keeps the dependency graph acyclic. Stores never see the
//! engine, the engine only reads the stores, and every persistence
//! write funnels through here or through the engine's queue slot.
//!
//! Mutations run store → full-snapshot persist → queue, synchronously,
//! so persisted state and the pending queue always agree with the order
//! of events on the store streams.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::domain::{
    enrich_and_squash, Intensity, Metric, Settings, Symptom, SymptomId, SymptomSuggestion,
};
use crate::persistence::{KeyValueBackend, LocalStore, PersistenceError};
use crate::remote::PushAllOutcome;
use crate::store::{
    MetricEvent, MetricStore, SettingsStore, StoreError, SymptomEvent, SymptomStore,
};
use crate::sync::{
    ChangeToPush, ConnectivityProbe, SyncConfig, SyncEngine, SyncError, SyncStatus, TickOutcome,
};

/// Errors surfaced by the coordinator's user-facing operations
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// Deleting a symptom is blocked while metrics still reference it
    #[error("symptom {0} is still referenced by recorded metrics")]
    SymptomInUse(SymptomId),

    /// A store operation failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A persistence operation failed
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Owns the stores and drives persistence and syncing
pub struct Coordinator {
    symptoms: Arc<RwLock<SymptomStore>>,
    metrics: Arc<RwLock<MetricStore>>,
    settings: Arc<RwLock<SettingsStore>>,
    local: Arc<LocalStore>,
    engine: Arc<SyncEngine>,
    loop_wait: std::time::Duration,
}

impl Coordinator {
    pub fn new(
        backend: Arc<dyn KeyValueBackend>,
        connectivity: Arc<dyn ConnectivityProbe>,
        config: ClientConfig,
    ) -> Self {
        let local = Arc::new(LocalStore::new(backend, config.storage_prefix.clone()));
        let symptoms = Arc::new(RwLock::new(SymptomStore::new()));
        let metrics = Arc::new(RwLock::new(MetricStore::new()));
        let settings = Arc::new(RwLock::new(SettingsStore::new()));

        let engine = Arc::new(SyncEngine::new(
            symptoms.clone(),
            metrics.clone(),
            settings.clone(),
            local.clone(),
            connectivity,
            SyncConfig::from(&config),
        ));

        Self {
            symptoms,
            metrics,
            settings,
            local,
            engine,
            loop_wait: config.remote_loop_wait,
        }
    }

    /// Read all five persisted slots once and hydrate the stores and the
    /// change queue
    pub async fn load(&self) -> Result<(), CoordinatorError> {
        let mut settings = self.local.read_settings().await?.unwrap_or_default();
        if let Some(anchor) = self.local.read_last_pull_date().await? {
            settings.last_pulled_at = Some(anchor);
        }
        self.settings.write().await.initialize(settings)?;

        let symptoms = self.local.read_symptoms().await?.unwrap_or_default();
        let symptom_count = symptoms.len();
        self.symptoms.write().await.initialize(symptoms)?;

        let metrics = self.local.read_history().await?.unwrap_or_default();
        let metric_count = metrics.len();
        self.metrics.write().await.initialize(metrics)?;

        let changes = self.local.read_changes_to_push().await?.unwrap_or_default();
        let pending = changes.len();
        self.engine.hydrate_queue(changes).await;

        tracing::info!(
            symptoms = symptom_count,
            metrics = metric_count,
            pending_changes = pending,
            "local state loaded"
        );
        Ok(())
    }

    // ============================================
    // Symptoms
    // ============================================

    pub async fn add_symptom(
        &self,
        name: impl Into<String>,
        other_names: Vec<String>,
    ) -> Result<Symptom, CoordinatorError> {
        let symptom = self.symptoms.write().await.add(name, other_names);
        self.persist_symptoms().await?;
        self.engine
            .queue_change(ChangeToPush::AddSymptom {
                symptom: symptom.clone(),
            })
            .await;
        Ok(symptom)
    }

    pub async fn update_symptom(&self, symptom: Symptom) -> Result<Symptom, CoordinatorError> {
        let updated = self.symptoms.write().await.update(symptom)?;
        self.persist_symptoms().await?;
        self.engine
            .queue_change(ChangeToPush::UpdateSymptom {
                symptom: updated.clone(),
            })
            .await;
        Ok(updated)
    }

    /// Delete a symptom
    ///
    /// Blocked while any metric still references it; the caller should
    /// delete or reassign those first.
    pub async fn delete_symptom(&self, id: &str) -> Result<(), CoordinatorError> {
        if self.metrics.read().await.is_symptom_used_in_history(id) {
            return Err(CoordinatorError::SymptomInUse(id.to_string()));
        }

        if self.symptoms.read().await.get(id).is_none() {
            tracing::debug!(id = %id, "delete ignored, symptom unknown");
            return Ok(());
        }

        self.symptoms.write().await.delete(id);
        self.persist_symptoms().await?;
        self.engine
            .queue_change(ChangeToPush::DeleteSymptom {
                id: id.to_string(),
                deletion_date: Utc::now(),
            })
            .await;
        Ok(())
    }

    pub async fn get_symptoms(&self) -> Vec<Symptom> {
        self.symptoms.read().await.get_all()
    }

    pub async fn search_symptoms(&self, query: &str) -> Vec<Symptom> {
        self.symptoms.read().await.search(query)
    }

    // ============================================
    // Metrics
    // ============================================

    pub async fn add_metric(
        &self,
        symptom_id: SymptomId,
        intensity: Intensity,
        date: chrono::DateTime<Utc>,
        notes: impl Into<String>,
    ) -> Result<Metric, CoordinatorError> {
        let metric = self
            .metrics
            .write()
            .await
            .add(symptom_id, intensity, date, notes);
        self.persist_history().await?;
        self.engine
            .queue_change(ChangeToPush::AddMetric {
                metric: metric.clone(),
            })
            .await;
        Ok(metric)
    }

    pub async fn update_metric(&self, metric: Metric) -> Result<Metric, CoordinatorError> {
        let updated = self.metrics.write().await.update(metric)?;
        self.persist_history().await?;
        self.engine
            .queue_change(ChangeToPush::UpdateMetric {
                metric: updated.clone(),
            })
            .await;
        Ok(updated)
    }

    pub async fn delete_metric(&self, id: &str) -> Result<(), CoordinatorError> {
        if self.metrics.read().await.get(id).is_none() {
            tracing::debug!(id = %id, "delete ignored, metric unknown");
            return Ok(());
        }

        self.metrics.write().await.delete(id);
        self.persist_history().await?;
        self.engine
            .queue_change(ChangeToPush::DeleteMetric {
                id: id.to_string(),
                deletion_date: Utc::now(),
            })
            .await;
        Ok(())
    }

    pub async fn get_metrics(&self) -> Vec<Metric> {
        self.metrics.read().await.get_all()
    }

    pub async fn metrics_of_last_n_days(&self, n: u32) -> Vec<Metric> {
        self.metrics.read().await.metrics_of_last_n_days(n)
    }

    /// One suggestion per symptom over the whole history, newest first
    pub async fn symptom_suggestions(&self) -> Vec<SymptomSuggestion> {
        let metrics = self.metrics.read().await.get_all();
        enrich_and_squash(&metrics, chrono::Local::now().date_naive())
    }

    // ============================================
    // Settings
    // ============================================

    pub async fn settings(&self) -> Settings {
        self.settings.read().await.settings().clone()
    }

    pub async fn set_api_url(&self, url: Option<String>) -> Result<(), CoordinatorError> {
        self.settings.write().await.set_api_url(url);
        self.persist_settings().await?;
        Ok(())
    }

    pub async fn set_api_token(&self, token: Option<String>) -> Result<(), CoordinatorError> {
        self.settings.write().await.set_api_token(token);
        self.persist_settings().await?;
        Ok(())
    }

    // ============================================
    // Sync
    // ============================================

    /// Run one sync tick and persist whatever the pull applied
    pub async fn sync_tick(&self) -> TickOutcome {
        let outcome = self.engine.sync_once().await;

        if outcome.applied_pull() {
            if let Err(error) = self.persist_symptoms().await {
                tracing::warn!(error = %error, "failed to persist pulled symptoms");
            }
            if let Err(error) = self.persist_history().await {
                tracing::warn!(error = %error, "failed to persist pulled metrics");
            }
        }

        outcome
    }

    /// Arm the repeating sync tick
    ///
    /// Stop continuous syncing by aborting the returned handle.
    pub fn sync_continuously(self: Arc<Self>) -> JoinHandle<()> {
        let coordinator = self;

        tracing::info!(
            period_secs = coordinator.loop_wait.as_secs(),
            "starting continuous sync"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(coordinator.loop_wait);

            // Skip the first immediate tick
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let outcome = coordinator.sync_tick().await;
                tracing::debug!(status = %outcome.status, "sync tick completed");
            }
        })
    }

    /// Bulk-upload the whole domain, bypassing the change queue
    pub async fn push_all(&self) -> Result<PushAllOutcome, SyncError> {
        self.engine.push_all().await
    }

    pub async fn sync_status(&self) -> SyncStatus {
        self.engine.status().await
    }

    pub fn subscribe_sync_status(&self) -> broadcast::Receiver<SyncStatus> {
        self.engine.subscribe_status()
    }

    pub async fn subscribe_symptom_events(&self) -> broadcast::Receiver<SymptomEvent> {
        self.symptoms.read().await.subscribe()
    }

    pub async fn subscribe_metric_events(&self) -> broadcast::Receiver<MetricEvent> {
        self.metrics.read().await.subscribe()
    }

    #[cfg(test)]
    pub(crate) fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    // ============================================
    // Persistence helpers
    // ============================================

    async fn persist_symptoms(&self) -> Result<(), PersistenceError> {
        let snapshot = self.symptoms.read().await.get_all();
        self.local.write_symptoms(&snapshot).await
    }

    async fn persist_history(&self) -> Result<(), PersistenceError> {
        let snapshot = self.metrics.read().await.get_all();
        self.local.write_history(&snapshot).await
    }

    async fn persist_settings(&self) -> Result<(), PersistenceError> {
        let snapshot = self.settings.read().await.settings().clone();
        self.local.write_settings(&snapshot).await
    }
}
