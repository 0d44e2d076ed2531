//! LocalStore - typed slots over the key-value primitive
//!
//! Five slots under a process-wide prefix (`health__` by default):
//!
//! | slot            | type                          |
//! |-----------------|-------------------------------|
//! | `settings`      | object                        |
//! | `symptoms`      | array of serialized symptoms  |
//! | `history`       | array of serialized metrics   |
//! | `changesToPush` | array of serialized changes   |
//! | `lastPullDate`  | ISO-8601 string               |
//!
//! Dates round-trip as ISO-8601; collection slots are written as full
//! snapshots, not deltas.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::domain::{Metric, Settings, Symptom};
use crate::sync::ChangeToPush;

use super::{KeyValueBackend, PersistenceError};

const SETTINGS_SLOT: &str = "settings";
const SYMPTOMS_SLOT: &str = "symptoms";
const HISTORY_SLOT: &str = "history";
const CHANGES_SLOT: &str = "changesToPush";
const LAST_PULL_DATE_SLOT: &str = "lastPullDate";

/// Scoped namespace over a durable key-value backend
pub struct LocalStore {
    backend: Arc<dyn KeyValueBackend>,
    prefix: String,
}

impl LocalStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
        }
    }

    fn key(&self, slot: &str) -> String {
        format!("{}__{}", self.prefix, slot)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        slot: &str,
    ) -> Result<Option<T>, PersistenceError> {
        match self.backend.read(&self.key(slot)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn write_json<T: serde::Serialize>(
        &self,
        slot: &str,
        value: &T,
    ) -> Result<(), PersistenceError> {
        let raw = serde_json::to_string(value)?;
        self.backend.write(&self.key(slot), &raw).await
    }

    pub async fn read_settings(&self) -> Result<Option<Settings>, PersistenceError> {
        self.read_json(SETTINGS_SLOT).await
    }

    pub async fn write_settings(&self, settings: &Settings) -> Result<(), PersistenceError> {
        self.write_json(SETTINGS_SLOT, settings).await
    }

    pub async fn read_symptoms(&self) -> Result<Option<Vec<Symptom>>, PersistenceError> {
        self.read_json(SYMPTOMS_SLOT).await
    }

    pub async fn write_symptoms(&self, symptoms: &[Symptom]) -> Result<(), PersistenceError> {
        self.write_json(SYMPTOMS_SLOT, &symptoms).await
    }

    pub async fn read_history(&self) -> Result<Option<Vec<Metric>>, PersistenceError> {
        self.read_json(HISTORY_SLOT).await
    }

    pub async fn write_history(&self, metrics: &[Metric]) -> Result<(), PersistenceError> {
        self.write_json(HISTORY_SLOT, &metrics).await
    }

    pub async fn read_changes_to_push(
        &self,
    ) -> Result<Option<Vec<ChangeToPush>>, PersistenceError> {
        self.read_json(CHANGES_SLOT).await
    }

    pub async fn write_changes_to_push(
        &self,
        changes: &[ChangeToPush],
    ) -> Result<(), PersistenceError> {
        self.write_json(CHANGES_SLOT, &changes).await
    }

    pub async fn read_last_pull_date(&self) -> Result<Option<DateTime<Utc>>, PersistenceError> {
        match self.backend.read(&self.key(LAST_PULL_DATE_SLOT)).await? {
            Some(raw) => {
                let parsed = DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| PersistenceError::InvalidDate(format!("{raw:?}: {e}")))?;
                Ok(Some(parsed.into()))
            }
            None => Ok(None),
        }
    }

    pub async fn write_last_pull_date(
        &self,
        instant: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        self.backend
            .write(&self.key(LAST_PULL_DATE_SLOT), &instant.to_rfc3339())
            .await
    }

    /// Remove a slot; removing an absent slot is a no-op
    pub async fn delete_slot(&self, slot: &str) -> Result<(), PersistenceError> {
        self.backend.delete(&self.key(slot)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Intensity;
    use crate::persistence::MemoryBackend;
    use chrono::TimeZone;

    fn store() -> (Arc<MemoryBackend>, LocalStore) {
        let backend = Arc::new(MemoryBackend::new());
        let local = LocalStore::new(backend.clone(), "health");
        (backend, local)
    }

    #[tokio::test]
    async fn test_slots_are_prefixed() {
        let (backend, local) = store();

        local
            .write_last_pull_date(Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap())
            .await
            .unwrap();

        let raw = backend.read("health__lastPullDate").await.unwrap();
        assert_eq!(raw.as_deref(), Some("2024-01-02T10:00:00+00:00"));
    }

    #[tokio::test]
    async fn test_empty_slots_read_as_none() {
        let (_, local) = store();

        assert!(local.read_settings().await.unwrap().is_none());
        assert!(local.read_symptoms().await.unwrap().is_none());
        assert!(local.read_history().await.unwrap().is_none());
        assert!(local.read_changes_to_push().await.unwrap().is_none());
        assert!(local.read_last_pull_date().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip() {
        let (_, local) = store();
        let stamp = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();

        let symptoms = vec![Symptom {
            id: "sym_a".to_string(),
            name: "headache".to_string(),
            other_names: vec!["migraine".to_string()],
            last_modified: stamp,
        }];
        let metrics = vec![Metric {
            id: "met_a".to_string(),
            symptom_id: "sym_a".to_string(),
            intensity: Intensity::High,
            date: stamp,
            notes: "7/10".to_string(),
            last_modified: stamp,
        }];

        local.write_symptoms(&symptoms).await.unwrap();
        local.write_history(&metrics).await.unwrap();

        assert_eq!(local.read_symptoms().await.unwrap().unwrap(), symptoms);
        assert_eq!(local.read_history().await.unwrap().unwrap(), metrics);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_, local) = store();

        local.write_settings(&Settings::default()).await.unwrap();
        local.delete_slot("settings").await.unwrap();
        local.delete_slot("settings").await.unwrap();

        assert!(local.read_settings().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_stored_date_is_typed() {
        let (backend, local) = store();
        backend
            .write("health__lastPullDate", "not a date")
            .await
            .unwrap();

        let err = local.read_last_pull_date().await.unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidDate(_)));
    }
}
