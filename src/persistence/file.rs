//! JSON file key-value backend
//!
//! Persists the whole key→value map as a single versioned JSON document,
//! rewritten on every mutation. Totals are small, so write-through keeps
//! the implementation obvious and crash-safe enough for a client device.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::{KeyValueBackend, PersistenceError};

/// Durable backend over a single JSON document
#[derive(Debug)]
pub struct JsonFileBackend {
    entries: RwLock<HashMap<String, String>>,
    path: PathBuf,
}

/// Serialization format for the on-disk document
#[derive(Serialize, Deserialize)]
struct FileBackendData {
    version: u32,
    entries: HashMap<String, String>,
}

impl JsonFileBackend {
    /// Open or create the backing document
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();

        let entries = if path.exists() {
            Self::load_from_file(&path)?
        } else {
            HashMap::new()
        };

        Ok(Self {
            entries: RwLock::new(entries),
            path,
        })
    }

    fn load_from_file(path: &Path) -> Result<HashMap<String, String>, PersistenceError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let data: FileBackendData = serde_json::from_reader(reader).map_err(|e| {
            PersistenceError::Serialization(format!("failed to load store file: {e}"))
        })?;

        Ok(data.entries)
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = FileBackendData {
            version: 1,
            entries: entries.clone(),
        };

        let file = File::create(&self.path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer(writer, &data).map_err(|e| {
            PersistenceError::Serialization(format!("failed to persist store file: {e}"))
        })?;

        Ok(())
    }
}

#[async_trait]
impl KeyValueBackend for JsonFileBackend {
    async fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    async fn delete(&self, key: &str) -> Result<(), PersistenceError> {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_roundtrip_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let backend = JsonFileBackend::new(&path).unwrap();
            backend.write("health__settings", "{}").await.unwrap();
            backend.write("health__lastPullDate", "2024-01-02T10:00:00+00:00").await.unwrap();
        }

        {
            let backend = JsonFileBackend::new(&path).unwrap();
            assert_eq!(
                backend.read("health__settings").await.unwrap().as_deref(),
                Some("{}")
            );
            assert_eq!(
                backend.read("health__lastPullDate").await.unwrap().as_deref(),
                Some("2024-01-02T10:00:00+00:00")
            );
        }
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_noop() {
        let dir = tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("store.json")).unwrap();

        backend.delete("absent").await.unwrap();
        assert!(backend.read("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_typed_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let err = JsonFileBackend::new(&path).unwrap_err();
        assert!(matches!(err, PersistenceError::Serialization(_)));
    }
}
