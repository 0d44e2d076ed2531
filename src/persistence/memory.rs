//! In-memory key-value backend
//!
//! Used by tests and ephemeral runs; nothing survives the process.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{KeyValueBackend, PersistenceError};

/// Volatile backend over a plain map
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), PersistenceError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_write_delete() {
        let backend = MemoryBackend::new();

        assert!(backend.read("k").await.unwrap().is_none());

        backend.write("k", "v").await.unwrap();
        assert_eq!(backend.read("k").await.unwrap().as_deref(), Some("v"));

        backend.delete("k").await.unwrap();
        assert!(backend.read("k").await.unwrap().is_none());

        // Deleting again stays fine
        backend.delete("k").await.unwrap();
    }
}
