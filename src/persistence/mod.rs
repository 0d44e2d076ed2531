//! Durable Persistence
//!
//! The device's durable storage is a plain key→value primitive hidden
//! behind [`KeyValueBackend`]; the client only ever sees the five typed
//! slots exposed by [`LocalStore`]. Snapshots are whole-collection
//! writes: totals are O(10³) items, so simplicity beats write
//! amplification.
//!
//! Two backends ship with the crate: an in-memory map (tests, ephemeral
//! runs) and a single-document JSON file.

mod file;
mod local_store;
mod memory;

pub use file::JsonFileBackend;
pub use local_store::LocalStore;
pub use memory::MemoryBackend;

use async_trait::async_trait;
use thiserror::Error;

/// Durable key→value storage primitive
///
/// Implementations must make writes durable before returning; deletion
/// of a missing key is not an error.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    async fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
    async fn delete(&self, key: &str) -> Result<(), PersistenceError>;
}

/// Errors from the persistence layer
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The underlying key-value primitive failed
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A stored snapshot could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored date string was not valid ISO-8601
    #[error("invalid stored date: {0}")]
    InvalidDate(String),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::Backend(err.to_string())
    }
}
