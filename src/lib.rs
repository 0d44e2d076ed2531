//! # vitalsync
//!
//! Offline-first symptom tracking client with bidirectional remote sync.
//! Records *symptoms* (named things the user tracks) and *metrics*
//! (timestamped observations with an intensity and notes) while
//! continuously reconciling the device with a shared remote store so
//! that multiple devices converge on the same data.
//!
//! ## Features
//!
//! - **Offline first**: every mutation lands in the durable local store
//!   and a pending-change queue before any network traffic
//! - **Change squashing**: redundant pending mutations collapse, so at
//!   most one change per entity ever reaches the wire
//! - **Last-writer-wins**: per-entity conflict resolution on client
//!   timestamps, with a pull-overlap window for skewed clocks
//! - **Prefix search**: trie-backed autocomplete over symptom names
//!
//! ## Modules
//!
//! - [`domain`]: symptoms, metrics, settings, and their helpers
//! - [`index`]: autocomplete trie and day-bucket indexes
//! - [`store`]: in-memory stores with change-event streams
//! - [`persistence`]: typed slots over a durable key-value primitive
//! - [`remote`]: typed client for the sync server's wire contract
//! - [`sync`]: change queue, merger, and the periodic sync engine
//! - [`coordinator`]: the application root wiring it all together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vitalsync::{AlwaysOnline, ClientConfig, Coordinator, MemoryBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = Arc::new(Coordinator::new(
//!         Arc::new(MemoryBackend::new()),
//!         Arc::new(AlwaysOnline),
//!         ClientConfig::default(),
//!     ));
//!
//!     // Hydrate stores and the pending queue from the device
//!     coordinator.load().await?;
//!
//!     coordinator
//!         .set_api_url(Some("https://health.example.com".into()))
//!         .await?;
//!     coordinator.set_api_token(Some("secret".into())).await?;
//!
//!     let symptom = coordinator.add_symptom("headache", vec![]).await?;
//!     println!("tracking {}", symptom.name);
//!
//!     // Reconcile with the remote every few seconds until aborted
//!     let sync_handle = coordinator.clone().sync_continuously();
//!
//!     tokio::signal::ctrl_c().await?;
//!     sync_handle.abort();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod domain;
pub mod index;
pub mod persistence;
pub mod remote;
pub mod store;
pub mod sync;

// Re-export top-level types for convenience
pub use config::{ClientConfig, PULL_OVERLAP_SECONDS, REMOTE_LOOP_WAIT_SECS, STORAGE_PREFIX};

pub use coordinator::{Coordinator, CoordinatorError};

pub use domain::{
    enrich_and_squash, Intensity, Metric, MetricId, Settings, Symptom, SymptomId,
    SymptomSuggestion,
};

pub use index::{Autocompleter, DayIndex};

pub use persistence::{
    JsonFileBackend, KeyValueBackend, LocalStore, MemoryBackend, PersistenceError,
};

pub use remote::{ApiClient, PulledBatch, PushAllOutcome, PushReport, RemoteConfig, RemoteError};

pub use store::{
    MetricEvent, MetricStore, SettingsEvent, SettingsStore, StoreError, SymptomEvent, SymptomStore,
};

pub use sync::{
    AlwaysOnline, ChangeQueue, ChangeToPush, ConnectionStatus, ConnectivityProbe, SyncConfig,
    SyncEngine, SyncError, SyncStatus, TickOutcome,
};
