//! Bidirectional Sync
//!
//! Reconciles the in-memory domain, the durable local store, and the
//! shared remote store while the device may be offline, partially
//! configured, or racing concurrent writers on other devices.
//!
//! ## Architecture
//!
//! - **ChangeToPush + merger**: per-entity pending mutations; enqueuing
//!   collapses redundant changes so at most one is pending per entity
//! - **ChangeQueue**: insertion-ordered pending-mutation log, persisted
//!   on every mutation and replayed after restart
//! - **SyncStatus**: user-facing state machine driven by the tick phases
//! - **SyncEngine**: the periodic pull → reconcile → push loop; the
//!   client is the conflict decider, last writer wins per entity

mod change;
mod engine;
mod queue;
mod status;

pub use change::{merge, ChangeCategory, ChangeToPush};
pub use engine::{SyncConfig, SyncEngine, SyncError, TickOutcome};
pub use queue::ChangeQueue;
pub use status::{
    classify_connection, is_localhost_url, AlwaysOnline, ConnectionStatus, ConnectivityProbe,
    SyncStatus,
};
