//! Remote API Integration
//!
//! Typed client for the sync server's JSON-over-HTTPS contract.
//!
//! ## Architecture
//!
//! - **ApiClient**: request/response client with `x-api-key` auth
//! - **DTOs**: wire shapes plus tolerant per-item decoding; one bad
//!   entity never poisons a whole `/get-all` response
//! - **RemoteError**: transport vs. semantic error taxonomy the sync
//!   engine maps onto its status machine

mod client;
mod dto;
mod error;

pub use client::{ApiClient, PulledBatch, PushAllOutcome, RemoteConfig};
pub use dto::{decode_metrics, decode_symptoms, ApiMetric, ApiSymptom, DecodeError, PushReport};
pub use error::RemoteError;
