//! Store error types

use crate::domain::{MetricId, SymptomId};
use thiserror::Error;

/// Errors returned by the domain stores
///
/// These are programmer errors or stale references; they surface to the
/// caller through the mutating operation's return value and are never
/// retried automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// `initialize` was called on an already-initialized store
    #[error("store is already initialized")]
    InitializationFailed,

    /// Update referenced a symptom id that is not in the store
    #[error("failed to update symptom {0}: not found")]
    FailedToUpdateSymptom(SymptomId),

    /// Update referenced a metric id that is not in the store
    #[error("failed to update metric {0}: not found")]
    FailedToUpdateMetric(MetricId),
}
