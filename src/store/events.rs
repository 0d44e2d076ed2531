//! Store change events
//!
//! Tagged records carried on each store's broadcast stream. Events are
//! observed in emission order by every subscriber.

use crate::domain::{MetricId, SymptomId};

/// Capacity of each store's broadcast event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Changes to the symptom map
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymptomEvent {
    Initialized,
    Added { id: SymptomId },
    Updated { id: SymptomId },
    Deleted { id: SymptomId },
    /// Items arrived from a remote pull; persist and redraw, never re-queue
    AddedFromExternalSource,
}

/// Changes to the metric map
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricEvent {
    Initialized,
    Added { id: MetricId },
    Updated { id: MetricId },
    Deleted { id: MetricId },
    /// Items arrived from a remote pull; persist and redraw, never re-queue
    AddedFromExternalSource,
}

/// Changes to the settings record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsEvent {
    Initialized,
    Updated,
}
