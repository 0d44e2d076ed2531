//! Domain Stores
//!
//! In-memory stores owning the domain maps and their indexes:
//!
//! - **SymptomStore**: symptom map + autocomplete index
//! - **MetricStore**: metric map + day-bucket index
//! - **SettingsStore**: endpoint configuration + last pull anchor
//!
//! Each store emits tagged change events on a broadcast stream so
//! observers can persist and redraw. Data pulled from the remote enters
//! through `add_pulled_data`, which emits `AddedFromExternalSource`
//! instead of per-item events: pulled items must never round-trip back
//! to the server as queued changes.

mod error;
mod events;
mod metrics;
mod settings;
mod symptoms;

pub use error::StoreError;
pub use events::{MetricEvent, SettingsEvent, SymptomEvent, EVENT_CHANNEL_CAPACITY};
pub use metrics::MetricStore;
pub use settings::SettingsStore;
pub use symptoms::SymptomStore;
