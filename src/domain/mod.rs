//! Core Domain Types
//!
//! The things the client tracks and syncs:
//!
//! - **Symptom**: a named kind of thing the user tracks
//! - **Metric**: a single timestamped observation of a symptom
//! - **Settings**: endpoint configuration and the last pull anchor
//!
//! Plus the helpers the stores and sync engine share: id generation,
//! instant comparison, the numeric-intensity notes prefix codec, and
//! suggestion squashing for the data-entry screen.

mod notes;
mod suggestions;
mod types;

pub use notes::{format_notes_prefix, intensity_for_numeric, split_numeric_intensity};
pub use suggestions::{enrich_and_squash, SymptomSuggestion};
pub use types::{
    generate_metric_id, generate_symptom_id, later_of, local_day, Intensity, Metric, MetricId,
    Settings, Symptom, SymptomId,
};
