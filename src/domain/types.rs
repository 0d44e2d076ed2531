//! Domain entity definitions
//!
//! Entities carry a client-side `last_modified` instant with millisecond
//! precision; conflict resolution across devices is last-writer-wins on
//! that instant.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Opaque symptom identifier, `sym_` + random suffix
pub type SymptomId = String;

/// Opaque metric identifier, `met_` + random suffix
pub type MetricId = String;

/// A named kind of thing the user tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symptom {
    pub id: SymptomId,
    pub name: String,
    /// Alternate names, searched alongside `name`
    #[serde(default)]
    pub other_names: Vec<String>,
    /// When the symptom was last updated on a client
    pub last_modified: DateTime<Utc>,
}

impl Symptom {
    /// Create a symptom with a freshly generated id, stamped now
    pub fn new(name: impl Into<String>, other_names: Vec<String>) -> Self {
        Self {
            id: generate_symptom_id(),
            name: name.into(),
            other_names,
            last_modified: Utc::now(),
        }
    }
}

/// Categorical intensity of an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Display for Intensity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let as_string = format!("{self:?}").to_lowercase();
        write!(f, "{as_string}")
    }
}

impl FromStr for Intensity {
    type Err = String;

    fn from_str(intensity: &str) -> Result<Intensity, Self::Err> {
        match intensity {
            "low" => Ok(Intensity::Low),
            "medium" => Ok(Intensity::Medium),
            "high" => Ok(Intensity::High),
            other => Err(format!("{other} is not a supported intensity")),
        }
    }
}

/// A single timestamped observation of a symptom
///
/// `symptom_id` is not enforced as a foreign key: a metric may outlive its
/// symptom and is then rendered as "unknown symptom".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub id: MetricId,
    pub symptom_id: SymptomId,
    pub intensity: Intensity,
    /// When the observed event occurred
    pub date: DateTime<Utc>,
    /// Free text, optionally prefixed with `N/10 - ` (see [`crate::domain::split_numeric_intensity`])
    #[serde(default)]
    pub notes: String,
    /// When the metric was last updated on a client
    pub last_modified: DateTime<Utc>,
}

impl Metric {
    /// Create a metric with a freshly generated id, stamped now
    pub fn new(
        symptom_id: SymptomId,
        intensity: Intensity,
        date: DateTime<Utc>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_metric_id(),
            symptom_id,
            intensity,
            date,
            notes: notes.into(),
            last_modified: Utc::now(),
        }
    }

    /// Numeric 1..=10 intensity embedded in the notes prefix, if any
    pub fn numeric_intensity(&self) -> Option<u8> {
        super::notes::split_numeric_intensity(&self.notes).0
    }

    /// Set the numeric intensity, recomputing the categorical bucket and
    /// rewriting the notes prefix while preserving any trailing text
    pub fn set_numeric_intensity(&mut self, value: u8) {
        let (_, rest) = super::notes::split_numeric_intensity(&self.notes);
        self.intensity = super::notes::intensity_for_numeric(value);
        self.notes = super::notes::format_notes_prefix(value, rest);
    }
}

/// Client configuration persisted on the device
///
/// Absent fields mean "not configured"; the sync engine refuses to talk to
/// the remote until both `api_url` and `api_token` are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub last_pulled_at: Option<DateTime<Utc>>,
}

const ID_SUFFIX_LEN: usize = 10;

fn generate_id(prefix: &str) -> String {
    let suffix: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(ID_SUFFIX_LEN)
        .collect();
    format!("{prefix}_{suffix}")
}

/// Generate a fresh symptom id (`sym_` + 10 random hex chars)
pub fn generate_symptom_id() -> SymptomId {
    generate_id("sym")
}

/// Generate a fresh metric id (`met_` + 10 random hex chars)
pub fn generate_metric_id() -> MetricId {
    generate_id("met")
}

/// Return the later of two instants
pub fn later_of(a: DateTime<Utc>, b: DateTime<Utc>) -> DateTime<Utc> {
    if a >= b {
        a
    } else {
        b
    }
}

/// Calendar day of an instant in the device's local timezone
///
/// Day buckets and last-N-days windows are computed against the local
/// calendar, matching what the user sees in a daily log.
pub fn local_day(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&Local).date_naive()
}
