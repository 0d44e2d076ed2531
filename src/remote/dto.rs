//! Wire Data Transfer Objects
//!
//! JSON shapes of the sync server contract, and the explicit, total
//! decoding into domain entities. Decoding is per item: unknown
//! intensity strings, unparseable dates, and missing fields produce a
//! typed failure for that entity while the rest of the batch survives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{Intensity, Metric, Symptom};

/// Symptom as it travels on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSymptom {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub other_names: Vec<String>,
    /// ISO-8601 instant of the last client-side update
    pub updated_at: String,
}

/// Metric as it travels on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMetric {
    pub id: String,
    pub symptom_id: String,
    /// ISO-8601 instant of the observed event
    pub date: String,
    /// ISO-8601 instant of the last client-side update
    pub updated_at: String,
    pub intensity: String,
    #[serde(default)]
    pub notes: String,
}

/// Per-entity success/failure id lists from `/push-all`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushReport {
    #[serde(default)]
    pub successful: Vec<String>,
    #[serde(default)]
    pub failed: Vec<String>,
}

/// A single wire entity that failed to decode
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to decode {kind} {id}: {reason}")]
pub struct DecodeError {
    pub kind: &'static str,
    pub id: String,
    pub reason: String,
}

impl From<&Symptom> for ApiSymptom {
    fn from(symptom: &Symptom) -> ApiSymptom {
        ApiSymptom {
            id: symptom.id.clone(),
            name: symptom.name.clone(),
            other_names: symptom.other_names.clone(),
            updated_at: symptom.last_modified.to_rfc3339(),
        }
    }
}

impl From<&Metric> for ApiMetric {
    fn from(metric: &Metric) -> ApiMetric {
        ApiMetric {
            id: metric.id.clone(),
            symptom_id: metric.symptom_id.clone(),
            date: metric.date.to_rfc3339(),
            updated_at: metric.last_modified.to_rfc3339(),
            intensity: metric.intensity.to_string(),
            notes: metric.notes.clone(),
        }
    }
}

fn parse_instant(raw: &str, field: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(Into::into)
        .map_err(|e| format!("invalid {field} {raw:?}: {e}"))
}

impl TryFrom<ApiSymptom> for Symptom {
    type Error = DecodeError;

    fn try_from(api: ApiSymptom) -> Result<Symptom, DecodeError> {
        let last_modified =
            parse_instant(&api.updated_at, "updated_at").map_err(|reason| DecodeError {
                kind: "symptom",
                id: api.id.clone(),
                reason,
            })?;

        Ok(Symptom {
            id: api.id,
            name: api.name,
            other_names: api.other_names,
            last_modified,
        })
    }
}

impl TryFrom<ApiMetric> for Metric {
    type Error = DecodeError;

    fn try_from(api: ApiMetric) -> Result<Metric, DecodeError> {
        let fail = |reason: String| DecodeError {
            kind: "metric",
            id: api.id.clone(),
            reason,
        };

        let date = parse_instant(&api.date, "date").map_err(&fail)?;
        let last_modified = parse_instant(&api.updated_at, "updated_at").map_err(&fail)?;
        let intensity = Intensity::from_str(&api.intensity).map_err(&fail)?;

        Ok(Metric {
            id: api.id,
            symptom_id: api.symptom_id,
            intensity,
            date,
            notes: api.notes,
            last_modified,
        })
    }
}

/// Decode a wire batch, collecting per-item failures
pub fn decode_symptoms(raw: Vec<ApiSymptom>) -> (Vec<Symptom>, Vec<DecodeError>) {
    let mut decoded = Vec::with_capacity(raw.len());
    let mut errors = Vec::new();

    for api in raw {
        match Symptom::try_from(api) {
            Ok(symptom) => decoded.push(symptom),
            Err(error) => errors.push(error),
        }
    }

    (decoded, errors)
}

/// Decode a wire batch, collecting per-item failures
pub fn decode_metrics(raw: Vec<ApiMetric>) -> (Vec<Metric>, Vec<DecodeError>) {
    let mut decoded = Vec::with_capacity(raw.len());
    let mut errors = Vec::new();

    for api in raw {
        match Metric::try_from(api) {
            Ok(metric) => decoded.push(metric),
            Err(error) => errors.push(error),
        }
    }

    (decoded, errors)
}
