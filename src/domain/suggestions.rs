//! Symptom suggestions for the data-entry screen
//!
//! Recent metrics are squashed into one suggestion per symptom, flagged by
//! whether the symptom was recorded today or on an earlier day. The caller
//! passes metrics newest-first; suggestion order preserves that recency.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::types::{local_day, Metric, SymptomId};

/// One suggestion per symptom, enriched with recency flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymptomSuggestion {
    pub symptom_id: SymptomId,
    /// The symptom appears in a metric dated today
    pub recorded_today: bool,
    /// The symptom appears in a metric dated before today
    pub recorded_in_past: bool,
}

/// Squash newest-first metrics into one suggestion per symptom
pub fn enrich_and_squash(metrics: &[Metric], today: NaiveDate) -> Vec<SymptomSuggestion> {
    let mut order: Vec<SymptomId> = Vec::new();
    let mut by_symptom: HashMap<SymptomId, SymptomSuggestion> = HashMap::new();

    for metric in metrics {
        let day = local_day(metric.date);
        let suggestion = by_symptom
            .entry(metric.symptom_id.clone())
            .or_insert_with(|| {
                order.push(metric.symptom_id.clone());
                SymptomSuggestion {
                    symptom_id: metric.symptom_id.clone(),
                    recorded_today: false,
                    recorded_in_past: false,
                }
            });

        if day == today {
            suggestion.recorded_today = true;
        } else if day < today {
            suggestion.recorded_in_past = true;
        }
    }

    order
        .into_iter()
        .map(|id| by_symptom.remove(&id).unwrap_or_else(|| unreachable!("suggestion missing for ordered id {id}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Intensity;
    use chrono::{Duration, Local, TimeZone, Utc};

    fn metric_on(symptom_id: &str, date: chrono::DateTime<Utc>) -> Metric {
        Metric {
            id: crate::domain::generate_metric_id(),
            symptom_id: symptom_id.to_string(),
            intensity: Intensity::Medium,
            date,
            notes: String::new(),
            last_modified: date,
        }
    }

    fn noon_local_today() -> chrono::DateTime<Utc> {
        let today = Local::now().date_naive();
        Local
            .from_local_datetime(&today.and_hms_opt(12, 0, 0).unwrap())
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_one_suggestion_per_symptom() {
        let now = noon_local_today();
        let metrics = vec![
            metric_on("sym_a", now),
            metric_on("sym_b", now - Duration::days(1)),
            metric_on("sym_a", now - Duration::days(2)),
        ];

        let today = Local::now().date_naive();
        let suggestions = enrich_and_squash(&metrics, today);

        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].symptom_id, "sym_a");
        assert_eq!(suggestions[1].symptom_id, "sym_b");
    }

    #[test]
    fn test_recency_flags() {
        let now = noon_local_today();
        let metrics = vec![
            metric_on("sym_a", now),
            metric_on("sym_b", now - Duration::days(3)),
            metric_on("sym_a", now - Duration::days(2)),
        ];

        let today = Local::now().date_naive();
        let suggestions = enrich_and_squash(&metrics, today);

        let a = suggestions.iter().find(|s| s.symptom_id == "sym_a").unwrap();
        assert!(a.recorded_today);
        assert!(a.recorded_in_past);

        let b = suggestions.iter().find(|s| s.symptom_id == "sym_b").unwrap();
        assert!(!b.recorded_today);
        assert!(b.recorded_in_past);
    }

    #[test]
    fn test_empty_input() {
        let today = Local::now().date_naive();
        assert!(enrich_and_squash(&[], today).is_empty());
    }
}
