//! Pending mutations and the merge rules that collapse them
//!
//! A `ChangeToPush` is keyed by its target entity id. When a second
//! change is enqueued for the same entity the two are merged so the
//! queue always reflects the latest intent with at most one entry per
//! entity:
//!
//! | earliest | latest | result                                   |
//! |----------|--------|------------------------------------------|
//! | Add      | Delete | cancelled (the server never saw the add) |
//! | Add      | Update | latest payload, still published as Add   |
//! | Update   | Update | latest                                   |
//! | Update   | Delete | latest                                   |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Metric, MetricId, Symptom, SymptomId};

/// A mutation waiting to be sent to the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeToPush {
    AddSymptom {
        symptom: Symptom,
    },
    UpdateSymptom {
        symptom: Symptom,
    },
    DeleteSymptom {
        id: SymptomId,
        deletion_date: DateTime<Utc>,
    },
    AddMetric {
        metric: Metric,
    },
    UpdateMetric {
        metric: Metric,
    },
    DeleteMetric {
        id: MetricId,
        deletion_date: DateTime<Utc>,
    },
}

/// Coarse shape of a change, used by the merge rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCategory {
    Add,
    Update,
    Delete,
}

impl ChangeToPush {
    /// Id of the entity this change targets
    pub fn entity_id(&self) -> &str {
        match self {
            ChangeToPush::AddSymptom { symptom } | ChangeToPush::UpdateSymptom { symptom } => {
                &symptom.id
            }
            ChangeToPush::DeleteSymptom { id, .. } => id,
            ChangeToPush::AddMetric { metric } | ChangeToPush::UpdateMetric { metric } => {
                &metric.id
            }
            ChangeToPush::DeleteMetric { id, .. } => id,
        }
    }

    /// Wall-clock instant of the change: the entity's `last_modified`
    /// for adds and updates, the deletion instant for deletes
    pub fn change_date(&self) -> DateTime<Utc> {
        match self {
            ChangeToPush::AddSymptom { symptom } | ChangeToPush::UpdateSymptom { symptom } => {
                symptom.last_modified
            }
            ChangeToPush::AddMetric { metric } | ChangeToPush::UpdateMetric { metric } => {
                metric.last_modified
            }
            ChangeToPush::DeleteSymptom { deletion_date, .. }
            | ChangeToPush::DeleteMetric { deletion_date, .. } => *deletion_date,
        }
    }

    pub fn category(&self) -> ChangeCategory {
        match self {
            ChangeToPush::AddSymptom { .. } | ChangeToPush::AddMetric { .. } => {
                ChangeCategory::Add
            }
            ChangeToPush::UpdateSymptom { .. } | ChangeToPush::UpdateMetric { .. } => {
                ChangeCategory::Update
            }
            ChangeToPush::DeleteSymptom { .. } | ChangeToPush::DeleteMetric { .. } => {
                ChangeCategory::Delete
            }
        }
    }

    pub fn is_delete(&self) -> bool {
        self.category() == ChangeCategory::Delete
    }
}

/// Merge two pending changes for the same entity
///
/// Returns `None` when the changes cancel (an unpushed add followed by a
/// delete is invisible to the server and must not be sent).
pub fn merge(existing: ChangeToPush, incoming: ChangeToPush) -> Option<ChangeToPush> {
    debug_assert_eq!(existing.entity_id(), incoming.entity_id());

    let (earliest, latest) = if existing.change_date() <= incoming.change_date() {
        (existing, incoming)
    } else {
        (incoming, existing)
    };

    match (earliest.category(), latest.category()) {
        (ChangeCategory::Add, ChangeCategory::Delete) => None,
        // An unpushed add updated locally must still be published as a
        // creation carrying the final state
        (ChangeCategory::Add, ChangeCategory::Update) => Some(retag_as_add(latest)),
        (ChangeCategory::Delete, _) => {
            // No client flow adds or updates after a delete; if it shows
            // up anyway, the latest intent wins
            tracing::debug!(
                id = %latest.entity_id(),
                "merging a change after a pending delete, keeping the latest"
            );
            Some(latest)
        }
        _ => Some(latest),
    }
}

fn retag_as_add(change: ChangeToPush) -> ChangeToPush {
    match change {
        ChangeToPush::UpdateSymptom { symptom } => ChangeToPush::AddSymptom { symptom },
        ChangeToPush::UpdateMetric { metric } => ChangeToPush::AddMetric { metric },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn symptom_at(id: &str, name: &str, hour: u32) -> Symptom {
        Symptom {
            id: id.to_string(),
            name: name.to_string(),
            other_names: vec![],
            last_modified: Utc.with_ymd_and_hms(2024, 1, 2, hour, 0, 0).unwrap(),
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_add_then_delete_cancels() {
        let add = ChangeToPush::AddSymptom {
            symptom: symptom_at("sym_a", "nausea", 10),
        };
        let delete = ChangeToPush::DeleteSymptom {
            id: "sym_a".to_string(),
            deletion_date: at(11),
        };

        assert_eq!(merge(add, delete), None);
    }

    #[test]
    fn test_add_then_update_stays_an_add_with_latest_payload() {
        let add = ChangeToPush::AddSymptom {
            symptom: symptom_at("sym_a", "nausea", 10),
        };
        let update = ChangeToPush::UpdateSymptom {
            symptom: symptom_at("sym_a", "sea sickness", 11),
        };

        let merged = merge(add, update).unwrap();
        match merged {
            ChangeToPush::AddSymptom { symptom } => assert_eq!(symptom.name, "sea sickness"),
            other => panic!("expected an add, got {other:?}"),
        }
    }

    #[test]
    fn test_update_then_update_keeps_latest() {
        let first = ChangeToPush::UpdateSymptom {
            symptom: symptom_at("sym_a", "first", 10),
        };
        let second = ChangeToPush::UpdateSymptom {
            symptom: symptom_at("sym_a", "second", 11),
        };

        // Enqueue order does not matter, only the change dates do
        let merged = merge(second.clone(), first.clone()).unwrap();
        assert_eq!(merged, second);
    }

    #[test]
    fn test_update_then_delete_keeps_the_delete() {
        let update = ChangeToPush::UpdateMetric {
            metric: crate::domain::Metric {
                id: "met_a".to_string(),
                symptom_id: "sym_a".to_string(),
                intensity: crate::domain::Intensity::Low,
                date: at(9),
                notes: String::new(),
                last_modified: at(10),
            },
        };
        let delete = ChangeToPush::DeleteMetric {
            id: "met_a".to_string(),
            deletion_date: at(11),
        };

        assert_eq!(merge(update, delete.clone()), Some(delete));
    }

    #[test]
    fn test_delete_first_resolves_to_latest() {
        let delete = ChangeToPush::DeleteSymptom {
            id: "sym_a".to_string(),
            deletion_date: at(10),
        };
        let update = ChangeToPush::UpdateSymptom {
            symptom: symptom_at("sym_a", "revived", 11),
        };

        assert_eq!(merge(delete, update.clone()), Some(update));
    }

    #[test]
    fn test_equal_dates_keep_latest_intent() {
        let first = ChangeToPush::UpdateSymptom {
            symptom: symptom_at("sym_a", "first", 10),
        };
        let second = ChangeToPush::UpdateSymptom {
            symptom: symptom_at("sym_a", "second", 10),
        };

        assert_eq!(merge(first, second.clone()), Some(second));
    }
}
