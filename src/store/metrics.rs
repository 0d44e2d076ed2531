//! MetricStore - keyed metric map with day-bucket index
//!
//! Exclusively owns the metric map and its day index. The index is kept
//! consistent on every mutation: a metric's id lives in exactly the
//! bucket of its local calendar day.

use std::collections::HashMap;
use tokio::sync::broadcast;

use chrono::{DateTime, Duration, Local, Utc};

use crate::domain::{generate_metric_id, local_day, Intensity, Metric, MetricId, SymptomId};
use crate::index::DayIndex;

use super::error::StoreError;
use super::events::{MetricEvent, EVENT_CHANNEL_CAPACITY};

/// Keyed map of metrics plus the day-bucket index over their dates
#[derive(Debug)]
pub struct MetricStore {
    metrics: HashMap<MetricId, Metric>,
    by_day: DayIndex,
    events: broadcast::Sender<MetricEvent>,
    initialized: bool,
}

impl Default for MetricStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            metrics: HashMap::new(),
            by_day: DayIndex::new(),
            events,
            initialized: false,
        }
    }

    /// Subscribe to the change stream
    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.events.subscribe()
    }

    /// Load the initial metric set
    ///
    /// Guarded: a second call fails with `InitializationFailed`.
    pub fn initialize(&mut self, metrics: Vec<Metric>) -> Result<(), StoreError> {
        if self.initialized {
            return Err(StoreError::InitializationFailed);
        }
        self.initialized = true;

        for metric in metrics {
            self.by_day.insert(local_day(metric.date), &metric.id);
            self.metrics.insert(metric.id.clone(), metric);
        }

        let _ = self.events.send(MetricEvent::Initialized);
        Ok(())
    }

    /// Record an observation from user input
    ///
    /// Generates a fresh id, retrying on collision, and stamps
    /// `last_modified` with the current instant.
    pub fn add(
        &mut self,
        symptom_id: SymptomId,
        intensity: Intensity,
        date: DateTime<Utc>,
        notes: impl Into<String>,
    ) -> Metric {
        let mut id = generate_metric_id();
        while self.metrics.contains_key(&id) {
            id = generate_metric_id();
        }

        let metric = Metric {
            id,
            symptom_id,
            intensity,
            date,
            notes: notes.into(),
            last_modified: Utc::now(),
        };

        self.by_day.insert(local_day(metric.date), &metric.id);
        self.metrics.insert(metric.id.clone(), metric.clone());

        tracing::debug!(id = %metric.id, symptom_id = %metric.symptom_id, "metric added");
        let _ = self.events.send(MetricEvent::Added {
            id: metric.id.clone(),
        });
        metric
    }

    /// Replace an existing metric, stamping `last_modified`
    ///
    /// Moves the id between day buckets when the date changed.
    pub fn update(&mut self, mut metric: Metric) -> Result<Metric, StoreError> {
        let previous = match self.metrics.get(&metric.id) {
            Some(previous) => previous,
            None => return Err(StoreError::FailedToUpdateMetric(metric.id)),
        };

        metric.last_modified = Utc::now();
        self.by_day
            .reassign(local_day(previous.date), local_day(metric.date), &metric.id);
        self.metrics.insert(metric.id.clone(), metric.clone());

        let _ = self.events.send(MetricEvent::Updated {
            id: metric.id.clone(),
        });
        Ok(metric)
    }

    /// Remove a metric; deleting a missing id is a no-op
    pub fn delete(&mut self, id: &str) {
        match self.metrics.remove(id) {
            Some(metric) => {
                self.by_day.remove(local_day(metric.date), id);
                let _ = self.events.send(MetricEvent::Deleted { id: id.to_string() });
            }
            None => {
                tracing::debug!(id = %id, "delete ignored, metric not in store");
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Metric> {
        self.metrics.get(id)
    }

    /// All metrics, newest first
    pub fn get_all(&self) -> Vec<Metric> {
        let mut all: Vec<Metric> = self.metrics.values().cloned().collect();
        all.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Metrics whose local calendar day falls in the N-day window ending
    /// today, newest first
    pub fn metrics_of_last_n_days(&self, n: u32) -> Vec<Metric> {
        if n == 0 {
            return Vec::new();
        }

        let today = Local::now().date_naive();
        let from = today - Duration::days(i64::from(n) - 1);

        let mut window: Vec<Metric> = self
            .by_day
            .ids_in_range(from, today)
            .into_iter()
            .filter_map(|id| self.metrics.get(&id).cloned())
            .collect();
        window.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        window
    }

    /// Whether any metric references the given symptom
    pub fn is_symptom_used_in_history(&self, symptom_id: &str) -> bool {
        self.metrics
            .values()
            .any(|metric| metric.symptom_id == symptom_id)
    }

    /// Ingest metrics delivered by a remote pull
    ///
    /// Upserts keep the remote `last_modified`. Emits a single
    /// `AddedFromExternalSource` event so observers persist and redraw
    /// without re-queueing a push.
    pub fn add_pulled_data(&mut self, pulled: Vec<Metric>) {
        if pulled.is_empty() {
            return;
        }

        for metric in pulled {
            if let Some(previous) = self.metrics.get(&metric.id) {
                self.by_day
                    .reassign(local_day(previous.date), local_day(metric.date), &metric.id);
            } else {
                self.by_day.insert(local_day(metric.date), &metric.id);
            }
            self.metrics.insert(metric.id.clone(), metric);
        }

        let _ = self.events.send(MetricEvent::AddedFromExternalSource);
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn day_index(&self) -> &DayIndex {
        &self.by_day
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn metric(id: &str, symptom_id: &str, date: DateTime<Utc>) -> Metric {
        Metric {
            id: id.to_string(),
            symptom_id: symptom_id.to_string(),
            intensity: Intensity::Medium,
            date,
            notes: String::new(),
            last_modified: date,
        }
    }

    fn local_noon(days_ago: i64) -> DateTime<Utc> {
        let day = Local::now().date_naive() - Duration::days(days_ago);
        Local
            .from_local_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_initialize_is_guarded() {
        let mut store = MetricStore::new();
        store
            .initialize(vec![metric("met_a", "sym_a", local_noon(0))])
            .unwrap();

        assert_eq!(
            store.initialize(vec![]),
            Err(StoreError::InitializationFailed)
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_all_newest_first() {
        let mut store = MetricStore::new();
        store
            .initialize(vec![
                metric("met_a", "sym_a", local_noon(2)),
                metric("met_b", "sym_a", local_noon(0)),
                metric("met_c", "sym_a", local_noon(1)),
            ])
            .unwrap();

        let ids: Vec<String> = store.get_all().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["met_b", "met_c", "met_a"]);
    }

    #[test]
    fn test_last_n_days_window() {
        let mut store = MetricStore::new();
        store
            .initialize(vec![
                metric("met_today", "sym_a", local_noon(0)),
                metric("met_recent", "sym_a", local_noon(2)),
                metric("met_old", "sym_a", local_noon(10)),
            ])
            .unwrap();

        let window: Vec<String> = store
            .metrics_of_last_n_days(3)
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(window, vec!["met_today", "met_recent"]);

        assert!(store.metrics_of_last_n_days(0).is_empty());
    }

    #[test]
    fn test_update_moves_day_bucket() {
        let mut store = MetricStore::new();
        store
            .initialize(vec![metric("met_a", "sym_a", local_noon(5))])
            .unwrap();

        let mut moved = store.get("met_a").unwrap().clone();
        moved.date = local_noon(0);
        store.update(moved).unwrap();

        let today = Local::now().date_naive();
        assert!(store.day_index().contains(today, "met_a"));
        assert_eq!(store.day_index().day_of("met_a"), Some(today));
    }

    #[test]
    fn test_delete_clears_bucket() {
        let mut store = MetricStore::new();
        store
            .initialize(vec![metric("met_a", "sym_a", local_noon(0))])
            .unwrap();

        store.delete("met_a");

        assert!(store.is_empty());
        assert_eq!(store.day_index().bucket_count(), 0);

        // Missing delete is a quiet no-op
        store.delete("met_a");
    }

    #[test]
    fn test_update_missing_fails_typed() {
        let mut store = MetricStore::new();
        store.initialize(vec![]).unwrap();

        let result = store.update(metric("met_ghost", "sym_a", local_noon(0)));
        assert_eq!(
            result,
            Err(StoreError::FailedToUpdateMetric("met_ghost".to_string()))
        );
    }

    #[test]
    fn test_symptom_usage_lookup() {
        let mut store = MetricStore::new();
        store
            .initialize(vec![metric("met_a", "sym_a", local_noon(0))])
            .unwrap();

        assert!(store.is_symptom_used_in_history("sym_a"));
        assert!(!store.is_symptom_used_in_history("sym_b"));
    }

    #[test]
    fn test_pulled_data_keeps_remote_timestamps() {
        let mut store = MetricStore::new();
        store.initialize(vec![]).unwrap();
        let mut rx = store.subscribe();
        let _ = rx.try_recv();

        let remote_stamp = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        let mut pulled = metric("met_a", "sym_a", local_noon(0));
        pulled.last_modified = remote_stamp;

        store.add_pulled_data(vec![pulled]);

        assert_eq!(rx.try_recv().unwrap(), MetricEvent::AddedFromExternalSource);
        assert_eq!(store.get("met_a").unwrap().last_modified, remote_stamp);
    }

    #[test]
    fn test_pulled_update_moves_day_bucket() {
        let mut store = MetricStore::new();
        store
            .initialize(vec![metric("met_a", "sym_a", local_noon(5))])
            .unwrap();

        store.add_pulled_data(vec![metric("met_a", "sym_a", local_noon(0))]);

        let today = Local::now().date_naive();
        assert_eq!(store.day_index().day_of("met_a"), Some(today));
        assert_eq!(store.len(), 1);
    }
}
