//! DayIndex - calendar-day buckets over metric dates
//!
//! Maps local calendar day → set of metric ids so that "last N days"
//! queries scan only the relevant buckets. A BTreeMap keeps days ordered
//! for cheap range scans; totals are small so no secondary storage is
//! involved.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

/// Day-bucket index for metric ids
#[derive(Debug, Default)]
pub struct DayIndex {
    buckets: BTreeMap<NaiveDate, HashSet<String>>,
}

impl DayIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an id to a day bucket
    pub fn insert(&mut self, day: NaiveDate, id: &str) {
        self.buckets.entry(day).or_default().insert(id.to_string());
    }

    /// Remove an id from a day bucket, pruning the bucket when empty
    pub fn remove(&mut self, day: NaiveDate, id: &str) {
        if let Some(ids) = self.buckets.get_mut(&day) {
            ids.remove(id);
            if ids.is_empty() {
                self.buckets.remove(&day);
            }
        }
    }

    /// Move an id between buckets when its date changed
    pub fn reassign(&mut self, old_day: NaiveDate, new_day: NaiveDate, id: &str) {
        if old_day == new_day {
            return;
        }
        self.remove(old_day, id);
        self.insert(new_day, id);
    }

    /// Whether the given bucket contains the id
    pub fn contains(&self, day: NaiveDate, id: &str) -> bool {
        self.buckets.get(&day).is_some_and(|ids| ids.contains(id))
    }

    /// Ids of all metrics dated in `[from, to]`, unordered
    pub fn ids_in_range(&self, from: NaiveDate, to: NaiveDate) -> HashSet<String> {
        self.buckets
            .range(from..=to)
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect()
    }

    /// Number of the buckets currently holding at least one id
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Day of the bucket holding the given id, if any
    pub fn day_of(&self, id: &str) -> Option<NaiveDate> {
        self.buckets
            .iter()
            .find(|(_, ids)| ids.contains(id))
            .map(|(day, _)| *day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_insert_and_range() {
        let mut index = DayIndex::new();
        index.insert(day(2024, 3, 1), "met_a");
        index.insert(day(2024, 3, 2), "met_b");
        index.insert(day(2024, 3, 5), "met_c");

        let hits = index.ids_in_range(day(2024, 3, 1), day(2024, 3, 2));
        assert_eq!(hits.len(), 2);
        assert!(hits.contains("met_a"));
        assert!(hits.contains("met_b"));
    }

    #[test]
    fn test_remove_prunes_empty_buckets() {
        let mut index = DayIndex::new();
        index.insert(day(2024, 3, 1), "met_a");
        assert_eq!(index.bucket_count(), 1);

        index.remove(day(2024, 3, 1), "met_a");
        assert_eq!(index.bucket_count(), 0);
        assert!(!index.contains(day(2024, 3, 1), "met_a"));
    }

    #[test]
    fn test_reassign_moves_between_buckets() {
        let mut index = DayIndex::new();
        index.insert(day(2024, 3, 1), "met_a");

        index.reassign(day(2024, 3, 1), day(2024, 3, 7), "met_a");

        assert!(!index.contains(day(2024, 3, 1), "met_a"));
        assert!(index.contains(day(2024, 3, 7), "met_a"));
        assert_eq!(index.day_of("met_a"), Some(day(2024, 3, 7)));
        assert_eq!(index.bucket_count(), 1);
    }

    #[test]
    fn test_id_lives_in_exactly_one_bucket() {
        let mut index = DayIndex::new();
        index.insert(day(2024, 3, 1), "met_a");
        index.reassign(day(2024, 3, 1), day(2024, 3, 2), "met_a");
        index.reassign(day(2024, 3, 2), day(2024, 3, 2), "met_a");

        let all = index.ids_in_range(day(2024, 1, 1), day(2024, 12, 31));
        assert_eq!(all.len(), 1);
        assert_eq!(index.day_of("met_a"), Some(day(2024, 3, 2)));
    }
}
