//! ChangeQueue - ordered, per-entity pending-mutation log
//!
//! Holds at most one pending change per entity id: enqueuing a second
//! change for the same entity merges with the existing one via the rules
//! in [`super::change`], in place, so insertion order is preserved.

use super::change::{merge, ChangeToPush};

/// Insertion-ordered queue of pending changes, one per entity
#[derive(Debug, Default)]
pub struct ChangeQueue {
    entries: Vec<ChangeToPush>,
}

impl ChangeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue contents with a persisted snapshot
    pub fn hydrate(&mut self, changes: Vec<ChangeToPush>) {
        self.entries = changes;
    }

    /// Enqueue a change, merging with any pending change for the same id
    pub fn enqueue(&mut self, change: ChangeToPush) {
        let position = self
            .entries
            .iter()
            .position(|pending| pending.entity_id() == change.entity_id());

        match position {
            None => self.entries.push(change),
            Some(index) => {
                let existing = self.entries.remove(index);
                match merge(existing, change) {
                    Some(merged) => self.entries.insert(index, merged),
                    None => {
                        tracing::debug!("pending changes cancelled each other");
                    }
                }
            }
        }
    }

    /// Pending change for an entity, if any
    pub fn get(&self, entity_id: &str) -> Option<&ChangeToPush> {
        self.entries
            .iter()
            .find(|change| change.entity_id() == entity_id)
    }

    /// Remove and return the pending change for an entity
    pub fn remove(&mut self, entity_id: &str) -> Option<ChangeToPush> {
        let index = self
            .entries
            .iter()
            .position(|change| change.entity_id() == entity_id)?;
        Some(self.entries.remove(index))
    }

    /// Clone the queue contents in insertion order
    pub fn snapshot(&self) -> Vec<ChangeToPush> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
