//! SymptomStore - keyed symptom map with autocomplete index
//!
//! Exclusively owns the symptom map and its word index. All mutating
//! operations stamp `last_modified` with the current instant; items
//! arriving from a remote pull keep their remote timestamps and enter
//! through [`SymptomStore::add_pulled_data`].

use std::collections::HashMap;
use tokio::sync::broadcast;

use crate::domain::{generate_symptom_id, Symptom, SymptomId};
use crate::index::Autocompleter;

use super::error::StoreError;
use super::events::{SymptomEvent, EVENT_CHANNEL_CAPACITY};

/// Keyed map of symptoms plus the autocomplete index over their names
#[derive(Debug)]
pub struct SymptomStore {
    symptoms: HashMap<SymptomId, Symptom>,
    autocomplete: Autocompleter,
    events: broadcast::Sender<SymptomEvent>,
    initialized: bool,
}

impl Default for SymptomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SymptomStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            symptoms: HashMap::new(),
            autocomplete: Autocompleter::new(),
            events,
            initialized: false,
        }
    }

    /// Subscribe to the change stream
    pub fn subscribe(&self) -> broadcast::Receiver<SymptomEvent> {
        self.events.subscribe()
    }

    /// Load the initial symptom set
    ///
    /// Guarded: a second call fails with `InitializationFailed`.
    pub fn initialize(&mut self, symptoms: Vec<Symptom>) -> Result<(), StoreError> {
        if self.initialized {
            return Err(StoreError::InitializationFailed);
        }
        self.initialized = true;

        for symptom in symptoms {
            self.index_symptom(&symptom);
            self.symptoms.insert(symptom.id.clone(), symptom);
        }

        let _ = self.events.send(SymptomEvent::Initialized);
        Ok(())
    }

    /// Create a symptom from user input
    ///
    /// Generates a fresh id, retrying on the (unlikely) collision, and
    /// stamps `last_modified` with the current instant.
    pub fn add(&mut self, name: impl Into<String>, other_names: Vec<String>) -> Symptom {
        let mut id = generate_symptom_id();
        while self.symptoms.contains_key(&id) {
            id = generate_symptom_id();
        }

        let symptom = Symptom {
            id,
            name: name.into(),
            other_names,
            last_modified: chrono::Utc::now(),
        };

        self.index_symptom(&symptom);
        self.symptoms.insert(symptom.id.clone(), symptom.clone());

        tracing::debug!(id = %symptom.id, name = %symptom.name, "symptom added");
        let _ = self.events.send(SymptomEvent::Added {
            id: symptom.id.clone(),
        });
        symptom
    }

    /// Replace an existing symptom, stamping `last_modified`
    pub fn update(&mut self, mut symptom: Symptom) -> Result<Symptom, StoreError> {
        if !self.symptoms.contains_key(&symptom.id) {
            return Err(StoreError::FailedToUpdateSymptom(symptom.id));
        }

        symptom.last_modified = chrono::Utc::now();
        self.index_symptom(&symptom);
        self.symptoms.insert(symptom.id.clone(), symptom.clone());

        let _ = self.events.send(SymptomEvent::Updated {
            id: symptom.id.clone(),
        });
        Ok(symptom)
    }

    /// Remove a symptom; deleting a missing id is a no-op
    pub fn delete(&mut self, id: &str) {
        if self.symptoms.remove(id).is_none() {
            tracing::debug!(id = %id, "delete ignored, symptom not in store");
            return;
        }

        self.autocomplete.remove_item(id);
        let _ = self.events.send(SymptomEvent::Deleted { id: id.to_string() });
    }

    pub fn get(&self, id: &str) -> Option<&Symptom> {
        self.symptoms.get(id)
    }

    /// All symptoms, alphabetical by lowercase name
    pub fn get_all(&self) -> Vec<Symptom> {
        let mut all: Vec<Symptom> = self.symptoms.values().cloned().collect();
        all.sort_by_key(|symptom| symptom.name.to_lowercase());
        all
    }

    /// Symptoms matching every query token by word prefix
    ///
    /// The empty query returns all symptoms. Results are sorted like
    /// [`SymptomStore::get_all`].
    pub fn search(&self, query: &str) -> Vec<Symptom> {
        if query.trim().is_empty() {
            return self.get_all();
        }

        let mut hits: Vec<Symptom> = self
            .autocomplete
            .search(query)
            .into_iter()
            .filter_map(|id| self.symptoms.get(&id).cloned())
            .collect();
        hits.sort_by_key(|symptom| symptom.name.to_lowercase());
        hits
    }

    /// Ingest symptoms delivered by a remote pull
    ///
    /// Upserts keep the remote `last_modified`. Emits a single
    /// `AddedFromExternalSource` event so observers persist and redraw
    /// without re-queueing a push.
    pub fn add_pulled_data(&mut self, pulled: Vec<Symptom>) {
        if pulled.is_empty() {
            return;
        }

        for symptom in pulled {
            self.index_symptom(&symptom);
            self.symptoms.insert(symptom.id.clone(), symptom);
        }

        let _ = self.events.send(SymptomEvent::AddedFromExternalSource);
    }

    pub fn len(&self) -> usize {
        self.symptoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty()
    }

    fn index_symptom(&mut self, symptom: &Symptom) {
        let mut texts: Vec<&str> = vec![symptom.name.as_str()];
        texts.extend(symptom.other_names.iter().map(String::as_str));
        self.autocomplete.add_item(&symptom.id, &texts);
    }
}
