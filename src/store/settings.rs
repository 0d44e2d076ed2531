//! SettingsStore - endpoint configuration and the last pull anchor

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::domain::Settings;

use super::error::StoreError;
use super::events::{SettingsEvent, EVENT_CHANNEL_CAPACITY};

/// Holds the device's remote configuration
///
/// Fields stay `None` until the user configures them; the sync engine
/// treats a missing url or token as "not configured".
#[derive(Debug)]
pub struct SettingsStore {
    settings: Settings,
    events: broadcast::Sender<SettingsEvent>,
    initialized: bool,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            settings: Settings::default(),
            events,
            initialized: false,
        }
    }

    /// Subscribe to the change stream
    pub fn subscribe(&self) -> broadcast::Receiver<SettingsEvent> {
        self.events.subscribe()
    }

    /// Load the persisted settings
    ///
    /// Guarded: a second call fails with `InitializationFailed`.
    pub fn initialize(&mut self, settings: Settings) -> Result<(), StoreError> {
        if self.initialized {
            return Err(StoreError::InitializationFailed);
        }
        self.initialized = true;
        self.settings = settings;

        let _ = self.events.send(SettingsEvent::Initialized);
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn api_url(&self) -> Option<&str> {
        self.settings.api_url.as_deref()
    }

    pub fn api_token(&self) -> Option<&str> {
        self.settings.api_token.as_deref()
    }

    pub fn last_pulled_at(&self) -> Option<DateTime<Utc>> {
        self.settings.last_pulled_at
    }

    pub fn set_api_url(&mut self, url: Option<String>) {
        self.settings.api_url = url;
        let _ = self.events.send(SettingsEvent::Updated);
    }

    pub fn set_api_token(&mut self, token: Option<String>) {
        self.settings.api_token = token;
        let _ = self.events.send(SettingsEvent::Updated);
    }

    pub fn set_last_pulled_at(&mut self, instant: DateTime<Utc>) {
        self.settings.last_pulled_at = Some(instant);
        let _ = self.events.send(SettingsEvent::Updated);
    }
}
