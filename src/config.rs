//! Client Configuration
//!
//! Compile-time defaults for the sync loop plus a configuration record
//! that can be overridden through environment variables.

use std::time::Duration;

/// Seconds between sync ticks.
pub const REMOTE_LOOP_WAIT_SECS: u64 = 5;

/// Backward shift applied to `lastPulledAt` before each pull, to cover
/// concurrent writers on other devices with skewed clocks.
pub const PULL_OVERLAP_SECONDS: i64 = 30;

/// Namespace prefix for all persisted keys.
pub const STORAGE_PREFIX: &str = "health";

/// Process-wide client configuration
///
/// Runtime settings (endpoint URL, token) live in `SettingsStore`; this
/// record carries only the knobs that are fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Period of the continuous sync loop
    pub remote_loop_wait: Duration,
    /// Pull overlap window in seconds
    pub pull_overlap_seconds: i64,
    /// Namespace for persisted keys
    pub storage_prefix: String,
    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            remote_loop_wait: Duration::from_secs(REMOTE_LOOP_WAIT_SECS),
            pull_overlap_seconds: PULL_OVERLAP_SECONDS,
            storage_prefix: STORAGE_PREFIX.to_string(),
            request_timeout_ms: 5000,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(secs) = std::env::var("VITALSYNC_LOOP_WAIT_SECS") {
            if let Ok(s) = secs.parse() {
                config.remote_loop_wait = Duration::from_secs(s);
            }
        }
        if let Ok(secs) = std::env::var("VITALSYNC_PULL_OVERLAP_SECS") {
            if let Ok(s) = secs.parse() {
                config.pull_overlap_seconds = s;
            }
        }
        if let Ok(prefix) = std::env::var("VITALSYNC_STORAGE_PREFIX") {
            config.storage_prefix = prefix;
        }
        if let Ok(ms) = std::env::var("VITALSYNC_REQUEST_TIMEOUT_MS") {
            if let Ok(t) = ms.parse() {
                config.request_timeout_ms = t;
            }
        }

        config
    }
}
