//! Sync status state machine and connection classification

use crate::domain::Settings;

/// User-facing sync indicator
///
/// Transitions are driven exclusively by the sync tick phases plus
/// `queue_change → WaitingToSync`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Offline,
    OfflinePendingPush,
    WaitingToSync,
    Pulling,
    Pushing,
    OnlineButSyncFailed,
    OnlineAndSynced,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SyncStatus::Offline => "offline",
            SyncStatus::OfflinePendingPush => "offline, pending push",
            SyncStatus::WaitingToSync => "waiting to sync",
            SyncStatus::Pulling => "pulling",
            SyncStatus::Pushing => "pushing",
            SyncStatus::OnlineButSyncFailed => "online but sync failed",
            SyncStatus::OnlineAndSynced => "online and synced",
        };
        write!(f, "{text}")
    }
}

/// What a tick can do with the current device state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// The device reports no connectivity and the endpoint is remote
    Offline,
    /// `api_url` or `api_token` is unset
    MissingConfig,
    /// Configured and reachable in principle
    DeviceReady,
}

/// Source of the device's connectivity flag
///
/// The browser-style "am I online" signal; a localhost endpoint bypasses
/// it because the loopback interface works without a network.
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Probe that always reports connectivity, for environments without a
/// usable signal
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl ConnectivityProbe for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Whether a URL points at the local machine
pub fn is_localhost_url(url: &str) -> bool {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|host| matches!(host, "localhost" | "127.0.0.1" | "[::1]" | "::1")))
        .unwrap_or(false)
}

/// Classify what the sync tick can do right now
pub fn classify_connection(settings: &Settings, device_online: bool) -> ConnectionStatus {
    let localhost = settings
        .api_url
        .as_deref()
        .map(is_localhost_url)
        .unwrap_or(false);

    if !device_online && !localhost {
        return ConnectionStatus::Offline;
    }

    if settings.api_url.is_none() || settings.api_token.is_none() {
        return ConnectionStatus::MissingConfig;
    }

    ConnectionStatus::DeviceReady
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(url: Option<&str>, token: Option<&str>) -> Settings {
        Settings {
            api_url: url.map(String::from),
            api_token: token.map(String::from),
            last_pulled_at: None,
        }
    }

    #[test]
    fn test_offline_device_with_remote_url() {
        let s = settings(Some("https://api.example.com"), Some("t"));
        assert_eq!(classify_connection(&s, false), ConnectionStatus::Offline);
    }

    #[test]
    fn test_localhost_bypasses_online_check() {
        let s = settings(Some("http://localhost:8000"), Some("t"));
        assert_eq!(classify_connection(&s, false), ConnectionStatus::DeviceReady);

        let s = settings(Some("http://127.0.0.1:8000"), Some("t"));
        assert_eq!(classify_connection(&s, false), ConnectionStatus::DeviceReady);
    }

    #[test]
    fn test_missing_config() {
        assert_eq!(
            classify_connection(&settings(None, None), true),
            ConnectionStatus::MissingConfig
        );
        assert_eq!(
            classify_connection(&settings(Some("https://api.example.com"), None), true),
            ConnectionStatus::MissingConfig
        );
        assert_eq!(
            classify_connection(&settings(None, Some("t")), true),
            ConnectionStatus::MissingConfig
        );
    }

    #[test]
    fn test_offline_wins_over_missing_config() {
        // No URL means no localhost bypass either
        assert_eq!(
            classify_connection(&settings(None, Some("t")), false),
            ConnectionStatus::Offline
        );
    }

    #[test]
    fn test_ready_when_configured_and_online() {
        let s = settings(Some("https://api.example.com"), Some("t"));
        assert_eq!(classify_connection(&s, true), ConnectionStatus::DeviceReady);
    }

    #[test]
    fn test_localhost_url_detection() {
        assert!(is_localhost_url("http://localhost:8000/api"));
        assert!(is_localhost_url("http://127.0.0.1"));
        assert!(!is_localhost_url("https://api.example.com"));
        assert!(!is_localhost_url("not a url"));
    }
}
