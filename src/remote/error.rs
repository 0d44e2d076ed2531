//! Remote API error taxonomy

use thiserror::Error;

/// Errors from talking to the remote store
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Network-level failure, the device is effectively offline
    #[error("failed to connect with API")]
    FailedToConnect,

    /// The request timed out
    #[error("request timeout")]
    Timeout,

    /// The server rejected the configured token
    #[error("invalid API token")]
    InvalidApiKey,

    /// Delete/update target does not exist on the server
    #[error("symptom {0} does not exist in the remote store")]
    SymptomNotFound(String),

    /// Delete/update target does not exist on the server
    #[error("metric {0} does not exist in the remote store")]
    MetricNotFound(String),

    /// 4xx with a JSON `{error}` envelope
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Any 5xx response
    #[error("server error {status}")]
    Server { status: u16 },

    /// The response body did not match the wire contract
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Other reqwest-level failure
    #[error("request failed: {0}")]
    Request(reqwest::Error),
}

impl RemoteError {
    /// Whether the failure is transient and queued changes should simply
    /// be retried on a later tick
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            RemoteError::FailedToConnect
                | RemoteError::Timeout
                | RemoteError::Server { .. }
                | RemoteError::MalformedResponse(_)
                | RemoteError::Request(_)
        )
    }
}
