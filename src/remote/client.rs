//! Remote API client
//!
//! Thin typed wrapper over the sync server's JSON endpoints. Every
//! request carries the `x-api-key` header; transport failures map onto
//! [`RemoteError`] so the sync engine can fold them into its status
//! machine instead of bubbling them up.

use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::domain::{Metric, Symptom};

use super::dto::{
    decode_metrics, decode_symptoms, ApiMetric, ApiSymptom, DecodeError, PushReport,
};
use super::error::RemoteError;

/// Connection parameters taken from the settings store
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the sync server; a trailing `/` is trimmed
    pub base_url: String,
    /// Static per-deployment token sent as `x-api-key`
    pub api_token: String,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.into(),
        }
    }
}

/// Entities delivered by a `/get-all` pull
///
/// `decode_errors` lists the entities the server sent but the client
/// could not understand; the good items are still usable.
#[derive(Debug, Default)]
pub struct PulledBatch {
    pub symptoms: Vec<Symptom>,
    pub metrics: Vec<Metric>,
    pub decode_errors: Vec<DecodeError>,
}

/// Per-entity outcome of a `/push-all` bulk upload
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PushAllOutcome {
    pub symptoms: PushReport,
    pub metrics: PushReport,
}

/// Typed request/response client for the sync server
pub struct ApiClient {
    http: Client,
    config: RemoteConfig,
}

impl ApiClient {
    /// Create a client with its own connection pool
    pub fn new(config: RemoteConfig, request_timeout_ms: u64) -> Self {
        let http = Client::builder()
            .timeout(std::time::Duration::from_millis(request_timeout_ms))
            .build()
            .expect("failed to create HTTP client");

        Self { http, config }
    }

    /// Create a client reusing an existing connection pool
    ///
    /// The sync engine rebuilds its client whenever the configured URL or
    /// token changes; sharing the pool keeps that cheap.
    pub fn from_parts(http: Client, config: RemoteConfig) -> Self {
        Self { http, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Check if the server is reachable
    pub async fn health_check(&self) -> Result<(), RemoteError> {
        let response = self
            .http
            .get(self.url("/health"))
            .header("x-api-key", &self.config.api_token)
            .send()
            .await
            .map_err(map_send_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(RemoteError::Server {
                status: response.status().as_u16(),
            })
        }
    }

    /// Pull every entity published since the given instant
    pub async fn read_all(
        &self,
        published_since: Option<DateTime<Utc>>,
    ) -> Result<PulledBatch, RemoteError> {
        let mut request = self
            .http
            .get(self.url("/get-all"))
            .header("x-api-key", &self.config.api_token);

        if let Some(since) = published_since {
            request = request.query(&[("published_since", since.to_rfc3339())]);
        }

        let response = request.send().await.map_err(map_send_error)?;
        let body: ReadAllResponseBody = decode_body(check_status(response).await?).await?;

        let (symptoms, symptom_errors) = decode_symptoms(body.symptoms);
        let (metrics, metric_errors) = decode_metrics(body.metrics);

        let mut decode_errors = symptom_errors;
        decode_errors.extend(metric_errors);
        for error in &decode_errors {
            tracing::warn!(entity = %error.id, reason = %error.reason, "skipping undecodable pulled entity");
        }

        Ok(PulledBatch {
            symptoms,
            metrics,
            decode_errors,
        })
    }

    /// Publish a locally created symptom
    pub async fn create_symptom(&self, symptom: &Symptom) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(self.url("/symptoms"))
            .header("x-api-key", &self.config.api_token)
            .json(&ApiSymptom::from(symptom))
            .send()
            .await
            .map_err(map_send_error)?;

        let _: CreatedSymptomResponseBody = decode_body(check_status(response).await?).await?;
        Ok(())
    }

    /// Publish a locally updated symptom
    pub async fn update_symptom(&self, symptom: &Symptom) -> Result<(), RemoteError> {
        let body = UpdateSymptomRequestBody {
            name: symptom.name.clone(),
            other_names: symptom.other_names.clone(),
            updated_at: symptom.last_modified.to_rfc3339(),
        };

        let response = self
            .http
            .patch(self.url(&format!("/symptoms/{}", symptom.id)))
            .header("x-api-key", &self.config.api_token)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        if response.status() == StatusCode::CONFLICT {
            return Err(RemoteError::SymptomNotFound(symptom.id.clone()));
        }

        let _: UpdatedSymptomResponseBody = decode_body(check_status(response).await?).await?;
        Ok(())
    }

    /// Publish a local symptom deletion
    pub async fn delete_symptom(&self, id: &str) -> Result<(), RemoteError> {
        let response = self
            .http
            .delete(self.url(&format!("/symptoms/{id}")))
            .header("x-api-key", &self.config.api_token)
            .send()
            .await
            .map_err(map_send_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RemoteError::SymptomNotFound(id.to_string()));
        }

        let _: DeletedSymptomResponseBody = decode_body(check_status(response).await?).await?;
        Ok(())
    }

    /// Publish a locally created metric
    pub async fn create_metric(&self, metric: &Metric) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(self.url("/metrics"))
            .header("x-api-key", &self.config.api_token)
            .json(&ApiMetric::from(metric))
            .send()
            .await
            .map_err(map_send_error)?;

        let _: CreatedMetricResponseBody = decode_body(check_status(response).await?).await?;
        Ok(())
    }

    /// Publish a locally updated metric
    pub async fn update_metric(&self, metric: &Metric) -> Result<(), RemoteError> {
        let body = UpdateMetricRequestBody {
            symptom_id: metric.symptom_id.clone(),
            date: metric.date.to_rfc3339(),
            updated_at: metric.last_modified.to_rfc3339(),
            intensity: metric.intensity.to_string(),
            notes: metric.notes.clone(),
        };

        let response = self
            .http
            .patch(self.url(&format!("/metrics/{}", metric.id)))
            .header("x-api-key", &self.config.api_token)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        if response.status() == StatusCode::CONFLICT {
            return Err(RemoteError::MetricNotFound(metric.id.clone()));
        }

        let _: UpdatedMetricResponseBody = decode_body(check_status(response).await?).await?;
        Ok(())
    }

    /// Publish a local metric deletion
    pub async fn delete_metric(&self, id: &str) -> Result<(), RemoteError> {
        let response = self
            .http
            .delete(self.url(&format!("/metrics/{id}")))
            .header("x-api-key", &self.config.api_token)
            .send()
            .await
            .map_err(map_send_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RemoteError::MetricNotFound(id.to_string()));
        }

        let _: DeletedMetricResponseBody = decode_body(check_status(response).await?).await?;
        Ok(())
    }

    /// Bulk-upload the whole domain, bypassing the change queue
    pub async fn push_all(
        &self,
        symptoms: &[Symptom],
        metrics: &[Metric],
    ) -> Result<PushAllOutcome, RemoteError> {
        let body = PushAllRequestBody {
            symptoms: symptoms.iter().map(ApiSymptom::from).collect(),
            metrics: metrics.iter().map(ApiMetric::from).collect(),
        };

        let response = self
            .http
            .post(self.url("/push-all"))
            .header("x-api-key", &self.config.api_token)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let body: PushAllResponseBody = decode_body(check_status(response).await?).await?;
        Ok(PushAllOutcome {
            symptoms: body.symptoms,
            metrics: body.metrics,
        })
    }
}

/// Map reqwest send failures onto the transport taxonomy
fn map_send_error(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Timeout
    } else if error.is_connect() {
        RemoteError::FailedToConnect
    } else {
        RemoteError::Request(error)
    }
}

/// Fold non-success statuses into the error taxonomy
async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::UNAUTHORIZED {
        return Err(RemoteError::InvalidApiKey);
    }

    if status.is_client_error() {
        let message = match response.json::<ErrorResponseBody>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown client error")
                .to_string(),
        };
        return Err(RemoteError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Err(RemoteError::Server {
        status: status.as_u16(),
    })
}

async fn decode_body<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    response
        .json()
        .await
        .map_err(|e| RemoteError::MalformedResponse(e.to_string()))
}

// ============================================
// Request/Response bodies
// ============================================

#[derive(Debug, Serialize)]
struct UpdateSymptomRequestBody {
    name: String,
    other_names: Vec<String>,
    updated_at: String,
}

#[derive(Debug, Serialize)]
struct UpdateMetricRequestBody {
    symptom_id: String,
    date: String,
    updated_at: String,
    intensity: String,
    notes: String,
}

#[derive(Debug, Serialize)]
struct PushAllRequestBody {
    symptoms: Vec<ApiSymptom>,
    metrics: Vec<ApiMetric>,
}

#[derive(Debug, Deserialize)]
struct ReadAllResponseBody {
    #[serde(default)]
    symptoms: Vec<ApiSymptom>,
    #[serde(default)]
    metrics: Vec<ApiMetric>,
}

#[derive(Debug, Deserialize)]
struct CreatedSymptomResponseBody {
    #[allow(dead_code)]
    created_symptom: ApiSymptom,
}

#[derive(Debug, Deserialize)]
struct UpdatedSymptomResponseBody {
    #[allow(dead_code)]
    updated_symptom: ApiSymptom,
}

#[derive(Debug, Deserialize)]
struct DeletedSymptomResponseBody {
    #[allow(dead_code)]
    deleted_symptom: String,
}

#[derive(Debug, Deserialize)]
struct CreatedMetricResponseBody {
    #[allow(dead_code)]
    created_metric: ApiMetric,
}

#[derive(Debug, Deserialize)]
struct UpdatedMetricResponseBody {
    #[allow(dead_code)]
    updated_metric: ApiMetric,
}

#[derive(Debug, Deserialize)]
struct DeletedMetricResponseBody {
    #[allow(dead_code)]
    deleted_metric: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponseBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct PushAllResponseBody {
    symptoms: PushReport,
    metrics: PushReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = RemoteConfig::new("https://api.example.com/", "token");
        assert_eq!(config.base_url, "https://api.example.com");

        let client = ApiClient::new(config, 5000);
        assert_eq!(client.url("/get-all"), "https://api.example.com/get-all");
    }

    #[test]
    fn test_untrimmed_base_url_passes_through() {
        let config = RemoteConfig::new("http://localhost:8000", "token");
        assert_eq!(config.base_url, "http://localhost:8000");
    }
}
