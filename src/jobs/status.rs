use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::client::{provider_error_message, RemoteJobClient};

/// A status check that did not produce a usable 2xx JSON body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StatusFetchError {
    /// Upstream HTTP status when one was received
    pub status: Option<u16>,
    pub message: String,
}

/// Fetches the current status body for a job id
///
/// Injected into the poll loop so the video and transcription endpoints (and
/// tests) can supply their own implementation.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    async fn fetch_status(&self, job_id: &str) -> Result<Value, StatusFetchError>;
}

/// Sentinel values a provider uses in its status field
#[derive(Debug, Clone, Copy)]
pub struct StatusVocabulary {
    pub field: &'static str,
    pub completed: &'static [&'static str],
    pub failed: &'static [&'static str],
    pub in_progress: &'static [&'static str],
}

/// Prediction-style providers (video, transcription, image)
pub const PREDICTION_STATUS: StatusVocabulary = StatusVocabulary {
    field: "status",
    completed: &["succeeded", "completed"],
    failed: &["failed", "canceled"],
    in_progress: &["starting", "queued", "pending", "processing", "running"],
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusClass {
    Completed,
    Failed(String),
    Processing {
        status: Option<String>,
        recognized: bool,
    },
}

impl StatusVocabulary {
    pub fn status_of<'a>(&self, body: &'a Value) -> Option<&'a str> {
        body.get(self.field).and_then(Value::as_str)
    }

    pub fn is_failed(&self, status: &str) -> bool {
        contains(self.failed, status)
    }

    /// Anything that is neither completed nor failed counts as processing.
    /// `recognized` tells whether the value was one of the known in-progress
    /// sentinels.
    pub fn classify(&self, body: &Value) -> StatusClass {
        let Some(status) = self.status_of(body) else {
            return StatusClass::Processing {
                status: None,
                recognized: false,
            };
        };

        if contains(self.completed, status) {
            StatusClass::Completed
        } else if contains(self.failed, status) {
            let message = provider_error_message(body)
                .unwrap_or_else(|| format!("provider reported status '{status}'"));
            StatusClass::Failed(message)
        } else {
            StatusClass::Processing {
                status: Some(status.to_string()),
                recognized: contains(self.in_progress, status),
            }
        }
    }
}

fn contains(values: &[&str], status: &str) -> bool {
    values.iter().any(|v| v.eq_ignore_ascii_case(status))
}

/// Status fetch over HTTP: `GET {base_url}/{job_id}` with a bearer credential
pub struct HttpStatusFetcher {
    client: RemoteJobClient,
    base_url: String,
    credential: String,
}

impl HttpStatusFetcher {
    pub fn new(client: RemoteJobClient, base_url: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            credential: credential.into(),
        }
    }

    fn status_url(&self, job_id: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), job_id)
    }
}

#[async_trait]
impl StatusFetcher for HttpStatusFetcher {
    async fn fetch_status(&self, job_id: &str) -> Result<Value, StatusFetchError> {
        let url = self.status_url(job_id);
        debug!("Fetching status for job {} from {}", job_id, url);

        let response = self
            .client
            .http()
            .get(&url)
            .bearer_auth(&self.credential)
            .send()
            .await
            .map_err(|e| StatusFetchError {
                status: e.status().map(|s| s.as_u16()),
                message: format!("status request failed: {e}"),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| StatusFetchError {
            status: Some(status.as_u16()),
            message: format!("failed to read status response: {e}"),
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|body| provider_error_message(&body))
                .unwrap_or_else(|| format!("provider returned HTTP {}", status.as_u16()));
            return Err(StatusFetchError {
                status: Some(status.as_u16()),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| StatusFetchError {
            status: Some(status.as_u16()),
            message: format!("status response is not valid JSON: {e}"),
        })
    }
}
