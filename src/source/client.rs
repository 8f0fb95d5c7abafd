//! HTTP client for the analysis backend.
//!
//! The backend computes the analysis and answers with a JSON envelope
//! (`file1Data`..`file6Data`, or `nodes`/`edges` for graph endpoints).
//! This client only moves that document; it never inspects it.

use crate::cli::FetchMethod;
use crate::config::BackendConfig;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The configured URL is unusable.
    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),

    /// No response within the configured timeout.
    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The backend could not be reached.
    #[error("cannot connect to backend at {url}")]
    Connect { url: String },

    /// The backend answered with a non-success status.
    #[error("backend error {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response body was not valid JSON.
    #[error("failed to decode backend response: {0}")]
    Decode(#[source] reqwest::Error),

    /// Any other transport failure.
    #[error("failed to send request: {0}")]
    Request(#[source] reqwest::Error),
}

/// Body of a POST request.
#[derive(Debug, Serialize)]
struct AnalysisRequest<'a> {
    article: &'a str,
}

/// Client for one backend endpoint.
pub struct BackendClient {
    http_client: reqwest::Client,
    url: String,
    method: FetchMethod,
    article: String,
    timeout_seconds: u64,
}

/// Join a base URL and an optional endpoint path with exactly one slash.
pub fn endpoint_url(base: &str, endpoint: Option<&str>) -> String {
    match endpoint.map(str::trim).filter(|e| !e.is_empty()) {
        Some(endpoint) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        ),
        None => base.to_string(),
    }
}

impl BackendClient {
    /// Create a client from backend settings.
    pub fn new(config: &BackendConfig) -> Result<Self, FetchError> {
        let base = config
            .url
            .as_deref()
            .ok_or_else(|| FetchError::InvalidUrl("no backend URL configured".to_string()))?;

        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(FetchError::InvalidUrl(base.to_string()));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(FetchError::Request)?;

        Ok(Self {
            http_client,
            url: endpoint_url(base, config.endpoint.as_deref()),
            method: config.method,
            article: config.article.clone(),
            timeout_seconds: config.timeout_seconds,
        })
    }

    /// Full URL requests are sent to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the analysis document.
    pub async fn fetch(&self) -> Result<Value, FetchError> {
        info!("Fetching analysis from {}", self.url);

        let request = match self.method {
            FetchMethod::Post => self.http_client.post(&self.url).json(&AnalysisRequest {
                article: &self.article,
            }),
            FetchMethod::Get => self
                .http_client
                .get(&self.url)
                .header(reqwest::header::CONTENT_TYPE, "application/json"),
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    seconds: self.timeout_seconds,
                }
            } else if e.is_connect() {
                FetchError::Connect {
                    url: self.url.clone(),
                }
            } else {
                FetchError::Request(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let document: Value = response.json().await.map_err(FetchError::Decode)?;
        debug!(
            "Received document with {} top-level keys",
            document.as_object().map(|o| o.len()).unwrap_or(0)
        );

        Ok(document)
    }
}
