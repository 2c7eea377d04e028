//! HTTP inference client.
//!
//! Posts `{ "source": ..., "text": ... }` to a configured endpoint and reads
//! the JSON response leniently through [`SuggestionBundle::from_value`].

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;

use crate::capture::model::SourceType;
use crate::error::CollaboratorError;
use crate::inference::{InferenceService, SuggestionBundle};
use crate::pipeline::extract;

const SERVICE_NAME: &str = "http-inference";

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for [`HttpInferenceService`].
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub endpoint: String,
    pub api_key: Option<SecretString>,
    pub timeout: Duration,
}

impl InferenceConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Inference service reached over HTTP.
pub struct HttpInferenceService {
    config: InferenceConfig,
    client: reqwest::Client,
}

impl HttpInferenceService {
    pub fn new(config: InferenceConfig) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CollaboratorError::unavailable(SERVICE_NAME, e.to_string()))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl InferenceService for HttpInferenceService {
    fn name(&self) -> &str {
        SERVICE_NAME
    }

    async fn suggest(&self, source: SourceType, text: &str) -> Result<SuggestionBundle, CollaboratorError> {
        let body = serde_json::json!({
            "source": source.as_str(),
            "text": text,
        });

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| CollaboratorError::unavailable(SERVICE_NAME, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::unavailable(
                SERVICE_NAME,
                format!("HTTP {status}: {}", extract::preview(&detail, 200)),
            ));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| CollaboratorError::unavailable(SERVICE_NAME, format!("invalid JSON: {e}")))?;

        let fallback = extract::first_line(text).unwrap_or_default();
        let parsed = SuggestionBundle::from_value(&payload, fallback);
        debug!(
            source = %source,
            issues = parsed.issues.len(),
            "Received inference suggestion"
        );
        Ok(parsed.into_bundle_logged(SERVICE_NAME))
    }
}
