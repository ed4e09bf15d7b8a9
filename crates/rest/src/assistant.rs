//! Conversational assistant proxy.
//!
//! The server forwards two calls to IBM Watson Assistant (v2 API): opening a
//! session and sending a text message within a session. Responses are passed
//! through untouched.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mobtrack_persistence::core::HealthCheck;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

/// Errors returned by the assistant service.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// No assistant credentials were configured.
    #[error("assistant not configured")]
    NotConfigured,

    /// The service could not be reached.
    #[error("assistant unreachable: {message}")]
    Unreachable {
        /// Transport error description.
        message: String,
    },

    /// The service answered with an error status.
    #[error("assistant rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status code from the service.
        status: u16,
        /// Error text from the service.
        message: String,
    },

    /// The client settings are unusable.
    #[error("invalid assistant configuration: {message}")]
    InvalidConfig {
        /// What is wrong with the settings.
        message: String,
    },

    /// The service answered with a body that could not be decoded.
    #[error("invalid assistant response: {message}")]
    InvalidResponse {
        /// Decode error description.
        message: String,
    },
}

/// The calls the server makes to the assistant service.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Opens a new conversation session and returns its id.
    async fn create_session(&self) -> Result<String, AssistantError>;

    /// Sends `text` within `session_id` and returns the raw service response.
    async fn message(&self, session_id: &str, text: &str) -> Result<Value, AssistantError>;
}

/// Shared assistant client.
pub type DynAssistant = Arc<dyn AssistantApi>;

/// Connection settings for Watson Assistant.
#[derive(Clone)]
pub struct WatsonAssistantConfig {
    /// Service URL, e.g. `https://api.us-south.assistant.watson.cloud.ibm.com`.
    pub url: String,
    /// Assistant identifier.
    pub assistant_id: String,
    /// IAM API key.
    pub api_key: String,
    /// API version date sent as the `version` query parameter.
    pub version: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for WatsonAssistantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatsonAssistantConfig")
            .field("url", &self.url)
            .field("assistant_id", &self.assistant_id)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session_id: String,
}

/// Watson Assistant v2 client.
#[derive(Debug)]
pub struct WatsonAssistant {
    http: reqwest::Client,
    base_url: Url,
    config: WatsonAssistantConfig,
}

impl WatsonAssistant {
    /// Creates a client. No request is sent.
    pub fn new(config: WatsonAssistantConfig) -> Result<Self, AssistantError> {
        let base_url = Url::parse(config.url.trim_end_matches('/')).map_err(|e| {
            AssistantError::InvalidConfig {
                message: format!("invalid assistant URL {}: {}", config.url, e),
            }
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AssistantError::InvalidConfig {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["v2", "assistants", self.config.assistant_id.as_str()])
                .extend(segments);
        }
        url.query_pairs_mut()
            .append_pair("version", &self.config.version);
        url
    }

    async fn post(&self, url: Url, body: Value) -> Result<Value, AssistantError> {
        let response = self
            .http
            .post(url)
            .basic_auth("apikey", Some(&self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Unreachable {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            return Err(AssistantError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| AssistantError::InvalidResponse {
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl AssistantApi for WatsonAssistant {
    async fn create_session(&self) -> Result<String, AssistantError> {
        let value = self.post(self.url(&["sessions"]), json!({})).await?;
        let session: SessionResponse =
            serde_json::from_value(value).map_err(|e| AssistantError::InvalidResponse {
                message: e.to_string(),
            })?;
        debug!(session_id = %session.session_id, "Assistant session created");
        Ok(session.session_id)
    }

    async fn message(&self, session_id: &str, text: &str) -> Result<Value, AssistantError> {
        let body = json!({ "input": { "message_type": "text", "text": text } });
        self.post(self.url(&["sessions", session_id, "message"]), body)
            .await
    }
}

/// Stand-in used when no assistant is configured. Every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredAssistant;

#[async_trait]
impl AssistantApi for UnconfiguredAssistant {
    async fn create_session(&self) -> Result<String, AssistantError> {
        Err(AssistantError::NotConfigured)
    }

    async fn message(&self, _session_id: &str, _text: &str) -> Result<Value, AssistantError> {
        Err(AssistantError::NotConfigured)
    }
}

/// Reports the assistant healthy when a session can be opened.
pub struct AssistantHealthCheck {
    assistant: DynAssistant,
}

impl AssistantHealthCheck {
    /// Creates a check over the given assistant client.
    pub fn new(assistant: DynAssistant) -> Self {
        Self { assistant }
    }
}

#[async_trait]
impl HealthCheck for AssistantHealthCheck {
    fn name(&self) -> &str {
        "assistant"
    }

    async fn check(&self) -> Result<(), String> {
        self.assistant
            .create_session()
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
