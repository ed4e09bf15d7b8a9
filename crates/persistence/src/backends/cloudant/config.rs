use serde::{Deserialize, Serialize};

use crate::error::ConnectionError;

/// Authentication configuration for Cloudant.
#[derive(Clone, Serialize, Deserialize)]
pub enum CloudantAuth {
    /// IBM Cloud IAM: the API key is exchanged for a short-lived bearer token.
    Iam {
        /// The IAM API key.
        api_key: String,
    },
    /// Legacy Cloudant or CouchDB username/password authentication.
    Basic {
        /// The username for basic auth.
        username: String,
        /// The password for basic auth.
        password: String,
    },
}

impl std::fmt::Debug for CloudantAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudantAuth::Iam { .. } => f.debug_struct("Iam").finish_non_exhaustive(),
            CloudantAuth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

/// Configuration for the Cloudant backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudantConfig {
    /// Cloudant account name; the service URL becomes
    /// `https://{account}.cloudant.com`.
    #[serde(default)]
    pub account: Option<String>,

    /// Explicit service URL. Takes precedence over `account`.
    #[serde(default)]
    pub url: Option<String>,

    /// Optional authentication. Without it requests are sent anonymously.
    #[serde(default)]
    pub auth: Option<CloudantAuth>,

    /// IAM token endpoint (default: `https://iam.cloud.ibm.com/identity/token`).
    #[serde(default = "default_iam_token_url")]
    pub iam_token_url: String,

    /// Request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Connect timeout in milliseconds (default: 10000).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Documents requested per `_find` page (default: 200).
    #[serde(default = "default_find_page_size")]
    pub find_page_size: u32,
}

fn default_iam_token_url() -> String {
    "https://iam.cloud.ibm.com/identity/token".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30000
}

fn default_connect_timeout_ms() -> u64 {
    10000
}

fn default_find_page_size() -> u32 {
    200
}

impl Default for CloudantConfig {
    fn default() -> Self {
        Self {
            account: None,
            url: None,
            auth: None,
            iam_token_url: default_iam_token_url(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            find_page_size: default_find_page_size(),
        }
    }
}

impl CloudantConfig {
    /// Returns the service base URL without a trailing slash.
    pub fn base_url(&self) -> Option<String> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            return Some(url.trim_end_matches('/').to_string());
        }
        self.account
            .as_deref()
            .filter(|a| !a.is_empty())
            .map(|account| format!("https://{}.cloudant.com", account))
    }

    /// Validates configuration invariants.
    pub fn validate(&self) -> Result<(), ConnectionError> {
        let invalid = |message: String| ConnectionError::InvalidConfig {
            backend_name: "cloudant".to_string(),
            message,
        };

        let base_url = self
            .base_url()
            .ok_or_else(|| invalid("either an account or a service URL is required".to_string()))?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(invalid(format!(
                "service URL must use http or https: {}",
                base_url
            )));
        }

        match &self.auth {
            Some(CloudantAuth::Iam { api_key }) if api_key.is_empty() => {
                return Err(invalid("IAM API key is empty".to_string()));
            }
            Some(CloudantAuth::Basic { username, .. }) if username.is_empty() => {
                return Err(invalid("basic auth username is empty".to_string()));
            }
            _ => {}
        }

        if self.find_page_size == 0 {
            return Err(invalid("find_page_size must be greater than zero".to_string()));
        }

        Ok(())
    }
}
