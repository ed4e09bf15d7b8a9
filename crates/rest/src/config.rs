//! Server configuration for the mobtrack HTTP API.
//!
//! This module provides configuration types for the server, supporting both
//! programmatic configuration and environment variable overrides.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PORT` | 3000 | Server port |
//! | `MOBTRACK_HOST` | 0.0.0.0 | Host to bind |
//! | `MOBTRACK_LOG_LEVEL` | info | Log level |
//! | `MOBTRACK_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `MOBTRACK_ENABLE_CORS` | true | Enable CORS |
//! | `MOBTRACK_CORS_ORIGINS` | * | Allowed origins |
//! | `MOBTRACK_STORE` | cloudant | Record store backend (`cloudant` or `memory`) |
//! | `CLOUDANT_ID` | - | Cloudant account name |
//! | `CLOUDANT_URL` | - | Explicit Cloudant/CouchDB URL (overrides the account) |
//! | `CLOUDANT_IAM_APIKEY` | - | IAM API key |
//! | `CLOUDANT_USERNAME` / `CLOUDANT_PASSWORD` | - | Basic credentials |
//! | `CLOUDANT_DB` | mobtrack_db | Database holding the records |
//! | `MOBTRACK_FIND_PAGE_SIZE` | 200 | Documents per `_find` page |
//! | `MOBTRACK_CONNECT_RETRIES` | 0 | Extra bootstrap attempts |
//! | `MOBTRACK_CONNECT_BACKOFF_MS` | 500 | First retry delay, doubled per attempt |
//! | `ASSISTANT_URL` | - | Watson Assistant service URL |
//! | `ASSISTANT_ID` | - | Assistant identifier |
//! | `ASSISTANT_IAM_APIKEY` | - | Assistant API key |
//! | `ASSISTANT_VERSION` | 2019-02-28 | Assistant API version date |
//!
//! # Example
//!
//! ```rust
//! use mobtrack_rest::ServerConfig;
//!
//! // Create from environment
//! let config = ServerConfig::from_env();
//!
//! // Or create programmatically
//! let config = ServerConfig {
//!     port: 8080,
//!     host: "127.0.0.1".to_string(),
//!     ..Default::default()
//! };
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use mobtrack_persistence::core::RetryPolicy;

use crate::assistant::WatsonAssistantConfig;

/// Which document store holds the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StoreMode {
    /// IBM Cloudant (or any CouchDB-compatible server).
    #[default]
    Cloudant,
    /// In-process store; data is lost on exit.
    Memory,
}

impl fmt::Display for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreMode::Cloudant => write!(f, "cloudant"),
            StoreMode::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for StoreMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cloudant" => Ok(StoreMode::Cloudant),
            "memory" => Ok(StoreMode::Memory),
            other => Err(format!(
                "unknown store '{}', expected 'cloudant' or 'memory'",
                other
            )),
        }
    }
}

/// Server configuration for the mobtrack HTTP API.
///
/// This struct can be constructed from environment variables using [`ServerConfig::from_env`],
/// from command line arguments using [`ServerConfig::parse`], or programmatically.
#[derive(Debug, Clone, Parser)]
#[command(name = "mobtrack")]
#[command(about = "Resource location-tracking server")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "MOBTRACK_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "MOBTRACK_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Request timeout in seconds.
    #[arg(long, env = "MOBTRACK_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Enable CORS.
    #[arg(long, env = "MOBTRACK_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "MOBTRACK_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Allowed CORS methods (comma-separated, or * for all).
    #[arg(long, env = "MOBTRACK_CORS_METHODS", default_value = "GET,POST,OPTIONS")]
    pub cors_methods: String,

    /// Allowed CORS headers (comma-separated, or * for all).
    #[arg(
        long,
        env = "MOBTRACK_CORS_HEADERS",
        default_value = "Content-Type,Authorization,Accept"
    )]
    pub cors_headers: String,

    /// Record store backend.
    #[arg(long, env = "MOBTRACK_STORE", value_enum, default_value_t = StoreMode::Cloudant)]
    pub store: StoreMode,

    /// Cloudant account name.
    #[arg(long, env = "CLOUDANT_ID")]
    pub cloudant_account: Option<String>,

    /// Explicit Cloudant/CouchDB service URL (overrides the account).
    #[arg(long, env = "CLOUDANT_URL")]
    pub cloudant_url: Option<String>,

    /// Cloudant IAM API key.
    #[arg(long, env = "CLOUDANT_IAM_APIKEY", hide_env_values = true)]
    pub cloudant_api_key: Option<String>,

    /// Cloudant basic-auth username.
    #[arg(long, env = "CLOUDANT_USERNAME")]
    pub cloudant_username: Option<String>,

    /// Cloudant basic-auth password.
    #[arg(long, env = "CLOUDANT_PASSWORD", hide_env_values = true)]
    pub cloudant_password: Option<String>,

    /// Database holding the resource records.
    #[arg(long, env = "CLOUDANT_DB", default_value = "mobtrack_db")]
    pub cloudant_db: String,

    /// Documents requested per `_find` page.
    #[arg(long, env = "MOBTRACK_FIND_PAGE_SIZE", default_value = "200")]
    pub find_page_size: u32,

    /// Extra bootstrap attempts after the first failure (0 = never retry).
    #[arg(long, env = "MOBTRACK_CONNECT_RETRIES", default_value = "0")]
    pub connect_retries: u32,

    /// Delay before the first bootstrap retry in milliseconds, doubled per attempt.
    #[arg(long, env = "MOBTRACK_CONNECT_BACKOFF_MS", default_value = "500")]
    pub connect_backoff_ms: u64,

    /// Watson Assistant service URL.
    #[arg(long, env = "ASSISTANT_URL")]
    pub assistant_url: Option<String>,

    /// Watson Assistant identifier.
    #[arg(long, env = "ASSISTANT_ID")]
    pub assistant_id: Option<String>,

    /// Watson Assistant API key.
    #[arg(long, env = "ASSISTANT_IAM_APIKEY", hide_env_values = true)]
    pub assistant_api_key: Option<String>,

    /// Watson Assistant API version date.
    #[arg(long, env = "ASSISTANT_VERSION", default_value = "2019-02-28")]
    pub assistant_version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            log_level: "info".to_string(),
            request_timeout: 30,
            enable_cors: true,
            cors_origins: "*".to_string(),
            cors_methods: "GET,POST,OPTIONS".to_string(),
            cors_headers: "Content-Type,Authorization,Accept".to_string(),
            store: StoreMode::Cloudant,
            cloudant_account: None,
            cloudant_url: None,
            cloudant_api_key: None,
            cloudant_username: None,
            cloudant_password: None,
            cloudant_db: "mobtrack_db".to_string(),
            find_page_size: 200,
            connect_retries: 0,
            connect_backoff_ms: 500,
            assistant_url: None,
            assistant_id: None,
            assistant_api_key: None,
            assistant_version: "2019-02-28".to_string(),
        }
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl ServerConfig {
    /// Creates a new ServerConfig from environment variables.
    ///
    /// This is a convenience method that parses environment variables without
    /// requiring command line arguments.
    pub fn from_env() -> Self {
        Self::try_parse_from(["mobtrack"]).unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the bootstrap retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.connect_retries,
            Duration::from_millis(self.connect_backoff_ms),
        )
    }

    /// Returns true when every assistant setting is present.
    pub fn assistant_configured(&self) -> bool {
        is_set(&self.assistant_url) && is_set(&self.assistant_id) && is_set(&self.assistant_api_key)
    }

    /// Builds the Watson Assistant client configuration, if fully configured.
    pub fn assistant_config(&self) -> Option<WatsonAssistantConfig> {
        if !self.assistant_configured() {
            return None;
        }
        Some(WatsonAssistantConfig {
            url: self.assistant_url.clone()?,
            assistant_id: self.assistant_id.clone()?,
            api_key: self.assistant_api_key.clone()?,
            version: self.assistant_version.clone(),
            timeout: Duration::from_secs(self.request_timeout),
        })
    }

    /// Builds the Cloudant client configuration.
    #[cfg(feature = "cloudant")]
    pub fn cloudant_config(&self) -> mobtrack_persistence::backends::cloudant::CloudantConfig {
        use mobtrack_persistence::backends::cloudant::{CloudantAuth, CloudantConfig};

        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

        let auth = match (
            non_empty(&self.cloudant_api_key),
            non_empty(&self.cloudant_username),
        ) {
            (Some(api_key), _) => Some(CloudantAuth::Iam { api_key }),
            (None, Some(username)) => Some(CloudantAuth::Basic {
                username,
                password: self.cloudant_password.clone().unwrap_or_default(),
            }),
            (None, None) => None,
        };

        CloudantConfig {
            account: non_empty(&self.cloudant_account),
            url: non_empty(&self.cloudant_url),
            auth,
            request_timeout_ms: self.request_timeout.saturating_mul(1000),
            find_page_size: self.find_page_size,
            ..Default::default()
        }
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.find_page_size == 0 {
            errors.push("Find page size cannot be 0".to_string());
        }

        if self.cloudant_db.is_empty() {
            errors.push("Cloudant database name cannot be empty".to_string());
        }

        if self.store == StoreMode::Cloudant {
            if !is_set(&self.cloudant_account) && !is_set(&self.cloudant_url) {
                errors.push(
                    "Cloudant store requires CLOUDANT_ID or CLOUDANT_URL to be set".to_string(),
                );
            }
            if is_set(&self.cloudant_api_key) && is_set(&self.cloudant_username) {
                errors.push(
                    "Configure either CLOUDANT_IAM_APIKEY or CLOUDANT_USERNAME, not both"
                        .to_string(),
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// This uses ephemeral port 0, the in-memory store and no assistant.
    pub fn for_testing() -> Self {
        Self {
            port: 0,
            host: "127.0.0.1".to_string(),
            log_level: "debug".to_string(),
            request_timeout: 5,
            enable_cors: false,
            cors_origins: "*".to_string(),
            cors_methods: "*".to_string(),
            cors_headers: "*".to_string(),
            store: StoreMode::Memory,
            cloudant_db: "mobtrack_test".to_string(),
            ..Default::default()
        }
    }
}
