//! IBM Cloud IAM token exchange.
//!
//! The API key is traded for a bearer token at the IAM endpoint. Tokens are
//! cached and reused until they are within [`REFRESH_MARGIN`] of expiry.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;

/// Tokens are refreshed this long before they expire.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);

const GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    /// An unrepresentable lifetime expires immediately, forcing a refresh on next use.
    fn new(value: String, now: Instant, expires_in: u64) -> Self {
        Self {
            value,
            expires_at: now
                .checked_add(Duration::from_secs(expires_in))
                .unwrap_or(now),
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now.checked_add(REFRESH_MARGIN)
            .is_some_and(|deadline| deadline < self.expires_at)
    }
}

/// Exchanges an API key for bearer tokens, caching between calls.
pub(crate) struct IamTokenProvider {
    api_key: String,
    token_url: String,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for IamTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IamTokenProvider")
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

impl IamTokenProvider {
    pub(crate) fn new(api_key: impl Into<String>, token_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            token_url: token_url.into(),
            cached: Mutex::new(None),
        }
    }

    /// Returns a valid bearer token, fetching a new one when needed.
    ///
    /// Concurrent callers wait on the same exchange.
    pub(crate) async fn token(&self, http: &reqwest::Client) -> Result<String, StoreError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.value.clone());
        }

        let fresh = self.exchange(http).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    /// Drops the cached token so the next call performs a new exchange.
    pub(crate) async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn exchange(&self, http: &reqwest::Client) -> Result<CachedToken, StoreError> {
        debug!(token_url = %self.token_url, "Requesting IAM token");

        let response = http
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("grant_type", GRANT_TYPE), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::unavailable(format!("IAM token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // IAM answers a bad key with 400; report every rejection as an auth failure.
            let status = if status.is_client_error() {
                401
            } else {
                status.as_u16()
            };
            return Err(StoreError::new(
                status,
                format!("IAM token request rejected: {}", body.trim()),
            ));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| StoreError::new(502, format!("malformed IAM token response: {}", e)))?;

        Ok(CachedToken::new(
            token.access_token,
            Instant::now(),
            token.expires_in,
        ))
    }
}
