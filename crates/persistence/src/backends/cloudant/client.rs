use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url, header};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::core::{BackendKind, DocumentStoreApi, InsertedDocument};
use crate::error::{ConnectionError, StoreError};
use crate::types::{CollectionInfo, Selector};

use super::auth::IamTokenProvider;
use super::config::{CloudantAuth, CloudantConfig};

#[derive(Debug)]
enum Credentials {
    Iam(IamTokenProvider),
    Basic { username: String, password: String },
}

/// Cloudant (CouchDB) document store over HTTP.
///
/// One client holds one connection pool; clone the surrounding `Arc` rather
/// than building a second client.
#[derive(Debug)]
pub struct CloudantClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<Credentials>,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
struct InsertResponse {
    id: String,
    rev: String,
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    docs: Vec<Value>,
    #[serde(default)]
    bookmark: Option<String>,
    #[serde(default)]
    warning: Option<String>,
}

/// One page of `_find` results.
#[derive(Debug, Default)]
pub(crate) struct FindPage {
    pub(crate) docs: Vec<Value>,
    pub(crate) bookmark: Option<String>,
}

impl CloudantClient {
    /// Creates a client from configuration. No request is sent.
    pub fn new(config: CloudantConfig) -> Result<Self, ConnectionError> {
        config.validate()?;

        let invalid = |message: String| ConnectionError::InvalidConfig {
            backend_name: "cloudant".to_string(),
            message,
        };

        let base = config
            .base_url()
            .ok_or_else(|| invalid("missing service URL".to_string()))?;
        let base_url =
            Url::parse(&base).map_err(|e| invalid(format!("invalid service URL {}: {}", base, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid(format!("service URL cannot be a base: {}", base)));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|e| invalid(format!("failed to build HTTP client: {}", e)))?;

        let credentials = config.auth.map(|auth| match auth {
            CloudantAuth::Iam { api_key } => {
                Credentials::Iam(IamTokenProvider::new(api_key, config.iam_token_url.clone()))
            }
            CloudantAuth::Basic { username, password } => Credentials::Basic { username, password },
        });

        Ok(Self {
            http,
            base_url,
            credentials,
            page_size: config.find_page_size,
        })
    }

    /// Returns the service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Url {
        endpoint(&self.base_url, segments)
    }

    async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, StoreError> {
        Ok(match &self.credentials {
            Some(Credentials::Iam(provider)) => request.bearer_auth(provider.token(&self.http).await?),
            Some(Credentials::Basic { username, password }) => {
                request.basic_auth(username, Some(password))
            }
            None => request,
        })
    }

    /// Sends a request and returns the decoded JSON body.
    ///
    /// A 401 under IAM auth drops the cached token and retries once.
    async fn send(&self, method: Method, url: Url, body: Option<&Value>) -> Result<Value, StoreError> {
        let mut token_refreshed = false;
        loop {
            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .header(header::ACCEPT, "application/json");
            request = self.authorize(request).await?;
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(transport_error)?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && !token_refreshed {
                if let Some(Credentials::Iam(provider)) = &self.credentials {
                    debug!("Cloudant rejected bearer token, refreshing");
                    provider.invalidate().await;
                    token_refreshed = true;
                    continue;
                }
            }

            let text = response.text().await.map_err(transport_error)?;
            if !status.is_success() {
                return Err(error_from_body(status.as_u16(), &text));
            }
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text).map_err(|e| {
                StoreError::new(status.as_u16(), format!("malformed response body: {}", e))
            });
        }
    }

    async fn find_page(
        &self,
        collection: &str,
        selector: &Value,
        bookmark: Option<String>,
    ) -> Result<FindPage, StoreError> {
        let mut body = json!({ "selector": selector, "limit": self.page_size });
        if let Some(bookmark) = bookmark {
            body["bookmark"] = Value::String(bookmark);
        }

        let value = self
            .send(Method::POST, self.url(&[collection, "_find"]), Some(&body))
            .await?;
        let response: FindResponse = serde_json::from_value(value)?;
        if let Some(warning) = &response.warning {
            debug!(collection = %collection, warning = %warning, "Cloudant query warning");
        }

        Ok(FindPage {
            docs: response.docs,
            bookmark: response.bookmark,
        })
    }
}

/// Appends percent-encoded path segments to the base URL.
fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

fn transport_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::unavailable(format!("request timed out: {}", err))
    } else {
        StoreError::unavailable(format!("request failed: {}", err))
    }
}

/// Builds a store error from a non-success response.
///
/// CouchDB error bodies look like `{"error": "not_found", "reason": "missing"}`.
fn error_from_body(status: u16, body: &str) -> StoreError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let message = match (field("error"), field("reason")) {
        (Some(error), Some(reason)) => format!("{}: {}", error, reason),
        (Some(message), None) | (None, Some(message)) => message,
        (None, None) if body.trim().is_empty() => StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("unknown error")
            .to_string(),
        (None, None) => body.trim().to_string(),
    };
    StoreError::new(status, message)
}

/// Follows `_find` bookmarks until a short page.
///
/// Cloudant caps each `_find` response, so a single request silently
/// truncates large result sets.
pub(crate) async fn collect_pages<F, Fut>(
    page_size: u32,
    mut fetch: F,
) -> Result<Vec<Value>, StoreError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<FindPage, StoreError>>,
{
    let mut documents = Vec::new();
    let mut bookmark: Option<String> = None;

    loop {
        let page = fetch(bookmark.clone()).await?;
        let count = page.docs.len();
        documents.extend(page.docs);

        if count < page_size as usize {
            break;
        }
        match page.bookmark {
            Some(next) if next != "nil" && bookmark.as_deref() != Some(next.as_str()) => {
                bookmark = Some(next);
            }
            _ => break,
        }
    }

    Ok(documents)
}

#[async_trait]
impl DocumentStoreApi for CloudantClient {
    fn kind(&self) -> BackendKind {
        BackendKind::Cloudant
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let value = self.send(Method::GET, self.url(&["_all_dbs"]), None).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn create_collection(&self, name: &str) -> Result<(), StoreError> {
        self.send(Method::PUT, self.url(&[name]), None).await?;
        Ok(())
    }

    async fn insert(&self, collection: &str, document: Value) -> Result<InsertedDocument, StoreError> {
        let value = self
            .send(Method::POST, self.url(&[collection]), Some(&document))
            .await?;
        let inserted: InsertResponse = serde_json::from_value(value)?;
        Ok(InsertedDocument {
            id: inserted.id,
            revision: inserted.rev,
        })
    }

    async fn query(&self, collection: &str, selector: &Selector) -> Result<Vec<Value>, StoreError> {
        let mango = selector.to_mango();
        let documents = collect_pages(self.page_size, |bookmark| {
            self.find_page(collection, &mango, bookmark)
        })
        .await?;

        if documents.len() > self.page_size as usize {
            debug!(collection = %collection, count = documents.len(), "Query spanned several pages");
        }
        Ok(documents)
    }

    async fn collection_metadata(&self, collection: &str) -> Result<CollectionInfo, StoreError> {
        let raw = self.send(Method::GET, self.url(&[collection]), None).await?;
        let document_count = raw.get("doc_count").and_then(Value::as_u64);
        if document_count.is_none() {
            warn!(collection = %collection, "Database info has no doc_count");
        }
        Ok(CollectionInfo {
            name: collection.to_string(),
            document_count,
            raw,
        })
    }
}
