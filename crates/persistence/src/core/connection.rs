//! Connection management for the record collection.
//!
//! The [`ConnectionManager`] makes sure the target collection exists and hands
//! out a [`CollectionHandle`] scoped to it. The bootstrap runs at most once per
//! successful connection: concurrent callers wait for the attempt in flight and
//! all receive the same handle. A failed attempt leaves no handle behind, so a
//! later call starts a fresh one; the failure is kept for reporting until then.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::core::backend::{BackendKind, DocumentStoreApi, DynDocumentStore};
use crate::error::ConnectionError;

/// An established reference to the record collection.
#[derive(Debug, Clone)]
pub struct CollectionHandle {
    api: DynDocumentStore,
    collection: Arc<str>,
}

impl CollectionHandle {
    /// Returns the document store behind this handle.
    pub fn api(&self) -> &dyn DocumentStoreApi {
        self.api.as_ref()
    }

    /// Returns the collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the kind of backend.
    pub fn backend_kind(&self) -> BackendKind {
        self.api.kind()
    }
}

/// Bounded retry for the startup bootstrap.
///
/// The default performs a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of retries after the first failed attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub initial_backoff: Duration,
    /// Upper bound for a single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given retry count and initial backoff.
    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            ..Default::default()
        }
    }

    /// Returns the delay to wait after the given (zero-based) failed attempt.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Establishes and memoizes the collection handle.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use mobtrack_persistence::backends::memory::MemoryDocumentStore;
/// use mobtrack_persistence::core::ConnectionManager;
///
/// # tokio_test::block_on(async {
/// let manager = ConnectionManager::new(Arc::new(MemoryDocumentStore::new()), "mobtrack_db");
/// assert!(manager.handle().is_none());
///
/// manager.connect().await.unwrap();
/// assert_eq!(manager.handle().unwrap().collection(), "mobtrack_db");
/// # });
/// ```
#[derive(Debug)]
pub struct ConnectionManager {
    api: DynDocumentStore,
    collection: String,
    handle: OnceCell<CollectionHandle>,
    last_error: RwLock<Option<ConnectionError>>,
}

impl ConnectionManager {
    /// Creates a manager for the given store and collection. Nothing is contacted yet.
    pub fn new(api: DynDocumentStore, collection: impl Into<String>) -> Self {
        Self {
            api,
            collection: collection.into(),
            handle: OnceCell::new(),
            last_error: RwLock::new(None),
        }
    }

    /// Returns the target collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the kind of backend.
    pub fn backend_kind(&self) -> BackendKind {
        self.api.kind()
    }

    /// Returns the handle if a connection has been established.
    pub fn handle(&self) -> Option<CollectionHandle> {
        self.handle.get().cloned()
    }

    /// Returns true once a connection has been established.
    pub fn is_ready(&self) -> bool {
        self.handle.initialized()
    }

    /// Returns the failure of the most recent bootstrap attempt.
    ///
    /// Cleared once a connection is established.
    pub fn last_error(&self) -> Option<ConnectionError> {
        self.last_error.read().clone()
    }

    /// Connects to the store, creating the collection if it is absent.
    ///
    /// Returns the memoized handle when already connected.
    pub async fn connect(&self) -> Result<CollectionHandle, ConnectionError> {
        let result = self
            .handle
            .get_or_try_init(|| self.bootstrap())
            .await
            .cloned();
        *self.last_error.write() = result.as_ref().err().cloned();
        result
    }

    /// Connects, retrying failed attempts according to `policy`.
    ///
    /// Authentication failures are not retried.
    pub async fn connect_with_retry(
        &self,
        policy: &RetryPolicy,
    ) -> Result<CollectionHandle, ConnectionError> {
        let mut attempt = 0;
        loop {
            match self.connect().await {
                Ok(handle) => return Ok(handle),
                Err(err)
                    if attempt < policy.max_retries
                        && !matches!(err, ConnectionError::AuthenticationFailed { .. }) =>
                {
                    let delay = policy.backoff_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Store bootstrap failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn bootstrap(&self) -> Result<CollectionHandle, ConnectionError> {
        let backend = self.api.kind().to_string();
        info!(backend = %backend, collection = %self.collection, "Connecting to document store");

        let collections = self.api.list_collections().await.map_err(|e| {
            let err = ConnectionError::from_store(&backend, e);
            error!(backend = %backend, error = %err, "Connect failure");
            err
        })?;

        if !collections.iter().any(|name| name == &self.collection) {
            info!(collection = %self.collection, "Collection does not exist, creating");
            match self.api.create_collection(&self.collection).await {
                Ok(()) => {}
                Err(e) if e.is_conflict() => {
                    debug!(collection = %self.collection, "Collection created concurrently");
                }
                Err(e) => {
                    error!(collection = %self.collection, error = %e, "Collection create failure");
                    return Err(ConnectionError::CollectionCreateFailed {
                        collection: self.collection.clone(),
                        source: e,
                    });
                }
            }
        }

        info!(backend = %backend, collection = %self.collection, "Connect success");
        Ok(CollectionHandle {
            api: Arc::clone(&self.api),
            collection: Arc::from(self.collection.as_str()),
        })
    }
}
