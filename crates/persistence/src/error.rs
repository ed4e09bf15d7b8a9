//! Error types for the persistence layer.
//!
//! Errors are split along the three ways an operation can fail:
//!
//! - [`ConnectionError`] - the store handle could not be established
//! - [`ValidationError`] - input was rejected before reaching the store
//! - [`StoreError`] - the backing store answered with a failure
//!
//! [`StorageError`] wraps the record store's two failure modes. Connection
//! failures surface from [`ConnectionManager`](crate::core::ConnectionManager).

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for record store operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Input rejected before any store interaction.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backing store rejected the request.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised while establishing the collection handle.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// The store refused the configured credentials.
    #[error("authentication failed for {backend_name}: {message}")]
    AuthenticationFailed {
        backend_name: String,
        message: String,
    },

    /// The store could not be reached at all.
    #[error("{backend_name} unreachable: {message}")]
    Unreachable {
        backend_name: String,
        message: String,
    },

    /// The target collection did not exist and could not be created.
    #[error("failed to create collection {collection}: {source}")]
    CollectionCreateFailed {
        collection: String,
        #[source]
        source: StoreError,
    },

    /// The store answered the bootstrap request with an unexpected failure.
    #[error("bootstrap of {backend_name} failed: {source}")]
    Bootstrap {
        backend_name: String,
        #[source]
        source: StoreError,
    },

    /// The backend configuration cannot produce a usable client.
    #[error("invalid {backend_name} configuration: {message}")]
    InvalidConfig {
        backend_name: String,
        message: String,
    },
}

impl ConnectionError {
    /// Classifies a store failure seen while listing collections.
    pub fn from_store(backend_name: &str, err: StoreError) -> Self {
        match err.status {
            Some(401) | Some(403) => ConnectionError::AuthenticationFailed {
                backend_name: backend_name.to_string(),
                message: err.message,
            },
            None => ConnectionError::Unreachable {
                backend_name: backend_name.to_string(),
                message: err.message,
            },
            Some(_) => ConnectionError::Bootstrap {
                backend_name: backend_name.to_string(),
                source: err,
            },
        }
    }
}

/// Errors related to caller input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was missing or empty.
    #[error("{message}")]
    MissingRequiredField { field: String, message: String },
}

impl ValidationError {
    /// Returns the name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::MissingRequiredField { field, .. } => field,
        }
    }
}

/// A failure reported by the backing store.
///
/// `status` carries the store's HTTP status code when the store answered;
/// it is `None` when the request never got an answer (unreachable, timeout).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("store error (status {}): {message}", .status.map_or_else(|| "none".to_string(), |s| s.to_string()))]
pub struct StoreError {
    pub status: Option<u16>,
    pub message: String,
}

impl StoreError {
    /// Creates an error carrying the store's status code.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates an error for a request that got no answer.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Returns true for "not found" answers.
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    /// Returns true for "already exists" / conflict answers.
    pub fn is_conflict(&self) -> bool {
        matches!(self.status, Some(409) | Some(412))
    }
}

/// Result type alias for record store operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::unavailable(format!("serialization error: {}", err))
    }
}
