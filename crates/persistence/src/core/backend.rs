//! Document store capability interface.
//!
//! This module defines the [`DocumentStoreApi`] trait, the narrow set of calls
//! the record store needs from a document database. Every call returns an
//! explicit result; "nothing matched" is an empty success, never an error.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::types::{CollectionInfo, Selector};

/// Identifies the type of document store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// IBM Cloudant or Apache CouchDB over HTTP.
    Cloudant,
    /// In-process store.
    Memory,
    /// Custom or unknown backend.
    Custom(&'static str),
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Cloudant => write!(f, "cloudant"),
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Identity assigned by the store to an inserted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedDocument {
    /// Document key.
    pub id: String,
    /// Revision token of the inserted version.
    pub revision: String,
}

/// The calls a document database must answer for the record store.
///
/// # Example
///
/// ```ignore
/// use mobtrack_persistence::core::DocumentStoreApi;
///
/// let names = api.list_collections().await?;
/// if !names.iter().any(|n| n == "mobtrack_db") {
///     api.create_collection("mobtrack_db").await?;
/// }
/// ```
#[async_trait]
pub trait DocumentStoreApi: Send + Sync + Debug {
    /// Returns the kind of backend.
    fn kind(&self) -> BackendKind;

    /// Lists the names of all collections.
    async fn list_collections(&self) -> Result<Vec<String>, StoreError>;

    /// Creates a collection.
    ///
    /// An "already exists" answer is reported as a conflict error; callers
    /// racing on creation treat it as success.
    async fn create_collection(&self, name: &str) -> Result<(), StoreError>;

    /// Inserts a new document. The document must carry its `_id`.
    async fn insert(&self, collection: &str, document: Value)
    -> Result<InsertedDocument, StoreError>;

    /// Returns every document matching the selector.
    async fn query(&self, collection: &str, selector: &Selector)
    -> Result<Vec<Value>, StoreError>;

    /// Fetches store-level metadata for a collection.
    async fn collection_metadata(&self, collection: &str) -> Result<CollectionInfo, StoreError>;
}

/// Shared, dynamically dispatched document store.
pub type DynDocumentStore = Arc<dyn DocumentStoreApi>;
