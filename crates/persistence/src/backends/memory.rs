//! In-memory document store.
//!
//! Behaves like a single CouchDB node as far as the record store can tell:
//! documents are keyed by `_id`, inserts get a `1-<hex>` revision, duplicate
//! keys conflict, and queries evaluate the same Mango selector document that
//! is sent to Cloudant (field equality, `$eq`, `$regex` and top-level `$or`).
//!
//! The store can be switched unavailable to exercise failure paths.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::core::{BackendKind, DocumentStoreApi, InsertedDocument};
use crate::error::StoreError;
use crate::types::{CollectionInfo, Selector};

/// Call counters, for asserting how often the store was contacted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// `list_collections` calls.
    pub list_collections: u64,
    /// `create_collection` calls.
    pub create_collection: u64,
    /// `insert` calls.
    pub insert: u64,
    /// `query` calls.
    pub query: u64,
    /// `collection_metadata` calls.
    pub collection_metadata: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    collections: BTreeMap<String, BTreeMap<String, Value>>,
    unavailable: bool,
    stats: MemoryStats,
}

/// Thread-safe in-process document store. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryDocumentStore {
    /// Creates an empty store with no collections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with the given (empty) collections.
    pub fn with_collections(names: &[&str]) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.write();
            for name in names {
                state.collections.insert((*name).to_string(), BTreeMap::new());
            }
        }
        store
    }

    /// Makes every call fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unavailable = unavailable;
    }

    /// Returns a snapshot of the call counters.
    pub fn stats(&self) -> MemoryStats {
        self.state.read().stats
    }

    /// Returns true if the collection exists.
    pub fn has_collection(&self, name: &str) -> bool {
        self.state.read().collections.contains_key(name)
    }

    /// Returns the number of documents in a collection.
    pub fn document_count(&self, name: &str) -> usize {
        self.state
            .read()
            .collections
            .get(name)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    fn check_available(state: &MemoryState) -> Result<(), StoreError> {
        if state.unavailable {
            Err(StoreError::unavailable("memory store is unavailable"))
        } else {
            Ok(())
        }
    }
}

fn missing_collection() -> StoreError {
    StoreError::new(404, "Database does not exist.")
}

/// One compiled selector clause.
enum Condition {
    Equals(String, Value),
    Regex(String, Regex),
    /// At least one branch matches; each branch is a conjunction.
    Any(Vec<Vec<Condition>>),
}

impl Condition {
    fn matches(&self, document: &Value) -> bool {
        match self {
            Condition::Equals(field, expected) => document.get(field) == Some(expected),
            Condition::Regex(field, regex) => document
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|value| regex.is_match(value)),
            Condition::Any(branches) => branches
                .iter()
                .any(|branch| branch.iter().all(|c| c.matches(document))),
        }
    }
}

fn compile_selector(selector: &Value) -> Result<Vec<Condition>, StoreError> {
    let Some(fields) = selector.as_object() else {
        return Err(StoreError::new(400, "selector must be a JSON object"));
    };

    let mut conditions = Vec::new();
    for (field, condition) in fields {
        if field == "$or" {
            let branches = condition
                .as_array()
                .ok_or_else(|| StoreError::new(400, "$or argument must be an array"))?
                .iter()
                .map(compile_selector)
                .collect::<Result<Vec<_>, _>>()?;
            conditions.push(Condition::Any(branches));
            continue;
        }
        match condition {
            Value::Object(operators) => {
                for (operator, argument) in operators {
                    match operator.as_str() {
                        "$eq" => conditions.push(Condition::Equals(field.clone(), argument.clone())),
                        "$regex" => {
                            let pattern = argument.as_str().ok_or_else(|| {
                                StoreError::new(400, "$regex argument must be a string")
                            })?;
                            let regex = Regex::new(pattern).map_err(|e| {
                                StoreError::new(400, format!("invalid regular expression: {}", e))
                            })?;
                            conditions.push(Condition::Regex(field.clone(), regex));
                        }
                        other => {
                            return Err(StoreError::new(
                                400,
                                format!("unsupported selector operator: {}", other),
                            ));
                        }
                    }
                }
            }
            literal => conditions.push(Condition::Equals(field.clone(), literal.clone())),
        }
    }
    Ok(conditions)
}

#[async_trait]
impl DocumentStoreApi for MemoryDocumentStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let mut state = self.state.write();
        state.stats.list_collections += 1;
        Self::check_available(&state)?;
        Ok(state.collections.keys().cloned().collect())
    }

    async fn create_collection(&self, name: &str) -> Result<(), StoreError> {
        let mut state = self.state.write();
        state.stats.create_collection += 1;
        Self::check_available(&state)?;
        if state.collections.contains_key(name) {
            return Err(StoreError::new(
                412,
                "The database could not be created, the file already exists.",
            ));
        }
        state.collections.insert(name.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn insert(
        &self,
        collection: &str,
        mut document: Value,
    ) -> Result<InsertedDocument, StoreError> {
        let mut state = self.state.write();
        state.stats.insert += 1;
        Self::check_available(&state)?;

        let id = document
            .get("_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StoreError::new(400, "Document must have an _id"))?;
        let documents = state
            .collections
            .get_mut(collection)
            .ok_or_else(missing_collection)?;
        if documents.contains_key(&id) {
            return Err(StoreError::new(409, "Document update conflict."));
        }

        let revision = format!("1-{}", Uuid::new_v4().simple());
        if let Some(fields) = document.as_object_mut() {
            fields.insert("_rev".to_string(), Value::String(revision.clone()));
        }
        documents.insert(id.clone(), document);

        Ok(InsertedDocument { id, revision })
    }

    async fn query(&self, collection: &str, selector: &Selector) -> Result<Vec<Value>, StoreError> {
        let conditions = compile_selector(&selector.to_mango())?;

        let mut state = self.state.write();
        state.stats.query += 1;
        Self::check_available(&state)?;

        let documents = state
            .collections
            .get(collection)
            .ok_or_else(missing_collection)?;
        // `_find` never returns design documents.
        Ok(documents
            .iter()
            .filter(|(id, _)| !id.starts_with("_design/"))
            .map(|(_, document)| document)
            .filter(|document| conditions.iter().all(|c| c.matches(document)))
            .cloned()
            .collect())
    }

    async fn collection_metadata(&self, collection: &str) -> Result<CollectionInfo, StoreError> {
        let mut state = self.state.write();
        state.stats.collection_metadata += 1;
        Self::check_available(&state)?;

        let count = state
            .collections
            .get(collection)
            .ok_or_else(missing_collection)?
            .len() as u64;
        Ok(CollectionInfo {
            name: collection.to_string(),
            document_count: Some(count),
            raw: json!({ "db_name": collection, "doc_count": count }),
        })
    }
}
