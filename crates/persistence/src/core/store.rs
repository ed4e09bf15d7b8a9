//! Typed record operations over an established collection handle.

use tracing::{debug, error};

use crate::core::connection::CollectionHandle;
use crate::error::{StorageResult, StoreError};
use crate::identity::generate_id;
use crate::types::{
    CollectionInfo, CreatedResource, FindFilter, NewResource, Selector, StoredRecord,
};

/// Create and query resource records.
///
/// The store holds nothing but the collection handle; every call is an
/// independent round trip to the backing store. There is no update or delete.
#[derive(Debug, Clone)]
pub struct ResourceStore {
    handle: CollectionHandle,
}

impl ResourceStore {
    /// Creates a record store over the given handle.
    pub fn new(handle: CollectionHandle) -> Self {
        Self { handle }
    }

    /// Returns the underlying handle.
    pub fn handle(&self) -> &CollectionHandle {
        &self.handle
    }

    /// Validates the input, assigns identity and creation time, and inserts the record.
    ///
    /// Validation failures never reach the store.
    pub async fn create(&self, resource: NewResource) -> StorageResult<CreatedResource> {
        resource.validate()?;

        let id = generate_id();
        let created_at = chrono::Utc::now().timestamp_millis();
        let record = resource.into_record(id, created_at);
        let document = record.to_document().map_err(StoreError::from)?;

        let inserted = self
            .handle
            .api()
            .insert(self.handle.collection(), document)
            .await
            .map_err(|e| {
                error!(id = %record.id, error = %e, "Insert failed");
                e
            })?;

        debug!(id = %inserted.id, revision = %inserted.revision, "Resource created");

        Ok(CreatedResource {
            created_id: inserted.id,
            created_revision: inserted.revision,
        })
    }

    /// Finds all records matching the filter.
    ///
    /// No match is an empty result. Order is whatever the store returns.
    pub async fn find(&self, filter: &FindFilter) -> StorageResult<Vec<StoredRecord>> {
        let selector = Selector::from(filter);

        let documents = self
            .handle
            .api()
            .query(self.handle.collection(), &selector)
            .await
            .map_err(|e| {
                error!(selector = ?selector, error = %e, "Query failed");
                e
            })?;

        let records = documents
            .into_iter()
            .map(StoredRecord::from_document)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                error!(error = %e, "Query returned a document that is not a JSON object");
                StoreError::from(e)
            })?;

        debug!(selector = ?selector, count = records.len(), "Find completed");
        Ok(records)
    }

    /// Fetches collection metadata; used as a liveness signal.
    pub async fn info(&self) -> StorageResult<CollectionInfo> {
        let info = self
            .handle
            .api()
            .collection_metadata(self.handle.collection())
            .await
            .map_err(|e| {
                error!(collection = %self.handle.collection(), error = %e, "Metadata fetch failed");
                e
            })?;
        Ok(info)
    }
}
