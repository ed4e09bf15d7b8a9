//! Core types for resource records and queries.
//!
//! - [`ResourceRecord`] - the persisted domain entity
//! - [`StoredRecord`] - a record read back together with its revision token
//! - [`NewResource`] - caller input for creating a record
//! - [`CreatedResource`] - identity of a freshly inserted record
//! - [`FindFilter`] / [`Selector`] - query filters and the store-level selector

mod filter;
mod record;

pub use filter::{FindFilter, Selector};
pub use record::{CollectionInfo, CreatedResource, NewResource, ResourceRecord, StoredRecord};
