//! Mobtrack Persistence Layer
//!
//! This crate owns the resource record model and everything needed to store and
//! query it in a document database. The production backend speaks the
//! Cloudant / CouchDB HTTP API; an in-memory backend with the same semantics is
//! provided for tests and local development.
//!
//! # Architecture
//!
//! - [`types`] - Resource records, creation input, find filters and selectors
//! - [`identity`] - Record identifier generation
//! - [`error`] - Error taxonomy (connection, validation, store)
//! - [`core`] - Document store capability trait, connection manager, record store, health probe
//! - [`backends`] - Backend implementations (Cloudant, in-memory)
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use mobtrack_persistence::backends::memory::MemoryDocumentStore;
//! use mobtrack_persistence::core::{ConnectionManager, ResourceStore};
//! use mobtrack_persistence::types::{FindFilter, NewResource};
//!
//! # tokio_test::block_on(async {
//! let manager = ConnectionManager::new(Arc::new(MemoryDocumentStore::new()), "mobtrack_db");
//! let handle = manager.connect().await.unwrap();
//! let store = ResourceStore::new(handle);
//!
//! let created = store
//!     .create(NewResource::new("Jo", "555-1234").with_transaction_type("checkin"))
//!     .await
//!     .unwrap();
//!
//! let found = store
//!     .find(&FindFilter::new().with_transaction_type("checkin"))
//!     .await
//!     .unwrap();
//! assert!(found.iter().any(|r| r.id() == created.created_id));
//! # });
//! ```
//!
//! # Connection Lifecycle
//!
//! A [`ConnectionManager`](core::ConnectionManager) bootstraps the collection at
//! most once and memoizes the resulting handle. Callers that need to know
//! whether the store is usable without waiting use
//! [`ConnectionManager::handle`](core::ConnectionManager::handle).

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod error;
pub mod identity;
pub mod types;
