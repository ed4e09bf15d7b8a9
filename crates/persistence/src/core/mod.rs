//! Core storage abstractions.
//!
//! - [`DocumentStoreApi`] - capability interface over a document database
//! - [`ConnectionManager`] - one-time collection bootstrap and handle memoization
//! - [`ResourceStore`] - typed create / find / info over resource records
//! - [`HealthProbe`] - dependency reachability summary
//!
//! ```text
//! DocumentStoreApi ──► ConnectionManager ──► CollectionHandle ──► ResourceStore
//!                                   │
//!                                   └──► StoreHealthCheck ──► HealthProbe
//! ```

mod backend;
mod connection;
mod health;
mod store;

pub use backend::{BackendKind, DocumentStoreApi, DynDocumentStore, InsertedDocument};
pub use connection::{CollectionHandle, ConnectionManager, RetryPolicy};
pub use health::{HealthCheck, HealthProbe, HealthReport, ProbeStatus, StoreHealthCheck};
pub use store::ResourceStore;
