//! IBM Cloudant backend.
//!
//! Talks to the CouchDB HTTP API: `_all_dbs` and `PUT /{db}` for bootstrap,
//! `POST /{db}` for inserts, `POST /{db}/_find` (Mango) for queries and
//! `GET /{db}` for metadata. Authenticates with an IAM API key, basic
//! credentials, or not at all (local CouchDB in admin party mode).

mod auth;
mod client;
mod config;

#[cfg(test)]
mod tests;

pub use client::CloudantClient;
pub use config::{CloudantAuth, CloudantConfig};
