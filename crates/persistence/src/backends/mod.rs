//! Document store backend implementations.
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | Cloudant | `cloudant` (default) | IBM Cloudant / Apache CouchDB over HTTP |
//! | Memory | always | In-process store for tests and local development |
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "cloudant")]
//! # fn example() -> Result<(), mobtrack_persistence::error::ConnectionError> {
//! use mobtrack_persistence::backends::cloudant::{CloudantAuth, CloudantClient, CloudantConfig};
//!
//! let client = CloudantClient::new(CloudantConfig {
//!     account: Some("my-account".to_string()),
//!     auth: Some(CloudantAuth::Iam { api_key: "secret".to_string() }),
//!     ..Default::default()
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod memory;

#[cfg(feature = "cloudant")]
pub mod cloudant;
