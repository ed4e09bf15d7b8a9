//! HTTP request handlers.
//!
//! - [`resource`] - Create and find resource records
//! - [`assistant`] - Assistant session and message pass-through
//! - [`health`] - Health summary, liveness and readiness probes

pub mod assistant;
pub mod health;
pub mod resource;

// Re-export handlers for convenience
pub use assistant::{message_handler, session_handler};
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use resource::{create_resource_handler, find_resources_handler};
