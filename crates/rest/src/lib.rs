//! # mobtrack-rest - HTTP API for the mobtrack server
//!
//! This crate exposes the resource record store and the assistant proxy over
//! HTTP. Mobile clients create and look up location records; operators probe
//! the health of the store and the assistant.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use mobtrack_persistence::backends::memory::MemoryDocumentStore;
//! use mobtrack_persistence::core::ConnectionManager;
//! use mobtrack_rest::assistant::UnconfiguredAssistant;
//! use mobtrack_rest::{ServerConfig, create_app_with_config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = Arc::new(ConnectionManager::new(
//!         Arc::new(MemoryDocumentStore::new()),
//!         "mobtrack_db",
//!     ));
//!     manager.connect().await?;
//!
//!     let config = ServerConfig::default();
//!     let app = create_app_with_config(manager, Arc::new(UnconfiguredAssistant), config);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Interaction | HTTP Method | URL Pattern |
//! |------------|-------------|-------------|
//! | health summary | GET | `/` |
//! | liveness | GET | `/_liveness` |
//! | readiness | GET | `/_readiness` |
//! | open assistant session | GET | `/api/session` |
//! | send assistant message | POST | `/api/message` |
//! | create record | POST | `/api/resource` |
//! | find records | GET | `/api/resource?name=&transactionType=` |
//!
//! ## Error Handling
//!
//! | HTTP Status | Cause |
//! |-------------|-------|
//! | 400 | Malformed JSON body |
//! | 422 | Missing `name`, `contact` or `sessionid` |
//! | 502 | Assistant unreachable |
//! | 503 | Store not ready or bootstrap failed |
//! | store status, else 500 | Store rejected the request |
//!
//! ## Architecture
//!
//! - [`error`] - Error types and HTTP mapping
//! - [`config`] - Server configuration
//! - [`state`] - Application state (store connection, assistant, health probe)
//! - [`assistant`] - Assistant client
//! - [`handlers`] - HTTP request handlers
//! - [`routing`] - Route configuration

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod assistant;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routing;
pub mod state;

// Re-export commonly used types
pub use config::{ServerConfig, StoreMode};
pub use error::{RestError, RestResult};
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use mobtrack_persistence::core::ConnectionManager;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::assistant::DynAssistant;

/// Creates the Axum application with default configuration.
///
/// For more control, use [`create_app_with_config`].
pub fn create_app(connection: Arc<ConnectionManager>, assistant: DynAssistant) -> Router {
    create_app_with_config(connection, assistant, ServerConfig::default())
}

/// Creates the Axum application with custom configuration.
///
/// The connection manager may still be bootstrapping; record routes answer
/// `503` until its handle is set.
///
/// # Arguments
///
/// * `connection` - The store connection manager
/// * `assistant` - The assistant client
/// * `config` - Server configuration
pub fn create_app_with_config(
    connection: Arc<ConnectionManager>,
    assistant: DynAssistant,
    config: ServerConfig,
) -> Router {
    info!(
        backend = %connection.backend_kind(),
        collection = %connection.collection(),
        "Creating HTTP API"
    );

    // Create application state
    let state = AppState::new(connection, assistant, config.clone());

    let router = routing::create_routes(state);

    // Build middleware stack
    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            std::time::Duration::from_secs(config.request_timeout),
        ));

    // Add CORS if enabled
    let router = if config.enable_cors {
        let cors = build_cors_layer(&config);
        router.layer(cors)
    } else {
        router
    };

    router.layer(service_builder)
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    if config.cors_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    if config.cors_methods == "*" {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Vec<_> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    if config.cors_headers == "*" {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<_> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors
}

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup. `RUST_LOG` overrides
/// `level` when set.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "mobtrack={level},mobtrack_rest={level},mobtrack_persistence={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
