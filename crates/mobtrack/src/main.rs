//! Mobtrack server
//!
//! Records where mobile associates are and how to reach them, and proxies
//! chat messages to a Watson Assistant.

use std::sync::Arc;

use clap::Parser;
use mobtrack_persistence::backends::memory::MemoryDocumentStore;
use mobtrack_persistence::core::{ConnectionManager, DynDocumentStore};
use mobtrack_rest::assistant::{DynAssistant, UnconfiguredAssistant, WatsonAssistant};
use mobtrack_rest::{ServerConfig, StoreMode, create_app_with_config, init_logging};
use tracing::{error, info, warn};

/// Creates the document store selected by the configuration.
fn create_store(config: &ServerConfig) -> anyhow::Result<DynDocumentStore> {
    match config.store {
        StoreMode::Cloudant => create_cloudant_store(config),
        StoreMode::Memory => {
            warn!("Using the in-memory store; records are lost on restart");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
    }
}

#[cfg(feature = "cloudant")]
fn create_cloudant_store(config: &ServerConfig) -> anyhow::Result<DynDocumentStore> {
    use mobtrack_persistence::backends::cloudant::CloudantClient;

    let client = CloudantClient::new(config.cloudant_config())?;
    info!(url = %client.base_url(), "Initializing Cloudant backend");
    Ok(Arc::new(client))
}

/// Fallback when cloudant feature is not enabled.
#[cfg(not(feature = "cloudant"))]
fn create_cloudant_store(_config: &ServerConfig) -> anyhow::Result<DynDocumentStore> {
    anyhow::bail!(
        "The cloudant backend requires the 'cloudant' feature. \
         Build with: cargo build -p mobtrack --features cloudant"
    )
}

/// Creates the assistant client, or a placeholder that rejects every call.
fn create_assistant(config: &ServerConfig) -> anyhow::Result<DynAssistant> {
    match config.assistant_config() {
        Some(assistant_config) => {
            info!(url = %assistant_config.url, "Initializing Watson Assistant client");
            Ok(Arc::new(WatsonAssistant::new(assistant_config)?))
        }
        None => {
            warn!("Assistant is not configured; session and message requests will fail");
            Ok(Arc::new(UnconfiguredAssistant))
        }
    }
}

/// Starts the Axum HTTP server.
async fn serve(app: axum::Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        port = config.port,
        host = %config.host,
        store = %config.store,
        collection = %config.cloudant_db,
        "Starting mobtrack server"
    );

    let store = create_store(&config)?;
    let connection = Arc::new(ConnectionManager::new(store, config.cloudant_db.clone()));
    let assistant = create_assistant(&config)?;

    // Serve immediately; record routes answer 503 until bootstrap finishes.
    let bootstrap = Arc::clone(&connection);
    let policy = config.retry_policy();
    tokio::spawn(async move {
        match bootstrap.connect_with_retry(&policy).await {
            Ok(handle) => info!(collection = %handle.collection(), "Store ready"),
            Err(e) => error!(error = %e, "Store bootstrap failed; record requests will answer 503"),
        }
    });

    let app = create_app_with_config(connection, assistant, config.clone());
    serve(app, &config).await
}
