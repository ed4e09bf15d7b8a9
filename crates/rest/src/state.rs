//! Application state for the mobtrack HTTP API.
//!
//! This module defines the shared application state that is available to all
//! request handlers: the store connection, the assistant client, the health
//! probe built over both, and the server configuration.

use std::sync::Arc;

use mobtrack_persistence::core::{ConnectionManager, HealthProbe, ResourceStore, StoreHealthCheck};

use crate::assistant::{AssistantHealthCheck, DynAssistant};
use crate::config::ServerConfig;
use crate::error::{RestError, RestResult};

/// Shared application state for the HTTP API.
///
/// Cloning is cheap; every field is reference counted.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use mobtrack_persistence::backends::memory::MemoryDocumentStore;
/// use mobtrack_persistence::core::ConnectionManager;
/// use mobtrack_rest::assistant::UnconfiguredAssistant;
/// use mobtrack_rest::{AppState, ServerConfig};
///
/// let manager = Arc::new(ConnectionManager::new(
///     Arc::new(MemoryDocumentStore::new()),
///     "mobtrack_db",
/// ));
/// let state = AppState::new(manager, Arc::new(UnconfiguredAssistant), ServerConfig::for_testing());
/// assert!(!state.is_ready());
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Store connection; the handle inside is set once bootstrap succeeds.
    connection: Arc<ConnectionManager>,

    /// Assistant client.
    assistant: DynAssistant,

    /// Health checks over the store and the assistant.
    health: HealthProbe,

    /// Server configuration.
    config: Arc<ServerConfig>,
}

impl AppState {
    /// Creates a new AppState.
    ///
    /// # Arguments
    ///
    /// * `connection` - The store connection manager (shared with the bootstrap task)
    /// * `assistant` - The assistant client
    /// * `config` - Server configuration
    pub fn new(
        connection: Arc<ConnectionManager>,
        assistant: DynAssistant,
        config: ServerConfig,
    ) -> Self {
        let health = HealthProbe::new()
            .with_check(Arc::new(StoreHealthCheck::new(Arc::clone(&connection))))
            .with_check(Arc::new(AssistantHealthCheck::new(Arc::clone(&assistant))));

        Self {
            connection,
            assistant,
            health,
            config: Arc::new(config),
        }
    }

    /// Returns the record store.
    ///
    /// Before a handle exists this is [`RestError::Connection`] when the last
    /// bootstrap attempt failed, and [`RestError::NotReady`] while it is pending.
    pub fn store(&self) -> RestResult<ResourceStore> {
        match self.connection.handle() {
            Some(handle) => Ok(ResourceStore::new(handle)),
            None => Err(self
                .connection
                .last_error()
                .map_or(RestError::NotReady, RestError::from)),
        }
    }

    /// Returns true once the store handle is established.
    pub fn is_ready(&self) -> bool {
        self.connection.is_ready()
    }

    /// Returns the connection manager.
    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    /// Returns the assistant client.
    pub fn assistant(&self) -> &DynAssistant {
        &self.assistant
    }

    /// Returns the health probe.
    pub fn health(&self) -> &HealthProbe {
        &self.health
    }

    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
