//! Route table.

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::state::AppState;

/// Creates all API routes.
///
/// # Routes
///
/// ## Probes
/// - `GET /` - Health summary of the store and the assistant
/// - `GET /_liveness` - Liveness probe
/// - `GET /_readiness` - Readiness probe (store handle established)
///
/// ## Assistant
/// - `GET /api/session` - Open a session
/// - `POST /api/message` - Send a message
///
/// ## Resources
/// - `POST /api/resource` - Create a record
/// - `GET /api/resource` - Find records by `name` and `transactionType`
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // Probes
        .route("/", get(handlers::health_handler))
        .route("/_liveness", get(handlers::liveness_handler))
        .route("/_readiness", get(handlers::readiness_handler))
        // Assistant
        .route("/api/session", get(handlers::session_handler))
        .route("/api/message", post(handlers::message_handler))
        // Resources
        .route(
            "/api/resource",
            get(handlers::find_resources_handler).post(handlers::create_resource_handler),
        )
        // State
        .with_state(state)
}
