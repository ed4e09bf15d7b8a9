//! Health check endpoint handlers.
//!
//! `GET /` reports every dependency; `/_liveness` and `/_readiness` are
//! cheap probes for load balancers and orchestrators.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::debug;

use crate::error::RestResult;
use crate::state::AppState;

/// Handler for the health summary.
///
/// Probes the record store and the assistant independently and always
/// answers `200 OK`; failures are reported in the body.
///
/// # HTTP Request
///
/// `GET [base]/`
///
/// # Response
///
/// ```json
/// {"status": {"assistant": "failed", "store": "ok"}}
/// ```
pub async fn health_handler(State(state): State<AppState>) -> Response {
    debug!("Processing health check request");

    let report = state.health().run().await;

    (StatusCode::OK, Json(json!({ "status": report }))).into_response()
}

/// Handler for a liveness probe.
///
/// # HTTP Request
///
/// `GET [base]/_liveness`
pub async fn liveness_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Handler for a readiness probe.
///
/// Ready means the store handle is established; no request is sent to the store.
///
/// # HTTP Request
///
/// `GET [base]/_readiness`
///
/// # Response
///
/// - `200 OK` - Store handle established
/// - `503 Service Unavailable` - Bootstrap not finished or failed
pub async fn readiness_handler(State(state): State<AppState>) -> RestResult<Response> {
    debug!("Processing readiness check request");

    let store = state.store()?;
    let handle = store.handle();

    let response = json!({
        "status": "ready",
        "backend": handle.backend_kind().to_string(),
        "collection": handle.collection(),
    });

    Ok((StatusCode::OK, Json(response)).into_response())
}
