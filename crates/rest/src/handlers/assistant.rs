//! Assistant pass-through handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::state::AppState;

/// Body of a message request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageRequest {
    /// Message text; empty when absent.
    #[serde(default)]
    pub text: Option<String>,
    /// Session obtained from `GET /api/session`.
    #[serde(default)]
    pub sessionid: Option<String>,
}

/// Handler for opening an assistant session.
///
/// # HTTP Request
///
/// `GET [base]/api/session`
///
/// # Response
///
/// - `200 OK` - The session id as plain text
/// - `502 Bad Gateway` - Assistant unreachable
pub async fn session_handler(State(state): State<AppState>) -> RestResult<Response> {
    let session_id = state.assistant().create_session().await?;
    Ok(session_id.into_response())
}

/// Handler for sending a message to the assistant.
///
/// # HTTP Request
///
/// `POST [base]/api/message` with `{"text": "...", "sessionid": "..."}`
///
/// # Response
///
/// - `200 OK` - The assistant's response, unchanged
/// - `422 Unprocessable Entity` - `sessionid` missing
/// - `502 Bad Gateway` - Assistant unreachable
pub async fn message_handler(
    State(state): State<AppState>,
    body: Result<Json<MessageRequest>, JsonRejection>,
) -> RestResult<Response> {
    let Json(request) = body.map_err(|e| RestError::BadRequest {
        message: e.body_text(),
    })?;

    let session_id = request
        .sessionid
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RestError::Validation {
            message: "A session id must be provided".to_string(),
        })?;
    let text = request.text.unwrap_or_default();

    debug!(session_id = %session_id, "Forwarding message to assistant");

    let response = state.assistant().message(&session_id, &text).await?;
    Ok(Json(response).into_response())
}
