//! Error types for the mobtrack HTTP API.
//!
//! # Error Mapping
//!
//! | Error | HTTP Status | Body |
//! |-------|-------------|------|
//! | Validation | 422 | `{"errors": "<message>"}` |
//! | Store | store status when it is an error status, else 500 | `{"statusCode": n, "message": "..."}` |
//! | NotReady | 503 | `{"statusCode": 503, "message": "..."}` |
//! | Connection | 503 | `{"statusCode": 503, "message": "..."}` |
//! | Assistant | assistant status, 502 when unreachable | `{"statusCode": n, "message": "..."}` |
//! | BadRequest | 400 | `{"statusCode": 400, "message": "..."}` |
//! | Internal | 500 | `{"statusCode": 500, "message": "..."}` |

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mobtrack_persistence::error::{ConnectionError, StorageError, StoreError, ValidationError};
use serde_json::json;

use crate::assistant::AssistantError;

/// The primary error type for HTTP API operations.
#[derive(Debug)]
pub enum RestError {
    /// A required field was missing (HTTP 422).
    Validation {
        /// Human-readable reason, returned verbatim.
        message: String,
    },

    /// The document store rejected the request.
    Store {
        /// Status code reported by the store, if it answered.
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// The store handle is not established yet (HTTP 503).
    NotReady,

    /// Bootstrapping the store handle failed (HTTP 503).
    Connection {
        /// Error message.
        message: String,
    },

    /// The assistant service failed.
    Assistant {
        /// Status code reported by the assistant, if it answered.
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// Malformed request (HTTP 400).
    BadRequest {
        /// Error message.
        message: String,
    },

    /// Internal server error (HTTP 500).
    Internal {
        /// Error message.
        message: String,
    },
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestError::Validation { message } => write!(f, "Validation failed: {}", message),
            RestError::Store { message, .. } => write!(f, "Store error: {}", message),
            RestError::NotReady => write!(f, "Store not ready"),
            RestError::Connection { message } => write!(f, "Store connection failed: {}", message),
            RestError::Assistant { message, .. } => write!(f, "Assistant error: {}", message),
            RestError::BadRequest { message } => write!(f, "Bad request: {}", message),
            RestError::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for RestError {}

/// Result type for HTTP API operations.
pub type RestResult<T> = Result<T, RestError>;

/// Uses the upstream status when it is an error status, else 500.
fn upstream_status(status: Option<u16>) -> StatusCode {
    status
        .and_then(|code| StatusCode::from_u16(code).ok())
        .filter(|code| code.is_client_error() || code.is_server_error())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl RestError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RestError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            RestError::Store { status, .. } => upstream_status(*status),
            RestError::NotReady | RestError::Connection { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RestError::Assistant { status: None, .. } => StatusCode::BAD_GATEWAY,
            RestError::Assistant { status, .. } => upstream_status(*status),
            RestError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            RestError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            RestError::Validation { message } => json!({ "errors": message }),
            RestError::NotReady => json!({
                "statusCode": status.as_u16(),
                "message": "store not ready",
            }),
            RestError::Store { message, .. }
            | RestError::Connection { message }
            | RestError::Assistant { message, .. }
            | RestError::BadRequest { message }
            | RestError::Internal { message } => json!({
                "statusCode": status.as_u16(),
                "message": message,
            }),
        };
        (status, Json(body)).into_response()
    }
}

// Conversions from persistence errors

impl From<StorageError> for RestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Validation(e) => e.into(),
            StorageError::Store(e) => e.into(),
        }
    }
}

impl From<ValidationError> for RestError {
    fn from(err: ValidationError) -> Self {
        RestError::Validation {
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for RestError {
    fn from(err: StoreError) -> Self {
        RestError::Store {
            status: err.status,
            message: err.message,
        }
    }
}

impl From<ConnectionError> for RestError {
    fn from(err: ConnectionError) -> Self {
        RestError::Connection {
            message: err.to_string(),
        }
    }
}

impl From<AssistantError> for RestError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::NotConfigured => RestError::Assistant {
                status: Some(503),
                message: err.to_string(),
            },
            AssistantError::Unreachable { message } => RestError::Assistant {
                status: None,
                message,
            },
            AssistantError::Rejected { status, message } => RestError::Assistant {
                status: Some(status),
                message,
            },
            AssistantError::InvalidResponse { message } => RestError::Assistant {
                status: Some(502),
                message,
            },
            AssistantError::InvalidConfig { message } => RestError::Internal { message },
        }
    }
}
