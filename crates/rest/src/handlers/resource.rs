//! Resource record handlers.
//!
//! - `POST [base]/api/resource` - create a record
//! - `GET [base]/api/resource?name=&transactionType=` - find records

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mobtrack_persistence::types::{FindFilter, NewResource};
use serde::Deserialize;
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::state::AppState;

/// Body of a create request.
///
/// Every field is optional at the wire level so that a missing `name` or
/// `contact` is reported as a validation failure rather than a decode error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateResourceRequest {
    /// Name of the associate (required).
    pub name: Option<String>,
    /// Free-form comment.
    pub description: Option<String>,
    /// Free-form location.
    pub location: Option<String>,
    /// Contact information (required).
    pub contact: Option<String>,
    /// Submitting user.
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
    /// Transaction type; `trnsctype` is accepted from older clients.
    #[serde(rename = "transactionType", alias = "trnsctype")]
    pub transaction_type: Option<String>,
}

impl From<CreateResourceRequest> for NewResource {
    fn from(request: CreateResourceRequest) -> Self {
        NewResource {
            name: request.name.unwrap_or_default(),
            description: request.description.unwrap_or_default(),
            location: request.location.unwrap_or_default(),
            contact: request.contact.unwrap_or_default(),
            user_id: request.user_id.unwrap_or_default(),
            transaction_type: request.transaction_type.filter(|t| !t.is_empty()),
        }
    }
}

/// Query string of a find request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FindResourcesQuery {
    /// Case-insensitive substring of the name.
    pub name: Option<String>,
    /// Exact transaction type; `trnsctype` is accepted from older clients.
    #[serde(rename = "transactionType", alias = "trnsctype")]
    pub transaction_type: Option<String>,
}

impl From<FindResourcesQuery> for FindFilter {
    fn from(query: FindResourcesQuery) -> Self {
        FindFilter {
            partial_name: query.name,
            transaction_type: query.transaction_type,
        }
    }
}

/// Handler for creating a resource record.
///
/// # HTTP Request
///
/// `POST [base]/api/resource`
///
/// # Response
///
/// - `201 Created` - `{"createdId": "...", "createdRevision": "..."}`
/// - `400 Bad Request` - Body is not a JSON object of strings
/// - `422 Unprocessable Entity` - `name` or `contact` missing
/// - `503 Service Unavailable` - Store not ready
///
/// # Example
///
/// ```http
/// POST /api/resource HTTP/1.1
/// Content-Type: application/json
///
/// {"name": "Jo", "contact": "555-1234", "userID": "u1", "transactionType": "checkin"}
/// ```
pub async fn create_resource_handler(
    State(state): State<AppState>,
    body: Result<Json<CreateResourceRequest>, JsonRejection>,
) -> RestResult<Response> {
    let Json(request) = body.map_err(|e| RestError::BadRequest {
        message: e.body_text(),
    })?;

    let resource = NewResource::from(request);
    // Validation precedes the readiness check.
    resource.validate()?;

    debug!(
        name = %resource.name,
        transaction_type = ?resource.transaction_type,
        "Processing create request"
    );

    let created = state.store()?.create(resource).await?;

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// Handler for finding resource records.
///
/// # HTTP Request
///
/// `GET [base]/api/resource?name=&transactionType=`
///
/// # Response
///
/// - `200 OK` - JSON array of records (possibly empty)
/// - `400 Bad Request` - Malformed query string
/// - `503 Service Unavailable` - Store not ready
pub async fn find_resources_handler(
    State(state): State<AppState>,
    query: Result<Query<FindResourcesQuery>, QueryRejection>,
) -> RestResult<Response> {
    let Query(query) = query.map_err(|e| RestError::BadRequest {
        message: e.body_text(),
    })?;
    let filter = FindFilter::from(query);

    debug!(
        name = ?filter.partial_name,
        transaction_type = ?filter.transaction_type,
        "Processing find request"
    );

    let records = state.store()?.find(&filter).await?;

    Ok((StatusCode::OK, Json(records)).into_response())
}
