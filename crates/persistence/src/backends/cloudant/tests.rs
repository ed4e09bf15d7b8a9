use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::extract::{Form, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::backends::cloudant::{CloudantAuth, CloudantClient, CloudantConfig};
use crate::core::{ConnectionManager, DocumentStoreApi, ResourceStore};
use crate::error::ConnectionError;
use crate::types::{FindFilter, NewResource, Selector};

const DB: &str = "mobtrack_db";
const API_KEY: &str = "good-key";

/// A single CouchDB node plus an IAM token endpoint, served over real HTTP.
#[derive(Debug, Default)]
struct FakeCouch {
    databases: BTreeMap<String, Vec<Value>>,
    /// `_all_dbs` answers `[]` so bootstrap runs into an existing database.
    hide_databases: bool,
    /// Require `Bearer <valid_token>` on every CouchDB request.
    iam: bool,
    valid_token: Option<String>,
    reject_all_tokens: bool,
    token_exchanges: u32,
    authorizations: Vec<Option<String>>,
    find_bodies: Vec<Value>,
}

type Shared = Arc<Mutex<FakeCouch>>;

fn couch_error(status: StatusCode, error: &str, reason: &str) -> Response {
    (status, Json(json!({ "error": error, "reason": reason }))).into_response()
}

fn not_found() -> Response {
    couch_error(StatusCode::NOT_FOUND, "not_found", "Database does not exist.")
}

fn check_auth(couch: &mut FakeCouch, headers: &HeaderMap) -> Option<Response> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    couch.authorizations.push(authorization.clone());

    if !couch.iam {
        return None;
    }
    let expected = couch.valid_token.as_ref().map(|t| format!("Bearer {}", t));
    if couch.reject_all_tokens || expected.is_none() || authorization != expected {
        return Some(couch_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Invalid or expired token",
        ));
    }
    None
}

async fn iam_token(State(shared): State<Shared>, Form(form): Form<HashMap<String, String>>) -> Response {
    let mut couch = shared.lock();
    let grant_ok = form.get("grant_type").map(String::as_str)
        == Some("urn:ibm:params:oauth:grant-type:apikey");
    if !grant_ok || form.get("apikey").map(String::as_str) != Some(API_KEY) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "errorCode": "BXNIM0415E", "errorMessage": "Provided API key could not be found." })),
        )
            .into_response();
    }

    couch.token_exchanges += 1;
    let token = format!("token-{}", couch.token_exchanges);
    couch.valid_token = Some(token.clone());
    Json(json!({ "access_token": token, "token_type": "Bearer", "expires_in": 3600 })).into_response()
}

async fn all_dbs(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let mut couch = shared.lock();
    if let Some(rejection) = check_auth(&mut couch, &headers) {
        return rejection;
    }
    let names: Vec<&String> = if couch.hide_databases {
        Vec::new()
    } else {
        couch.databases.keys().collect()
    };
    Json(json!(names)).into_response()
}

async fn create_db(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(db): Path<String>,
) -> Response {
    let mut couch = shared.lock();
    if let Some(rejection) = check_auth(&mut couch, &headers) {
        return rejection;
    }
    if couch.databases.contains_key(&db) {
        return couch_error(
            StatusCode::PRECONDITION_FAILED,
            "file_exists",
            "The database could not be created, the file already exists.",
        );
    }
    couch.databases.insert(db, Vec::new());
    (StatusCode::CREATED, Json(json!({ "ok": true }))).into_response()
}

async fn db_info(State(shared): State<Shared>, headers: HeaderMap, Path(db): Path<String>) -> Response {
    let mut couch = shared.lock();
    if let Some(rejection) = check_auth(&mut couch, &headers) {
        return rejection;
    }
    match couch.databases.get(&db) {
        Some(docs) => Json(json!({ "db_name": db, "doc_count": docs.len() })).into_response(),
        None => not_found(),
    }
}

async fn insert_doc(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(db): Path<String>,
    Json(document): Json<Value>,
) -> Response {
    let mut guard = shared.lock();
    let couch = &mut *guard;
    if let Some(rejection) = check_auth(couch, &headers) {
        return rejection;
    }
    let Some(docs) = couch.databases.get_mut(&db) else {
        return not_found();
    };
    let id = document["_id"].as_str().unwrap_or_default().to_string();
    let rev = format!("1-{:032x}", docs.len() + 1);
    docs.push(document);
    (
        StatusCode::CREATED,
        Json(json!({ "ok": true, "id": id, "rev": rev })),
    )
        .into_response()
}

/// Pages by offset; the bookmark is the offset of the next page.
async fn find_docs(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(db): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut guard = shared.lock();
    let couch = &mut *guard;
    if let Some(rejection) = check_auth(couch, &headers) {
        return rejection;
    }
    couch.find_bodies.push(body.clone());
    let Some(docs) = couch.databases.get(&db) else {
        return not_found();
    };

    let limit = body["limit"].as_u64().unwrap_or(25) as usize;
    let offset = body
        .get("bookmark")
        .and_then(Value::as_str)
        .and_then(|b| b.parse::<usize>().ok())
        .unwrap_or(0);
    let page: Vec<Value> = docs.iter().skip(offset).take(limit).cloned().collect();
    let bookmark = (offset + page.len()).to_string();
    Json(json!({ "docs": page, "bookmark": bookmark })).into_response()
}

/// Serves the fake on an ephemeral port and returns its base URL.
async fn spawn(couch: FakeCouch) -> (String, Shared) {
    let shared: Shared = Arc::new(Mutex::new(couch));
    let app = Router::new()
        .route("/identity/token", post(iam_token))
        .route("/_all_dbs", get(all_dbs))
        .route("/{db}", put(create_db).get(db_info).post(insert_doc))
        .route("/{db}/_find", post(find_docs))
        .with_state(shared.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), shared)
}

fn iam_client(base: &str, api_key: &str) -> CloudantClient {
    CloudantClient::new(CloudantConfig {
        url: Some(base.to_string()),
        auth: Some(CloudantAuth::Iam {
            api_key: api_key.to_string(),
        }),
        iam_token_url: format!("{}/identity/token", base),
        find_page_size: 2,
        ..Default::default()
    })
    .unwrap()
}

fn iam_couch() -> FakeCouch {
    FakeCouch {
        iam: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn bootstrap_creates_missing_database() {
    let (base, couch) = spawn(iam_couch()).await;
    let manager = ConnectionManager::new(Arc::new(iam_client(&base, API_KEY)), DB);

    let handle = manager.connect().await.unwrap();

    assert_eq!(handle.collection(), DB);
    let couch = couch.lock();
    assert!(couch.databases.contains_key(DB));
    assert_eq!(couch.token_exchanges, 1);
    assert!(
        couch
            .authorizations
            .iter()
            .all(|a| a.as_deref() == Some("Bearer token-1"))
    );
}

#[tokio::test]
async fn bootstrap_accepts_database_created_concurrently() {
    let mut fake = iam_couch();
    fake.databases.insert(DB.to_string(), Vec::new());
    fake.hide_databases = true;
    let (base, couch) = spawn(fake).await;
    let manager = ConnectionManager::new(Arc::new(iam_client(&base, API_KEY)), DB);

    // `_all_dbs` misses the database and `PUT` answers 412.
    assert!(manager.connect().await.is_ok());
    assert_eq!(couch.lock().authorizations.len(), 2);
}

#[tokio::test]
async fn create_and_find_round_trip_over_http() {
    let (base, couch) = spawn(iam_couch()).await;
    let manager = ConnectionManager::new(Arc::new(iam_client(&base, API_KEY)), DB);
    let store = ResourceStore::new(manager.connect().await.unwrap());

    let created = store
        .create(NewResource::new("Jo", "555-1234").with_transaction_type("checkin"))
        .await
        .unwrap();

    assert_eq!(created.created_revision, format!("1-{:032x}", 1));
    {
        let couch = couch.lock();
        let stored = &couch.databases[DB][0];
        assert_eq!(stored["_id"], created.created_id.as_str());
        assert_eq!(stored["transactionType"], "checkin");
    }

    let found = store
        .find(&FindFilter::new().with_transaction_type("checkin"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), created.created_id);
    assert_eq!(store.info().await.unwrap().document_count, Some(1));
}

#[tokio::test]
async fn find_follows_bookmarks_across_pages() {
    let mut fake = FakeCouch::default();
    fake.databases.insert(
        DB.to_string(),
        (0..5)
            .map(|i| json!({ "_id": format!("doc-{}", i), "name": "Anna" }))
            .collect(),
    );
    let (base, couch) = spawn(fake).await;
    let client = CloudantClient::new(CloudantConfig {
        url: Some(base),
        find_page_size: 2,
        ..Default::default()
    })
    .unwrap();
    let selector = Selector::from(&FindFilter::new().with_partial_name("ann"));

    let docs = client.query(DB, &selector).await.unwrap();

    assert_eq!(docs.len(), 5);
    let couch = couch.lock();
    let bookmarks: Vec<Option<&str>> = couch
        .find_bodies
        .iter()
        .map(|b| b.get("bookmark").and_then(Value::as_str))
        .collect();
    assert_eq!(bookmarks, vec![None, Some("2"), Some("4")]);
    assert!(
        couch
            .find_bodies
            .iter()
            .all(|b| b["selector"] == selector.to_mango() && b["limit"] == 2)
    );
    assert!(couch.authorizations.iter().all(Option::is_none));
}

#[tokio::test]
async fn rejected_token_is_refreshed_once() {
    let (base, couch) = spawn(iam_couch()).await;
    let client = iam_client(&base, API_KEY);
    client.list_collections().await.unwrap();

    // Server-side revocation: the cached token-1 is no longer accepted.
    couch.lock().valid_token = Some("token-revoked".to_string());

    assert!(client.list_collections().await.is_ok());
    let couch = couch.lock();
    assert_eq!(couch.token_exchanges, 2);
    assert_eq!(
        couch.authorizations,
        vec![
            Some("Bearer token-1".to_string()),
            Some("Bearer token-1".to_string()),
            Some("Bearer token-2".to_string()),
        ]
    );
}

#[tokio::test]
async fn persistent_unauthorized_is_not_retried_forever() {
    let mut fake = iam_couch();
    fake.reject_all_tokens = true;
    let (base, couch) = spawn(fake).await;
    let manager = ConnectionManager::new(Arc::new(iam_client(&base, API_KEY)), DB);

    let err = manager.connect().await.unwrap_err();

    assert!(matches!(err, ConnectionError::AuthenticationFailed { .. }));
    let couch = couch.lock();
    assert_eq!(couch.token_exchanges, 2);
    assert_eq!(couch.authorizations.len(), 2);
}

#[tokio::test]
async fn bad_api_key_is_an_authentication_failure() {
    let (base, couch) = spawn(iam_couch()).await;
    let manager = ConnectionManager::new(Arc::new(iam_client(&base, "wrong-key")), DB);

    let err = manager.connect().await.unwrap_err();

    assert!(matches!(err, ConnectionError::AuthenticationFailed { .. }));
    assert!(couch.lock().authorizations.is_empty());
}

#[tokio::test]
async fn basic_credentials_are_sent() {
    let (base, couch) = spawn(FakeCouch::default()).await;
    let client = CloudantClient::new(CloudantConfig {
        url: Some(base),
        auth: Some(CloudantAuth::Basic {
            username: "admin".to_string(),
            password: "secret".to_string(),
        }),
        ..Default::default()
    })
    .unwrap();

    client.list_collections().await.unwrap();

    // base64("admin:secret")
    assert_eq!(
        couch.lock().authorizations,
        vec![Some("Basic YWRtaW46c2VjcmV0".to_string())]
    );
}

#[tokio::test]
async fn missing_database_error_carries_reason() {
    let (base, _) = spawn(FakeCouch::default()).await;
    let client = CloudantClient::new(CloudantConfig {
        url: Some(base),
        ..Default::default()
    })
    .unwrap();

    let err = client
        .insert("absent", json!({ "_id": "a" }))
        .await
        .unwrap_err();

    assert_eq!(err.status, Some(404));
    assert_eq!(err.message, "not_found: Database does not exist.");
    assert!(client.collection_metadata("absent").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn unreachable_server_has_no_status() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let client = CloudantClient::new(CloudantConfig {
        url: Some(base),
        ..Default::default()
    })
    .unwrap();

    let err = client.list_collections().await.unwrap_err();

    assert_eq!(err.status, None);
}
