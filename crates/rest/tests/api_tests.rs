//! HTTP API tests.
//!
//! Exercise the full router against the in-memory store and a scripted
//! assistant:
//! - resource create/find status codes and bodies
//! - validation messages
//! - readiness before and after bootstrap
//! - health summary with independent dependency checks
//! - assistant pass-through

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use mobtrack_persistence::backends::memory::MemoryDocumentStore;
use mobtrack_persistence::core::ConnectionManager;
use mobtrack_rest::assistant::{AssistantApi, AssistantError, DynAssistant, UnconfiguredAssistant};
use mobtrack_rest::{ServerConfig, create_app_with_config};
use serde_json::{Value, json};

/// Assistant that answers every call from memory.
struct ScriptedAssistant;

#[async_trait]
impl AssistantApi for ScriptedAssistant {
    async fn create_session(&self) -> Result<String, AssistantError> {
        Ok("session-1".to_string())
    }

    async fn message(&self, session_id: &str, text: &str) -> Result<Value, AssistantError> {
        if session_id != "session-1" {
            return Err(AssistantError::Rejected {
                status: 404,
                message: "Invalid Session".to_string(),
            });
        }
        Ok(json!({ "output": { "generic": [{ "response_type": "text", "text": format!("echo: {}", text) }] } }))
    }
}

struct TestContext {
    server: TestServer,
    store: Arc<MemoryDocumentStore>,
    manager: Arc<ConnectionManager>,
}

fn build(assistant: DynAssistant) -> TestContext {
    let store = Arc::new(MemoryDocumentStore::new());
    let manager = Arc::new(ConnectionManager::new(store.clone(), "mobtrack_test"));
    let app = create_app_with_config(
        Arc::clone(&manager),
        assistant,
        ServerConfig::for_testing(),
    );
    let server = TestServer::new(app).expect("Failed to create test server");
    TestContext {
        server,
        store,
        manager,
    }
}

/// Creates a server whose store is already bootstrapped.
async fn create_test_server() -> TestContext {
    let ctx = build(Arc::new(ScriptedAssistant));
    ctx.manager.connect().await.expect("bootstrap memory store");
    ctx
}

async fn create_resource(server: &TestServer, body: Value) -> String {
    let response = server.post("/api/resource").json(&body).await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["createdId"]
        .as_str()
        .expect("createdId is a string")
        .to_string()
}

fn ids(records: &Value) -> HashSet<String> {
    records
        .as_array()
        .expect("find returns an array")
        .iter()
        .map(|r| r["id"].as_str().unwrap_or_default().to_string())
        .collect()
}

// =============================================================================
// Create
// =============================================================================

mod create {
    use super::*;

    #[tokio::test]
    async fn test_create_returns_201_with_identity() {
        let ctx = create_test_server().await;

        let response = ctx
            .server
            .post("/api/resource")
            .json(&json!({ "name": "Jo", "contact": "555-1234" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body = response.json::<Value>();
        assert!(!body["createdId"].as_str().unwrap().is_empty());
        assert!(body["createdRevision"].as_str().unwrap().starts_with("1-"));
    }

    #[tokio::test]
    async fn test_create_without_name_returns_422() {
        let ctx = create_test_server().await;

        let response = ctx
            .server
            .post("/api/resource")
            .json(&json!({ "contact": "555-1234" }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        response.assert_json(&json!({ "errors": "Name of associate must be provided" }));
        assert_eq!(ctx.store.stats().insert, 0);
    }

    #[tokio::test]
    async fn test_create_with_empty_contact_returns_422() {
        let ctx = create_test_server().await;

        let response = ctx
            .server
            .post("/api/resource")
            .json(&json!({ "name": "Jo", "contact": "" }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        response.assert_json(&json!({ "errors": "A method of contact must be provided" }));
        assert_eq!(ctx.store.stats().insert, 0);
    }

    #[tokio::test]
    async fn test_create_with_malformed_body_returns_400() {
        let ctx = create_test_server().await;

        let response = ctx.server.post("/api/resource").text("not json").await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_when_store_down_returns_500() {
        let ctx = create_test_server().await;
        ctx.store.set_unavailable(true);

        let response = ctx
            .server
            .post("/api/resource")
            .json(&json!({ "name": "Jo", "contact": "555" }))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.json::<Value>()["statusCode"], 500);
    }
}

// =============================================================================
// Find
// =============================================================================

mod find {
    use super::*;

    #[tokio::test]
    async fn test_find_without_filters_returns_all() {
        let ctx = create_test_server().await;
        let a = create_resource(&ctx.server, json!({ "name": "Anna", "contact": "1" })).await;
        let b = create_resource(&ctx.server, json!({ "name": "Bob", "contact": "2" })).await;

        let response = ctx.server.get("/api/resource").await;

        response.assert_status_ok();
        let found = ids(&response.json::<Value>());
        assert!(found.contains(&a));
        assert!(found.contains(&b));
    }

    #[tokio::test]
    async fn test_find_on_empty_store_returns_empty_array() {
        let ctx = create_test_server().await;

        let response = ctx.server.get("/api/resource").await;

        response.assert_status_ok();
        response.assert_json(&json!([]));
    }

    #[tokio::test]
    async fn test_find_by_name() {
        let ctx = create_test_server().await;
        let anna = create_resource(&ctx.server, json!({ "name": "Anna", "contact": "1" })).await;
        let susanna =
            create_resource(&ctx.server, json!({ "name": "Susanna", "contact": "2" })).await;
        let bob = create_resource(&ctx.server, json!({ "name": "Bob", "contact": "3" })).await;

        let response = ctx
            .server
            .get("/api/resource")
            .add_query_param("name", "ann")
            .await;

        let found = ids(&response.json::<Value>());
        assert!(found.contains(&anna));
        assert!(found.contains(&susanna));
        assert!(!found.contains(&bob));
    }

    #[tokio::test]
    async fn test_find_by_transaction_type_is_exact() {
        let ctx = create_test_server().await;
        let checkin = create_resource(
            &ctx.server,
            json!({ "name": "Jo", "contact": "1", "transactionType": "checkin" }),
        )
        .await;
        create_resource(
            &ctx.server,
            json!({ "name": "Jo", "contact": "2", "transactionType": "checkin2" }),
        )
        .await;

        let response = ctx
            .server
            .get("/api/resource")
            .add_query_param("transactionType", "checkin")
            .await;

        assert_eq!(ids(&response.json::<Value>()), HashSet::from([checkin]));
    }

    #[tokio::test]
    async fn test_legacy_transaction_type_names() {
        let ctx = create_test_server().await;
        let id = create_resource(
            &ctx.server,
            json!({ "name": "Jo", "description": "", "location": "", "contact": "555-1234", "userID": "u1", "trnsctype": "checkin" }),
        )
        .await;

        let response = ctx
            .server
            .get("/api/resource")
            .add_query_param("trnsctype", "checkin")
            .await;

        let records = response.json::<Value>();
        assert!(ids(&records).contains(&id));
        let record = &records[0];
        assert_eq!(record["transactionType"], "checkin");
        assert_eq!(record["userID"], "u1");
        assert!(record["createdAt"].as_i64().unwrap() > 0);
        assert!(record["_rev"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_malformed_query_returns_json_400() {
        let ctx = create_test_server().await;

        let response = ctx
            .server
            .get("/api/resource")
            .add_query_param("transactionType", "checkin")
            .add_query_param("trnsctype", "checkin")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body = response.json::<Value>();
        assert_eq!(body["statusCode"], 400);
        assert!(body["message"].as_str().is_some());
    }
}

// =============================================================================
// Readiness
// =============================================================================

mod readiness {
    use super::*;

    #[tokio::test]
    async fn test_requests_before_bootstrap_return_503() {
        let ctx = build(Arc::new(ScriptedAssistant));

        let create = ctx
            .server
            .post("/api/resource")
            .json(&json!({ "name": "Jo", "contact": "555" }))
            .await;
        create.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(create.json::<Value>()["message"], "store not ready");

        let find = ctx.server.get("/api/resource").await;
        find.assert_status(StatusCode::SERVICE_UNAVAILABLE);

        ctx.server
            .get("/_readiness")
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_validation_precedes_readiness() {
        let ctx = build(Arc::new(ScriptedAssistant));

        let response = ctx
            .server
            .post("/api/resource")
            .json(&json!({ "contact": "555" }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_failed_bootstrap_is_reported() {
        let ctx = build(Arc::new(ScriptedAssistant));
        ctx.store.set_unavailable(true);
        ctx.manager.connect().await.unwrap_err();

        let response = ctx.server.get("/api/resource").await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let body = response.json::<Value>();
        assert_eq!(body["statusCode"], 503);
        assert!(body["message"].as_str().unwrap().contains("unreachable"));

        ctx.store.set_unavailable(false);
        ctx.manager.connect().await.unwrap();
        ctx.server.get("/api/resource").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_ready_after_bootstrap() {
        let ctx = build(Arc::new(ScriptedAssistant));
        ctx.manager.connect().await.unwrap();

        let response = ctx.server.get("/_readiness").await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["status"], "ready");
        assert_eq!(body["backend"], "memory");
        assert_eq!(body["collection"], "mobtrack_test");
        assert!(ctx.store.has_collection("mobtrack_test"));
    }

    #[tokio::test]
    async fn test_liveness_always_ok() {
        let ctx = build(Arc::new(UnconfiguredAssistant));
        ctx.server.get("/_liveness").await.assert_status_ok();
    }
}

// =============================================================================
// Health
// =============================================================================

mod health {
    use super::*;

    #[tokio::test]
    async fn test_health_all_ok() {
        let ctx = create_test_server().await;

        let response = ctx.server.get("/").await;

        response.assert_status_ok();
        response.assert_json(&json!({ "status": { "store": "ok", "assistant": "ok" } }));
    }

    #[tokio::test]
    async fn test_health_store_down_still_reports_assistant() {
        let ctx = create_test_server().await;
        ctx.store.set_unavailable(true);

        let response = ctx.server.get("/").await;

        response.assert_status_ok();
        response.assert_json(&json!({ "status": { "store": "failed", "assistant": "ok" } }));
    }

    #[tokio::test]
    async fn test_health_before_bootstrap() {
        let ctx = build(Arc::new(UnconfiguredAssistant));

        let response = ctx.server.get("/").await;

        response.assert_json(&json!({ "status": { "store": "failed", "assistant": "failed" } }));
    }
}

// =============================================================================
// Assistant
// =============================================================================

mod assistant {
    use super::*;

    #[tokio::test]
    async fn test_session_returns_plain_text_id() {
        let ctx = create_test_server().await;

        let response = ctx.server.get("/api/session").await;

        response.assert_status_ok();
        response.assert_text("session-1");
    }

    #[tokio::test]
    async fn test_message_passes_response_through() {
        let ctx = create_test_server().await;

        let response = ctx
            .server
            .post("/api/message")
            .json(&json!({ "text": "hello", "sessionid": "session-1" }))
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<Value>()["output"]["generic"][0]["text"],
            "echo: hello"
        );
    }

    #[tokio::test]
    async fn test_message_without_text_sends_empty() {
        let ctx = create_test_server().await;

        let response = ctx
            .server
            .post("/api/message")
            .json(&json!({ "sessionid": "session-1" }))
            .await;

        assert_eq!(
            response.json::<Value>()["output"]["generic"][0]["text"],
            "echo: "
        );
    }

    #[tokio::test]
    async fn test_message_without_session_returns_422() {
        let ctx = create_test_server().await;

        let response = ctx
            .server
            .post("/api/message")
            .json(&json!({ "text": "hello" }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_assistant_rejection_status_is_forwarded() {
        let ctx = create_test_server().await;

        let response = ctx
            .server
            .post("/api/message")
            .json(&json!({ "text": "hello", "sessionid": "expired" }))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["message"], "Invalid Session");
    }

    #[tokio::test]
    async fn test_unconfigured_assistant_session_fails() {
        let ctx = build(Arc::new(UnconfiguredAssistant));

        let response = ctx.server.get("/api/session").await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }
}
