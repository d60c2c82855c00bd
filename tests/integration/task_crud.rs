// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::doc_markdown,
    clippy::future_not_send,
    clippy::missing_panics_doc
)]

//! Integration tests for personal task CRUD over HTTP.
//!
//! Each test starts the real server on an ephemeral port with an in-memory
//! store and a static token table, then drives it with `reqwest`.

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};
use tasksteer_server::auth::{Identity, StaticTokenVerifier};
use tasksteer_server::server::{AppState, start_server_with_state};
use tasksteer_server::store::MemoryStore;

const ALICE: &str = "t-alice";
const BOB: &str = "t-bob";

struct TestServer {
    base: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        let verifier = StaticTokenVerifier::new()
            .with_token(ALICE, Identity::new("alice", Some("alice@example.com")))
            .with_token(BOB, Identity::new("bob", Some("bob@example.com")));
        let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(verifier));
        let (addr, handle) = start_server_with_state("127.0.0.1:0", Arc::new(state))
            .await
            .expect("failed to start test server");
        Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn create_personal(&self, token: &str, body: Value) -> String {
        let response = self
            .client
            .post(self.url("/create-task"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let reply: Value = response.json().await.unwrap();
        reply["id"].as_str().unwrap().to_string()
    }

    async fn tasks(&self, token: &str) -> Vec<Value> {
        let response = self
            .client
            .get(self.url("/tasks"))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn root_reports_running_without_auth() {
    let server = TestServer::start().await;
    let reply: Value = server
        .client
        .get(server.url("/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reply["message"], "TaskSteer backend is running.");
}

#[tokio::test]
async fn requests_without_token_get_401() {
    let server = TestServer::start().await;
    let response = server
        .client
        .get(server.url("/tasks"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "AUTH_REQUIRED");
}

#[tokio::test]
async fn create_then_list_personal_task() {
    let server = TestServer::start().await;
    let id = server
        .create_personal(
            ALICE,
            json!({
                "type": "personal",
                "title": "Draft Q3 report",
                "due_date": "2024-07-01",
                "status": "High Priority"
            }),
        )
        .await;

    let tasks = server.tasks(ALICE).await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], id.as_str());
    assert_eq!(tasks[0]["title"], "Draft Q3 report");
    assert_eq!(tasks[0]["status"], "highpriority");
    assert_eq!(tasks[0]["source"], "manual");
    assert_eq!(tasks[0]["deleted"], false);

    // Personal tasks are private.
    assert!(server.tasks(BOB).await.is_empty());
}

#[tokio::test]
async fn untitled_task_defaults() {
    let server = TestServer::start().await;
    server
        .create_personal(ALICE, json!({"type": "personal"}))
        .await;
    let tasks = server.tasks(ALICE).await;
    assert_eq!(tasks[0]["title"], "Untitled Task");
    assert_eq!(tasks[0]["status"], "todo");
}

#[tokio::test]
async fn update_changes_fields_and_rejects_empty_patch() {
    let server = TestServer::start().await;
    let id = server
        .create_personal(ALICE, json!({"type": "personal", "title": "Slides"}))
        .await;

    let response = server
        .client
        .put(server.url(&format!("/update-personal-task/{id}")))
        .bearer_auth(ALICE)
        .json(&json!({"status": "In Progress", "assignee": "Sarah"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let tasks = server.tasks(ALICE).await;
    assert_eq!(tasks[0]["status"], "inprogress");
    assert_eq!(tasks[0]["assignee"], "Sarah");
    assert!(tasks[0]["updated_at"].is_string());

    let response = server
        .client
        .put(server.url(&format!("/update-personal-task/{id}")))
        .bearer_auth(ALICE)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server
        .client
        .put(server.url(&format!("/update-personal-task/{id}")))
        .bearer_auth(ALICE)
        .json(&json!({"status": "Someday"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn other_users_cannot_touch_personal_tasks() {
    let server = TestServer::start().await;
    let id = server
        .create_personal(ALICE, json!({"type": "personal", "title": "Mine"}))
        .await;

    let response = server
        .client
        .put(server.url(&format!("/update-personal-task/{id}")))
        .bearer_auth(BOB)
        .json(&json!({"title": "Stolen"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server
        .client
        .delete(server.url(&format!("/delete-personal-task/{id}")))
        .bearer_auth(BOB)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_is_soft_and_final() {
    let server = TestServer::start().await;
    let id = server
        .create_personal(ALICE, json!({"type": "personal", "title": "Temp"}))
        .await;

    let response = server
        .client
        .delete(server.url(&format!("/delete-personal-task/{id}")))
        .bearer_auth(ALICE)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(server.tasks(ALICE).await.is_empty());

    let response = server
        .client
        .put(server.url(&format!("/update-personal-task/{id}")))
        .bearer_auth(ALICE)
        .json(&json!({"title": "Back"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn suggest_status_without_model_is_unavailable() {
    let server = TestServer::start().await;
    let response = server
        .client
        .post(server.url("/suggest-status"))
        .bearer_auth(ALICE)
        .json(&json!({"title": "Ship it"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
