// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::doc_markdown,
    clippy::future_not_send,
    clippy::missing_panics_doc
)]

//! Integration tests for shared lists: creation, invites, membership checks,
//! shared task CRUD and owner-only deletion.

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};
use tasksteer_server::auth::{Identity, StaticTokenVerifier};
use tasksteer_server::server::{AppState, start_server_with_state};
use tasksteer_server::store::MemoryStore;

const OWNER: &str = "t-alice";
const GUEST: &str = "t-bob";
const OUTSIDER: &str = "t-carol";

struct TestServer {
    base: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        let verifier = StaticTokenVerifier::new()
            .with_token(OWNER, Identity::new("alice", Some("alice@example.com")))
            .with_token(GUEST, Identity::new("bob", Some("Bob@Example.com")))
            .with_token(OUTSIDER, Identity::new("carol", Some("carol@example.com")));
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

    async fn post(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    async fn get(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    async fn delete(&self, token: &str, path: &str) -> StatusCode {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
            .status()
    }

    async fn create_list(&self, name: &str) -> String {
        let body = json!({ "name": name });
        let (status, body) = self.post(OWNER, "/create-list", body).await;
        assert_eq!(status, StatusCode::CREATED);
        body["list"]["id"].as_str().unwrap().to_string()
    }

    /// Invites bob to the list and has him accept.
    async fn add_guest(&self, list_id: &str) {
        let (status, _) = self
            .post(
                OWNER,
                "/invite",
                json!({"listId": list_id, "email": " BOB@example.com "}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = self
            .post(GUEST, "/accept-invite", json!({"listId": list_id}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn created_list_has_owner_as_only_member() {
    let server = TestServer::start().await;
    let (status, body) = server
        .post(OWNER, "/create-list", json!({"name": "Launch"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["list"]["name"], "Launch");
    assert_eq!(body["list"]["owner_id"], "alice");
    assert_eq!(body["list"]["members"], json!(["alice@example.com"]));

    let (_, lists) = server.get(OWNER, "/lists").await;
    assert_eq!(lists.as_array().unwrap().len(), 1);
    let (_, lists) = server.get(GUEST, "/lists").await;
    assert!(lists.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn blank_list_name_is_rejected() {
    let server = TestServer::start().await;
    let (status, body) = server
        .post(OWNER, "/create-list", json!({"name": "   "}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn invite_accept_round_trip() {
    let server = TestServer::start().await;
    let list_id = server.create_list("Launch").await;

    let (status, _) = server
        .post(
            OWNER,
            "/invite",
            json!({"listId": list_id, "email": "Bob@Example.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, invites) = server.get(GUEST, "/invites").await;
    assert_eq!(invites["invites"][0]["list_id"], list_id.as_str());
    assert_eq!(invites["invites"][0]["name"], "Launch");

    let (status, _) = server
        .post(GUEST, "/accept-invite", json!({"listId": list_id}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, invites) = server.get(GUEST, "/invites").await;
    assert!(invites["invites"].as_array().unwrap().is_empty());
    let (_, lists) = server.get(GUEST, "/lists").await;
    assert_eq!(lists[0]["id"], list_id.as_str());
}

#[tokio::test]
async fn invite_error_cases() {
    let server = TestServer::start().await;
    let list_id = server.create_list("Launch").await;

    let (status, _) = server
        .post(OWNER, "/invite", json!({"listId": list_id}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = json!({"listId": "missing", "email": "x@y.z"});
    let (status, _) = server.post(OWNER, "/invite", body).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .post(
            OUTSIDER,
            "/invite",
            json!({"listId": list_id, "email": "carol@example.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .post(
            OWNER,
            "/invite",
            json!({"listId": list_id, "email": "alice@example.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User is already a member of this list.");

    let (status, _) = server
        .post(OUTSIDER, "/accept-invite", json!({"listId": list_id}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn shared_task_crud_for_members_only() {
    let server = TestServer::start().await;
    let list_id = server.create_list("Launch").await;
    server.add_guest(&list_id).await;

    let (status, body) = server
        .post(
            GUEST,
            "/create-task",
            json!({
                "type": "shared",
                "list_id": list_id,
                "title": "Book venue",
                "assignee": "bob@example.com"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let task_id = body["id"].as_str().unwrap().to_string();

    let (status, _) = server
        .post(
            OUTSIDER,
            "/create-task",
            json!({"type": "shared", "list_id": list_id, "title": "Nope"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, tasks) = server.get(OWNER, &format!("/lists/{list_id}/tasks")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tasks[0]["list_name"], "Launch");

    let (status, _) = server
        .get(OUTSIDER, &format!("/lists/{list_id}/tasks"))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let update_url = server.url(&format!("/update-shared-task/{list_id}/{task_id}"));
    let response = server
        .client
        .put(&update_url)
        .bearer_auth(OWNER)
        .json(&json!({"status": "completed"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = server
        .client
        .put(&update_url)
        .bearer_auth(OUTSIDER)
        .json(&json!({"status": "todo"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let task_path = format!("/delete-shared-task/{list_id}/{task_id}");
    assert_eq!(
        server.delete(OUTSIDER, &task_path).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(server.delete(GUEST, &task_path).await, StatusCode::OK);
    let (_, tasks) = server.get(OWNER, &format!("/lists/{list_id}/tasks")).await;
    assert!(tasks.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn task_feed_includes_assigned_list_tasks() {
    let server = TestServer::start().await;
    let list_id = server.create_list("Launch").await;
    server.add_guest(&list_id).await;

    for (title, assignee) in [("For Bob", "Bob@Example.com"), ("For Tom", "Tom")] {
        let (status, _) = server
            .post(
                OWNER,
                "/create-task",
                json!({"type": "shared", "list_id": list_id, "title": title, "assignee": assignee}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, feed) = server.get(GUEST, "/tasks").await;
    let titles: Vec<&str> = feed
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["For Bob"]);
}

#[tokio::test]
async fn only_owner_deletes_list() {
    let server = TestServer::start().await;
    let list_id = server.create_list("Launch").await;
    server.add_guest(&list_id).await;

    assert_eq!(
        server
            .delete(GUEST, &format!("/delete-list/{list_id}"))
            .await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        server
            .delete(OWNER, &format!("/delete-list/{list_id}"))
            .await,
        StatusCode::OK
    );

    let (_, lists) = server.get(GUEST, "/lists").await;
    assert!(lists.as_array().unwrap().is_empty());
    let (status, _) = server.get(OWNER, &format!("/lists/{list_id}/tasks")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
