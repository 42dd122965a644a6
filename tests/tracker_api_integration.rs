use customer_tracker::{create_app, AppState, InMemoryStore, Seeder};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::time::{timeout, Duration};

// Test client wrapper for making API calls as a given manager
struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client.get(self.url(path)).send().await
    }

    async fn post_as(
        &self,
        login: &str,
        path: &str,
        json: Value,
    ) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(self.url(path))
            .header("x-user-id", login)
            .header("x-user-password", login)
            .json(&json)
            .send()
            .await
    }

    async fn put_as(
        &self,
        login: &str,
        path: &str,
        if_match: Option<&str>,
        json: Value,
    ) -> reqwest::Result<reqwest::Response> {
        let mut request = self
            .client
            .put(self.url(path))
            .header("x-user-id", login)
            .header("x-user-password", login)
            .json(&json);
        if let Some(etag) = if_match {
            request = request.header("if-match", etag);
        }
        request.send().await
    }

    async fn delete_as(&self, login: &str, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .delete(self.url(path))
            .header("x-user-id", login)
            .header("x-user-password", login)
            .send()
            .await
    }
}

/// Seed an in-memory store the way startup does, then serve it on an
/// ephemeral port
async fn spawn_seeded_server() -> TestClient {
    let store = Arc::new(InMemoryStore::new());
    Seeder::with_reference_data(&*store)
        .run()
        .await
        .expect("seeding failed");

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let address = listener.local_addr().expect("no local address");
    let app = create_app(AppState::new(store), None);

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server failed");
    });

    TestClient::new(format!("http://{}", address))
}

async fn tracker_id_for(client: &TestClient, customer: &str) -> i64 {
    let page: Value = client
        .get("/api/trackers?size=100")
        .await
        .expect("list failed")
        .json()
        .await
        .expect("invalid json");

    page["items"]
        .as_array()
        .expect("items missing")
        .iter()
        .find(|t| t["customer_name"] == customer)
        .and_then(|t| t["id"].as_i64())
        .unwrap_or_else(|| panic!("tracker for {} not found", customer))
}

fn payload(customer: &str, product: &str, status: &str) -> Value {
    json!({
        "customer_name": customer,
        "product_name": product,
        "current_status": status
    })
}

#[tokio::test]
async fn test_seeded_data_is_served() {
    let client = spawn_seeded_server().await;

    let health = client.get("/health").await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let managers: Value = client.get("/api/managers").await.unwrap().json().await.unwrap();
    let names: Vec<&str> = managers
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["test", "baig", "bharat"]);
    assert!(managers[0].get("password_hash").is_none());

    let page: Value = client
        .get("/api/trackers?page=0&size=4")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["items"].as_array().unwrap().len(), 4);
    assert_eq!(page["page"]["total_elements"], 9);
    assert_eq!(page["page"]["total_pages"], 3);
    assert_eq!(page["items"][0]["customer_name"], "Bank Of America");
    assert_eq!(page["items"][0]["manager"]["name"], "test");
    assert_eq!(page["items"][3]["manager"]["name"], "baig");
    assert_eq!(page["links"]["first"], "/api/trackers?page=0&size=4");
    assert_eq!(page["links"]["next"], "/api/trackers?page=1&size=4");
    assert_eq!(page["links"]["last"], "/api/trackers?page=2&size=4");
    assert!(page["links"]["prev"].is_null());
}

#[tokio::test]
async fn test_create_requires_credentials_and_assigns_caller() {
    let client = spawn_seeded_server().await;

    let anonymous = client
        .client
        .post(client.url("/api/trackers"))
        .json(&payload("Citi", "Tokenization", "RFP"))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let created = client
        .post_as("bharat", "/api/trackers", payload("Citi", "Tokenization", "RFP"))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    assert_eq!(
        created.headers().get("etag").and_then(|v| v.to_str().ok()),
        Some("\"0\"")
    );

    let body: Value = created.json().await.unwrap();
    assert_eq!(body["manager"]["name"], "bharat");
    assert_eq!(body["version"], 0);
}

#[tokio::test]
async fn test_only_owner_may_update_or_delete() {
    let client = spawn_seeded_server().await;
    let id = tracker_id_for(&client, "JP Morgan").await;
    let path = format!("/api/trackers/{}", id);

    let denied = client
        .put_as("test", &path, None, payload("JP Morgan", "DebitCard", "Lost"))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let denied = client.delete_as("bharat", &path).await.unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let updated = client
        .put_as("baig", &path, Some("\"0\""), payload("JP Morgan", "DebitCard", "Won"))
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);
    let body: Value = updated.json().await.unwrap();
    assert_eq!(body["current_status"], "Won");
    assert_eq!(body["version"], 1);

    let deleted = client.delete_as("baig", &path).await.unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let missing = client.get(&path).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stale_update_is_rejected() {
    let client = spawn_seeded_server().await;
    let id = tracker_id_for(&client, "Capital One").await;
    let path = format!("/api/trackers/{}", id);

    let fetched = client.get(&path).await.unwrap();
    let etag = fetched
        .headers()
        .get("etag")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .expect("etag missing");

    let first = client
        .put_as("test", &path, Some(&etag), payload("Capital One", "3D Secure", "Live"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let stale = client
        .put_as("test", &path, Some(&etag), payload("Capital One", "3D Secure", "Paused"))
        .await
        .unwrap();
    assert_eq!(stale.status(), StatusCode::PRECONDITION_FAILED);
}

/// Read the event stream until `needle` shows up
async fn read_until(events: &mut reqwest::Response, needle: &str) -> String {
    let mut seen = String::new();
    while !seen.contains(needle) {
        let chunk = timeout(Duration::from_secs(5), events.chunk())
            .await
            .unwrap_or_else(|_| panic!("no '{}' event within 5s; got: {}", needle, seen))
            .expect("event stream failed")
            .expect("event stream ended");
        seen.push_str(&String::from_utf8_lossy(&chunk));
    }
    seen
}

#[tokio::test]
async fn test_tracker_writes_are_streamed_as_events() {
    let client = spawn_seeded_server().await;

    let mut events = client.get("/api/events").await.unwrap();
    assert_eq!(events.status(), StatusCode::OK);
    assert_eq!(
        events
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );
    read_until(&mut events, "event: connected").await;

    let created: Value = client
        .post_as("test", "/api/trackers", payload("Citi", "Tokenization", "RFP"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_i64().unwrap();

    let expected = format!("data: {{\"kind\":\"newTracker\",\"id\":{}}}", id);
    let seen = read_until(&mut events, &expected).await;
    assert!(seen.contains("event: newTracker"));

    let path = format!("/api/trackers/{}", id);
    let deleted = client.delete_as("test", &path).await.unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    read_until(&mut events, "event: deleteTracker").await;
}
