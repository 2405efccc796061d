#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use cabal_core::test_helpers::{ManualClock, seeded_registry};
use cabal_server::config::ServerConfig;
use cabal_server::router;
use cabal_server::state::AppState;

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with a seeded registry and a manual clock.
    pub async fn new() -> Self {
        let (registry, clock) = seeded_registry(7);
        let state = AppState::with_registry(ServerConfig::default(), registry);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            state,
            clock,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }
}

/// Thin JSON client over `reqwest` for the room API.
pub struct ApiClient {
    pub http: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(server: &TestServer) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: server.base_url(),
        }
    }

    /// POST `body` and return (status, json body).
    pub async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .http
            .post(format!("{}{path}", self.base))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    pub async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self
            .http
            .get(format!("{}{path}", self.base))
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    /// Create a room; returns (code, host player id).
    pub async fn create_room(&self, name: &str) -> (String, String) {
        let (status, body) = self.post("/api/rooms", json!({ "name": name })).await;
        assert_eq!(status, 200, "create failed: {body}");
        (
            body["code"].as_str().unwrap().to_string(),
            body["playerId"].as_str().unwrap().to_string(),
        )
    }

    pub async fn join_room(&self, code: &str, name: &str) -> String {
        let (status, body) = self
            .post("/api/rooms/join", json!({ "code": code, "name": name }))
            .await;
        assert_eq!(status, 200, "join failed: {body}");
        body["playerId"].as_str().unwrap().to_string()
    }

    pub async fn state(&self, code: &str, player_id: &str) -> Value {
        let (status, body) = self
            .get(&format!("/api/rooms/{code}?playerId={player_id}"))
            .await;
        assert_eq!(status, 200, "state failed: {body}");
        body
    }

    /// Create a room with `n` players and start the game. Returns the code
    /// and player ids in join order.
    pub async fn started_game(&self, n: usize) -> (String, Vec<String>) {
        let (code, host) = self.create_room("Player1").await;
        let mut ids = vec![host];
        for i in 2..=n {
            ids.push(self.join_room(&code, &format!("Player{i}")).await);
        }
        let (status, body) = self
            .post(&format!("/api/rooms/{code}/start"), json!({}))
            .await;
        assert_eq!(status, 200, "start failed: {body}");
        (code, ids)
    }
}
