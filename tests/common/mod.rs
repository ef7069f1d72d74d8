#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use bistro_api::auth::IdentityClaim;
use bistro_api::config::{test_config, AppConfig};
use bistro_api::database::{Collection, DocumentStore, MemoryDocumentStore};
use bistro_api::services::{PaymentError, PaymentGateway, PaymentIntent};
use bistro_api::AppState;

pub const SECRET: &str = "test-secret";
pub const CLIENT_SECRET: &str = "pi_test_secret_123";

/// Records every intent request and answers with a fixed client secret
#[derive(Default)]
pub struct FakeGateway {
    pub requests: Mutex<Vec<(i64, String)>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_intent(&self, amount_cents: i64, currency: &str) -> Result<PaymentIntent, PaymentError> {
        self.requests
            .lock()
            .unwrap()
            .push((amount_cents, currency.to_string()));
        Ok(PaymentIntent {
            client_secret: CLIENT_SECRET.to_string(),
        })
    }
}

/// In-process application driven with `oneshot`
pub struct TestApp {
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryDocumentStore::new()))
    }

    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self::build(test_config(SECRET), store)
    }

    pub fn build(config: AppConfig, store: Arc<dyn DocumentStore>) -> Self {
        let gateway = Arc::new(FakeGateway::default());
        let state = AppState::new(config, store, gateway.clone()).expect("state");
        let router = bistro_api::app(state.clone());
        Self { state, gateway, router }
    }

    pub fn token_for(&self, email: &str) -> String {
        self.state.tokens.issue(&IdentityClaim::new(email)).expect("issue token")
    }

    /// Token whose lifetime ran out a few seconds ago
    pub fn expired_token_for(&self, email: &str) -> String {
        let issued_at = chrono::Utc::now() - self.state.tokens.ttl() - chrono::Duration::seconds(5);
        self.state
            .tokens
            .issue_at(&IdentityClaim::new(email), issued_at)
            .expect("issue token")
    }

    /// Insert a user record directly, bypassing the public role stripping
    pub async fn seed_user(&self, email: &str, role: Option<&str>) -> Uuid {
        let mut fields = json!({ "email": email, "name": "Test User", "emailVerified": true });
        if let Some(role) = role {
            fields["role"] = json!(role);
        }
        let fields = fields.as_object().cloned().expect("object");
        self.state
            .store
            .insert_one(Collection::Users, fields)
            .await
            .expect("seed user")
            .inserted_id
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }
}

/// The real binary on a free port, memory store, fixed secret
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    pub fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_bistro-api"))
            .arg("serve")
            .env("PORT", port.to_string())
            .env("STORE_BACKEND", "memory")
            .env("ACCESS_TOKEN_SECRET", SECRET)
            .env("APP_ENV", "development")
            .env_remove("DATABASE_URL")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
