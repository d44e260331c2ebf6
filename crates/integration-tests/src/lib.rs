//! Integration tests for the Sundry shop API.
//!
//! # Running Tests
//!
//! ```bash
//! # HTTP tests (in-memory stores, no database needed)
//! cargo test -p sundry-integration-tests
//!
//! # PostgreSQL store tests
//! SUNDRY_TEST_DATABASE_URL=postgres://... cargo test -p sundry-integration-tests -- --ignored
//! ```
//!
//! [`TestApp::spawn`] binds the real router to an ephemeral port, backed by
//! a [`MemoryStore`], a manual clock and a delivery channel that records every
//! verification code instead of logging it.

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Response, StatusCode};
use secrecy::SecretString;
use serde_json::{Value, json};

use sundry_api::db::{MemoryStore, ProductStore};
use sundry_api::services::codes::{ManualClock, MokaCodeStore, VerificationCodes};
use sundry_api::services::delivery::RecordingDelivery;
use sundry_api::services::tokens::TokenService;
use sundry_api::state::AppState;
use sundry_core::{Price, VerificationPurpose};

/// Signing key used by every test server.
pub const TEST_JWT_SECRET: &str = "k3Jd9!xQ2@pL7#mN4$vB8%zR1^tY6&wE";

/// Password that passes the strength rules.
pub const TEST_PASSWORD: &str = "hunter22pass";

/// A running API server and handles into its in-memory backends.
pub struct TestApp {
    pub base_url: String,
    pub client: Client,
    pub store: Arc<MemoryStore>,
    pub delivery: Arc<RecordingDelivery>,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    /// Start a server on `127.0.0.1:0`.
    pub async fn spawn() -> Self {
        Self::spawn_with_token_ttl(Duration::from_secs(300)).await
    }

    /// Start a server whose access tokens live for `access_ttl`.
    pub async fn spawn_with_token_ttl(access_ttl: Duration) -> Self {
        let store = Arc::new(MemoryStore::new());
        let delivery = Arc::new(RecordingDelivery::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));

        let codes = VerificationCodes::new(Arc::new(MokaCodeStore::new()), clock.clone());
        let tokens = TokenService::new(
            &SecretString::from(TEST_JWT_SECRET),
            access_ttl,
            Duration::from_secs(86_400),
        );
        let state = AppState::in_memory(&store, codes, delivery.clone(), tokens);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            sundry_api::serve(
                listener,
                sundry_api::app(state),
                std::future::pending::<()>(),
            )
            .await
            .unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            client: Client::new(),
            store,
            delivery,
            clock,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POST a JSON body.
    pub async fn post(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    /// Request `code` for `email` and return what was delivered.
    pub async fn request_code(&self, email: &str, purpose: VerificationPurpose) -> String {
        let resp = self
            .post(
                "/send_verification_code",
                &json!({ "email": email, "purpose": purpose.as_str() }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        self.delivery.last_code(email, purpose).unwrap()
    }

    /// Register `email` with [`TEST_PASSWORD`].
    pub async fn register(&self, email: &str) {
        let code = self
            .request_code(email, VerificationPurpose::Registration)
            .await;
        let resp = self
            .post(
                "/register",
                &json!({ "email": email, "password": TEST_PASSWORD, "code": code }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    /// Log in and return the JSON body (tokens and display name).
    pub async fn login(&self, email: &str, password: &str) -> Value {
        let resp = self
            .post("/login", &json!({ "email": email, "password": password }))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        resp.json().await.unwrap()
    }

    /// Register `email` and return an access token for it.
    pub async fn signed_up(&self, email: &str) -> String {
        self.register(email).await;
        let body = self.login(email, TEST_PASSWORD).await;
        body["access_token"].as_str().unwrap().to_owned()
    }

    /// Add a catalog product.
    pub async fn add_product(&self, name: &str, price: &str) {
        let price: Price = price.parse().unwrap();
        self.store.create(name, price).await.unwrap();
    }
}

/// Read a response body as JSON.
pub async fn json_body(resp: Response) -> Value {
    resp.json().await.unwrap()
}
