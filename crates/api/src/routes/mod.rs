//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                  - Liveness check
//! GET    /health/ready            - Readiness check (database ping)
//!
//! # Accounts
//! POST   /register                - Create an account (needs a registration code)
//! POST   /login                   - Exchange email/password for tokens
//! POST   /send_verification_code  - Issue a one-time code
//! POST   /reset_password          - Set a new password (needs a reset code)
//! POST   /token/refresh           - Trade a refresh token for an access token
//! POST   /token/verify            - Check a token
//!
//! # Catalog
//! GET    /products                - Product listing
//!
//! # Orders (bearer token)
//! GET    /orders                  - The caller's orders
//! POST   /orders                  - Place an order
//! DELETE /orders/{id}/cancel      - Cancel one of the caller's orders
//!
//! # User (bearer token)
//! GET    /user/info               - Display name and email
//! PUT    /user/update_name        - Change display name
//! ```
//!
//! Trailing slashes are accepted on every path.

pub mod auth;
pub mod health;
pub mod orders;
pub mod products;
pub mod user;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use serde::Serialize;

use crate::state::AppState;

/// Standard success envelope: a message and optional payload.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl ApiResponse<()> {
    /// A response with only a message.
    #[must_use]
    pub const fn message(message: &'static str) -> Self {
        Self {
            message,
            data: None,
        }
    }
}

impl<T> ApiResponse<T> {
    /// A response carrying `data`.
    #[must_use]
    pub const fn with_data(message: &'static str, data: T) -> Self {
        Self {
            message,
            data: Some(data),
        }
    }
}

/// Create the account and token routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/send_verification_code", post(auth::send_verification_code))
        .route("/reset_password", post(auth::reset_password))
        .route("/token/refresh", post(auth::refresh_token))
        .route("/token/verify", post(auth::verify_token))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/{id}/cancel", delete(orders::cancel))
}

/// Create the user profile routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/info", get(user::info))
        .route("/update_name", put(user::update_name))
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(auth_routes())
        .route("/products", get(products::index))
        .nest("/orders", order_routes())
        .nest("/user", user_routes())
}
