//! Storage layer for the shop.
//!
//! # Schema: `shop`
//!
//! - `users` - accounts, unique email, Argon2 password hash
//! - `products` - catalog entries (`NUMERIC(10, 2)` price)
//! - `orders` - one row per order, owned by a user
//! - `order_items` - line items, cascade-deleted with their order
//! - `verification_codes` - one live code per `(purpose, email)`
//!
//! Handlers and services never touch `sqlx` directly. They go through the
//! store traits below, which have a `PostgreSQL` implementation for
//! production and [`MemoryStore`] for tests and local runs.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p sundry-cli -- migrate
//! ```

pub mod codes;
pub mod memory;
pub mod orders;
pub mod products;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use sundry_core::{Email, OrderId, Price, UserId};

pub use codes::PgCodeStore;
pub use memory::MemoryStore;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

use crate::models::order::{NewOrderItem, Order};
use crate::models::product::Product;
use crate::models::user::User;

/// Conflict detail when an order's owner no longer exists.
pub const OWNER_MISSING: &str = "order owner does not exist";

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a sqlx error, turning unique and foreign-key violations into
    /// [`Self::Conflict`].
    pub(crate) fn from_insert(err: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
        {
            return Self::Conflict(conflict.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

// =============================================================================
// Store Traits
// =============================================================================

/// Fields needed to create an account.
#[derive(Debug, Clone, Copy)]
pub struct NewUser<'a> {
    pub email: &'a Email,
    pub password_hash: &'a str,
    pub display_name: &'a str,
}

/// Account storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Fails with [`RepositoryError::Conflict`] if the email is taken.
    async fn create(&self, user: NewUser<'_>) -> Result<User, RepositoryError>;

    /// Look up a user by exact email.
    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Look up a user by id.
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Look up a user together with their password hash.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Overwrite a user's password hash.
    async fn set_password_hash(&self, id: UserId, password_hash: &str)
    -> Result<(), RepositoryError>;

    /// Overwrite a user's display name and return the updated user.
    async fn set_display_name(&self, id: UserId, display_name: &str)
    -> Result<User, RepositoryError>;
}

/// Order storage. Every call is scoped to the owning user.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// All orders owned by `user`, oldest first, items in insertion order.
    async fn list_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Persist an order and its items atomically.
    async fn create(&self, user: UserId, items: &[NewOrderItem])
    -> Result<Order, RepositoryError>;

    /// Delete an order owned by `user`. Returns `false` if no such order exists.
    async fn delete_for_user(&self, user: UserId, order: OrderId) -> Result<bool, RepositoryError>;
}

/// Catalog storage.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All products ordered by id.
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;

    /// Insert a catalog product.
    async fn create(&self, name: &str, price: Price) -> Result<Product, RepositoryError>;
}

/// The set of stores backing the application.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub orders: Arc<dyn OrderStore>,
    pub products: Arc<dyn ProductStore>,
}

impl Stores {
    /// `PostgreSQL`-backed stores sharing one pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            orders: Arc::new(OrderRepository::new(pool.clone())),
            products: Arc::new(ProductRepository::new(pool.clone())),
        }
    }

    /// Wrap an existing [`MemoryStore`] so callers can keep a handle to it.
    #[must_use]
    pub fn from_memory(store: &Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            orders: store.clone(),
            products: store.clone(),
        }
    }
}
