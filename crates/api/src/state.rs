//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{ApiConfig, CodeStoreBackend};
use crate::db::{MemoryStore, PgCodeStore, Stores};
use crate::services::auth::AuthService;
use crate::services::codes::{SystemClock, VerificationCodes};
use crate::services::delivery::{CodeDelivery, LogDelivery};
use crate::services::orders::OrderService;
use crate::services::tokens::TokenService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the stores, the code service and the token service.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    stores: Stores,
    codes: VerificationCodes,
    delivery: Arc<dyn CodeDelivery>,
    tokens: TokenService,
    pool: Option<PgPool>,
}

impl AppState {
    /// Assemble state from its parts.
    ///
    /// `pool` is only used by the readiness probe; pass `None` when running
    /// without a database.
    #[must_use]
    pub fn new(
        stores: Stores,
        codes: VerificationCodes,
        delivery: Arc<dyn CodeDelivery>,
        tokens: TokenService,
        pool: Option<PgPool>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                stores,
                codes,
                delivery,
                tokens,
                pool,
            }),
        }
    }

    /// Production state: `PostgreSQL` stores and log-only code delivery.
    #[must_use]
    pub fn from_config(config: &ApiConfig, pool: PgPool) -> Self {
        let codes = match config.code_store {
            CodeStoreBackend::Memory => VerificationCodes::in_memory(),
            CodeStoreBackend::Postgres => VerificationCodes::new(
                Arc::new(PgCodeStore::new(pool.clone())),
                Arc::new(SystemClock),
            ),
        };
        let tokens = TokenService::new(
            &config.jwt_secret,
            config.access_token_ttl,
            config.refresh_token_ttl,
        );

        Self::new(
            Stores::postgres(&pool),
            codes,
            Arc::new(LogDelivery),
            tokens,
            Some(pool),
        )
    }

    /// Database-free state over a shared [`MemoryStore`].
    #[must_use]
    pub fn in_memory(
        store: &Arc<MemoryStore>,
        codes: VerificationCodes,
        delivery: Arc<dyn CodeDelivery>,
        tokens: TokenService,
    ) -> Self {
        Self::new(Stores::from_memory(store), codes, delivery, tokens, None)
    }

    /// Credential workflows for one request.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(
            self.inner.stores.users.as_ref(),
            &self.inner.codes,
            self.inner.delivery.as_ref(),
        )
    }

    /// Order operations for one request.
    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(self.inner.stores.orders.as_ref())
    }

    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    /// Get a reference to the token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Get the database pool, if the state has one.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }
}
