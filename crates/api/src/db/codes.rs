//! Verification codes shared between server instances.
//!
//! Consumption is a single conditional `DELETE ... RETURNING`, so two
//! instances racing on the same code cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::services::codes::{CodeKey, CodeStore, CodeStoreError, ConsumeOutcome, IssuedCode};

/// `PostgreSQL` implementation of [`CodeStore`].
#[derive(Clone)]
pub struct PgCodeStore {
    pool: PgPool,
}

impl PgCodeStore {
    /// Create a new code store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete codes that expired before `now`.
    ///
    /// Expired rows are never returned by lookups; this only reclaims space.
    ///
    /// # Errors
    ///
    /// Returns `CodeStoreError` if the delete fails.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, CodeStoreError> {
        let result = sqlx::query("DELETE FROM shop.verification_codes WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CodeStore for PgCodeStore {
    async fn put(&self, key: CodeKey, issued: IssuedCode) -> Result<(), CodeStoreError> {
        sqlx::query(
            r"
            INSERT INTO shop.verification_codes (purpose, email, code, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (purpose, email)
            DO UPDATE SET code = EXCLUDED.code, expires_at = EXCLUDED.expires_at
            ",
        )
        .bind(key.purpose.as_str())
        .bind(&key.email)
        .bind(&issued.code)
        .bind(issued.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn take_if_matches(
        &self,
        key: &CodeKey,
        candidate: &str,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, CodeStoreError> {
        let taken: Option<(String,)> = sqlx::query_as(
            r"
            DELETE FROM shop.verification_codes
            WHERE purpose = $1 AND email = $2 AND code = $3 AND expires_at > $4
            RETURNING code
            ",
        )
        .bind(key.purpose.as_str())
        .bind(&key.email)
        .bind(candidate)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if taken.is_some() {
            return Ok(ConsumeOutcome::Consumed);
        }

        let live: Option<(String,)> = sqlx::query_as(
            r"
            SELECT code FROM shop.verification_codes
            WHERE purpose = $1 AND email = $2 AND expires_at > $3
            ",
        )
        .bind(key.purpose.as_str())
        .bind(&key.email)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(if live.is_some() {
            ConsumeOutcome::Mismatch
        } else {
            ConsumeOutcome::Missing
        })
    }
}
