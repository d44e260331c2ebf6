//! One-time verification codes.
//!
//! A code is a uniformly random 6-digit string stored under
//! `(purpose, email)` for [`CODE_TTL`]. Issuing overwrites any live code for
//! the key. Consuming compares the candidate exactly; a match deletes the
//! code, a mismatch leaves it in place.
//!
//! Expiry is judged against an injected [`Clock`] so tests can move time
//! forward. Backends are free to evict expired entries on their own.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use rand::Rng;
use thiserror::Error;

use sundry_core::VerificationPurpose;

use crate::db::RepositoryError;

/// How long an issued code stays valid.
pub const CODE_TTL: Duration = Duration::from_secs(300);

/// Upper bound on live codes held by [`MokaCodeStore`].
const MAX_LIVE_CODES: u64 = 100_000;

// =============================================================================
// Clock
// =============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Start at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let delta = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst))
            .unwrap_or(DateTime::UNIX_EPOCH)
    }
}

// =============================================================================
// Store
// =============================================================================

/// Errors from a code store backend.
#[derive(Debug, Error)]
pub enum CodeStoreError {
    /// The backing database failed.
    #[error("code store database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CodeStoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Key under which a code is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodeKey {
    pub purpose: VerificationPurpose,
    /// Exactly as submitted; keys are case-sensitive.
    pub email: String,
}

impl CodeKey {
    #[must_use]
    pub fn new(purpose: VerificationPurpose, email: &str) -> Self {
        Self {
            purpose,
            email: email.to_owned(),
        }
    }
}

/// A stored code and when it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl IssuedCode {
    /// Whether the code is still usable at `now`.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Result of trying to consume a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The candidate matched; the code is gone.
    Consumed,
    /// A live code exists but the candidate did not match. The code is kept.
    Mismatch,
    /// No live code for the key.
    Missing,
}

impl ConsumeOutcome {
    #[must_use]
    pub const fn is_consumed(self) -> bool {
        matches!(self, Self::Consumed)
    }
}

/// Expiring key-value storage for codes.
#[async_trait]
pub trait CodeStore: Send + Sync {
    /// Store `issued` under `key`, replacing whatever was there.
    async fn put(&self, key: CodeKey, issued: IssuedCode) -> Result<(), CodeStoreError>;

    /// Atomically delete the code under `key` if it is live at `now` and
    /// equals `candidate`.
    async fn take_if_matches(
        &self,
        key: &CodeKey,
        candidate: &str,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, CodeStoreError>;
}

/// In-process code store backed by a `moka` cache.
///
/// Suitable for a single server instance. Use `PgCodeStore` when several
/// instances share traffic.
#[derive(Clone)]
pub struct MokaCodeStore {
    cache: Cache<CodeKey, IssuedCode>,
}

impl MokaCodeStore {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_LIVE_CODES)
            .time_to_live(CODE_TTL)
            .build();

        Self { cache }
    }
}

impl Default for MokaCodeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodeStore for MokaCodeStore {
    async fn put(&self, key: CodeKey, issued: IssuedCode) -> Result<(), CodeStoreError> {
        self.cache.insert(key, issued).await;
        Ok(())
    }

    async fn take_if_matches(
        &self,
        key: &CodeKey,
        candidate: &str,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, CodeStoreError> {
        let result = self
            .cache
            .entry_by_ref(key)
            .and_compute_with(|entry| {
                let op = match entry {
                    None => Op::Nop,
                    Some(entry) if !entry.value().is_live(now) => Op::Remove,
                    Some(entry) if entry.value().code == candidate => Op::Remove,
                    Some(_) => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        let outcome = match result {
            CompResult::Removed(entry) if entry.value().is_live(now) => ConsumeOutcome::Consumed,
            CompResult::Unchanged(_) => ConsumeOutcome::Mismatch,
            _ => ConsumeOutcome::Missing,
        };

        Ok(outcome)
    }
}

// =============================================================================
// Service
// =============================================================================

/// Issues and consumes verification codes.
#[derive(Clone)]
pub struct VerificationCodes {
    store: Arc<dyn CodeStore>,
    clock: Arc<dyn Clock>,
}

impl VerificationCodes {
    /// Create the service over a backend and a clock.
    #[must_use]
    pub fn new(store: Arc<dyn CodeStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// In-memory codes on the wall clock.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MokaCodeStore::new()), Arc::new(SystemClock))
    }

    /// Issue a fresh code for `(purpose, email)`, replacing any live one.
    ///
    /// # Errors
    ///
    /// Returns `CodeStoreError` if the backend cannot store the code.
    pub async fn issue(
        &self,
        purpose: VerificationPurpose,
        email: &str,
    ) -> Result<String, CodeStoreError> {
        let code = generate_verification_code();
        let expires_at = self.clock.now() + ttl_delta();

        self.store
            .put(
                CodeKey::new(purpose, email),
                IssuedCode {
                    code: code.clone(),
                    expires_at,
                },
            )
            .await?;

        Ok(code)
    }

    /// Try to use a code. A match burns it; anything else leaves storage as is.
    ///
    /// # Errors
    ///
    /// Returns `CodeStoreError` if the backend cannot be reached.
    pub async fn consume(
        &self,
        purpose: VerificationPurpose,
        email: &str,
        candidate: &str,
    ) -> Result<ConsumeOutcome, CodeStoreError> {
        self.store
            .take_if_matches(&CodeKey::new(purpose, email), candidate, self.clock.now())
            .await
    }
}

fn ttl_delta() -> TimeDelta {
    TimeDelta::from_std(CODE_TTL).unwrap_or(TimeDelta::MAX)
}

/// Generate a uniformly random 6-digit code, zero-padded.
#[must_use]
pub fn generate_verification_code() -> String {
    let code: u32 = rand::rng().random_range(0..1_000_000);
    format!("{code:06}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn codes_with_clock() -> (VerificationCodes, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let codes = VerificationCodes::new(Arc::new(MokaCodeStore::new()), clock.clone());
        (codes, clock)
    }

    #[test]
    fn test_generate_verification_code_format() {
        for _ in 0..100 {
            let code = generate_verification_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_issued_code_is_consumed_exactly_once() {
        let (codes, _) = codes_with_clock();
        let purpose = VerificationPurpose::Registration;
        let code = codes.issue(purpose, "a@b.co").await.unwrap();

        let first = codes.consume(purpose, "a@b.co", &code).await.unwrap();
        let second = codes.consume(purpose, "a@b.co", &code).await.unwrap();

        assert_eq!(first, ConsumeOutcome::Consumed);
        assert_eq!(second, ConsumeOutcome::Missing);
    }

    #[tokio::test]
    async fn test_wrong_code_keeps_stored_code() {
        let (codes, _) = codes_with_clock();
        let purpose = VerificationPurpose::PasswordReset;
        let code = codes.issue(purpose, "a@b.co").await.unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };

        let miss = codes.consume(purpose, "a@b.co", wrong).await.unwrap();
        let hit = codes.consume(purpose, "a@b.co", &code).await.unwrap();

        assert_eq!(miss, ConsumeOutcome::Mismatch);
        assert_eq!(hit, ConsumeOutcome::Consumed);
    }

    #[tokio::test]
    async fn test_code_expires_after_ttl() {
        let (codes, clock) = codes_with_clock();
        let purpose = VerificationPurpose::Registration;
        let code = codes.issue(purpose, "a@b.co").await.unwrap();

        clock.advance(CODE_TTL);

        let outcome = codes.consume(purpose, "a@b.co", &code).await.unwrap();
        assert_eq!(outcome, ConsumeOutcome::Missing);
    }

    #[tokio::test]
    async fn test_code_is_live_just_before_ttl() {
        let (codes, clock) = codes_with_clock();
        let purpose = VerificationPurpose::Registration;
        let code = codes.issue(purpose, "a@b.co").await.unwrap();

        clock.advance(CODE_TTL - Duration::from_secs(1));

        let outcome = codes.consume(purpose, "a@b.co", &code).await.unwrap();
        assert_eq!(outcome, ConsumeOutcome::Consumed);
    }

    #[tokio::test]
    async fn test_reissue_replaces_previous_code() {
        let (codes, _) = codes_with_clock();
        let purpose = VerificationPurpose::Registration;
        let first = codes.issue(purpose, "a@b.co").await.unwrap();
        let mut second = codes.issue(purpose, "a@b.co").await.unwrap();
        while second == first {
            second = codes.issue(purpose, "a@b.co").await.unwrap();
        }

        let stale = codes.consume(purpose, "a@b.co", &first).await.unwrap();
        let fresh = codes.consume(purpose, "a@b.co", &second).await.unwrap();

        assert_eq!(stale, ConsumeOutcome::Mismatch);
        assert_eq!(fresh, ConsumeOutcome::Consumed);
    }

    #[tokio::test]
    async fn test_purposes_do_not_share_codes() {
        let (codes, _) = codes_with_clock();
        let code = codes
            .issue(VerificationPurpose::Registration, "a@b.co")
            .await
            .unwrap();

        let outcome = codes
            .consume(VerificationPurpose::PasswordReset, "a@b.co", &code)
            .await
            .unwrap();

        assert_eq!(outcome, ConsumeOutcome::Missing);
    }

    #[tokio::test]
    async fn test_email_keys_are_case_sensitive() {
        let (codes, _) = codes_with_clock();
        let purpose = VerificationPurpose::Registration;
        let code = codes.issue(purpose, "a@b.co").await.unwrap();

        let outcome = codes.consume(purpose, "A@b.co", &code).await.unwrap();
        assert_eq!(outcome, ConsumeOutcome::Missing);
    }

    #[tokio::test]
    async fn test_concurrent_consumers_only_one_wins() {
        let (codes, _) = codes_with_clock();
        let purpose = VerificationPurpose::Registration;
        let code = codes.issue(purpose, "a@b.co").await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let codes = codes.clone();
                let code = code.clone();
                tokio::spawn(async move { codes.consume(purpose, "a@b.co", &code).await })
            })
            .collect();

        let mut consumed = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_consumed() {
                consumed += 1;
            }
        }

        assert_eq!(consumed, 1);
    }
}
