//! Authentication service.
//!
//! Registration and password reset are gated by one-time verification
//! codes. Each operation runs its checks in a fixed order and stops at the
//! first failure, so clients always see the earliest problem.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use sundry_core::{Email, UserId, VerificationPurpose, validate_email_shape, validate_password_strength};

use crate::db::{NewUser, RepositoryError, UserStore};
use crate::models::user::{MAX_DISPLAY_NAME_LENGTH, User, display_name_for};
use crate::services::codes::{ConsumeOutcome, VerificationCodes};
use crate::services::delivery::CodeDelivery;

/// Authentication service.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
    codes: &'a VerificationCodes,
    delivery: &'a dyn CodeDelivery,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        users: &'a dyn UserStore,
        codes: &'a VerificationCodes,
        delivery: &'a dyn CodeDelivery,
    ) -> Self {
        Self {
            users,
            codes,
            delivery,
        }
    }

    // =========================================================================
    // Verification Codes
    // =========================================================================

    /// Issue a code for `email` and hand it to the delivery channel.
    ///
    /// Succeeds whether or not an account exists for `email`. `purpose`
    /// defaults to password reset.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRequest` if the email is empty or the
    /// purpose is unknown, `AuthError::CodeStore` if the code cannot be stored.
    pub async fn request_code(
        &self,
        email: Option<&str>,
        purpose: Option<&str>,
    ) -> Result<VerificationPurpose, AuthError> {
        let email = email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AuthError::InvalidRequest("Email is required".to_owned()))?;

        let purpose = match purpose {
            None => VerificationPurpose::default(),
            Some(raw) => raw.parse().map_err(|_| {
                AuthError::InvalidRequest(format!(
                    "Unknown verification purpose '{raw}', expected 'registration' or 'password_reset'"
                ))
            })?,
        };

        let code = self.codes.issue(purpose, email).await?;
        self.delivery.deliver(email, purpose, &code);

        tracing::info!(purpose = %purpose, "Verification code issued");
        Ok(purpose)
    }

    // =========================================================================
    // Registration & Login
    // =========================================================================

    /// Register a new account with a registration code.
    ///
    /// # Errors
    ///
    /// Checked in order: `MissingFields`, `InvalidEmailShape`, `WeakPassword`,
    /// `CodeMissingOrExpired`/`CodeMismatch`, `EmailAlreadyRegistered`. A
    /// concurrent registration that wins the insert race yields
    /// `StorageConflict`.
    pub async fn register(
        &self,
        email: Option<&str>,
        password: Option<&str>,
        code: Option<&str>,
    ) -> Result<User, AuthError> {
        let [email, password, code] =
            require([("email", email), ("password", password), ("code", code)])?;

        if !validate_email_shape(email) {
            return Err(AuthError::InvalidEmailShape);
        }
        let email = Email::parse(email).map_err(|_| AuthError::InvalidEmailShape)?;

        if !validate_password_strength(password) {
            return Err(AuthError::WeakPassword);
        }

        self.consume(VerificationPurpose::Registration, email.as_str(), code)
            .await?;

        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailAlreadyRegistered);
        }

        let password_hash = hash_password(password)?;
        let display_name = display_name_for(&email);

        let user = self
            .users
            .create(NewUser {
                email: &email,
                password_hash: &password_hash,
                display_name: &display_name,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::StorageConflict,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Replace a password using a password-reset code.
    ///
    /// The code is consumed before the account is looked up, so a valid code
    /// for an email without an account is burned and the call still fails
    /// with `UserNotFound`.
    ///
    /// # Errors
    ///
    /// Checked in order: `MissingFields`, `WeakPassword`,
    /// `CodeMissingOrExpired`/`CodeMismatch`, `UserNotFound`.
    pub async fn reset_password(
        &self,
        email: Option<&str>,
        code: Option<&str>,
        password: Option<&str>,
    ) -> Result<(), AuthError> {
        let [email, code, password] =
            require([("email", email), ("code", code), ("password", password)])?;

        if !validate_password_strength(password) {
            return Err(AuthError::WeakPassword);
        }

        self.consume(VerificationPurpose::PasswordReset, email, code)
            .await?;

        let email = Email::parse(email).map_err(|_| AuthError::UserNotFound)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let password_hash = hash_password(password)?;
        self.users
            .set_password_hash(user.id, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Get a user by ID, if the account still exists.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the lookup fails.
    pub async fn get_user(&self, user_id: UserId) -> Result<Option<User>, AuthError> {
        Ok(self.users.get_by_id(user_id).await?)
    }

    /// Change a user's display name.
    ///
    /// Surrounding whitespace is trimmed before the checks.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidDisplayName` if the name is blank or
    /// longer than 150 characters, `AuthError::UserNotFound` if the account
    /// is gone.
    pub async fn update_display_name(
        &self,
        user_id: UserId,
        display_name: Option<&str>,
    ) -> Result<User, AuthError> {
        let [display_name] = require([("display_name", display_name)])?;
        let display_name = display_name.trim();

        if display_name.is_empty() {
            return Err(AuthError::InvalidDisplayName(
                "Display name may not be blank".to_owned(),
            ));
        }
        if display_name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
            return Err(AuthError::InvalidDisplayName(format!(
                "Display name may not exceed {MAX_DISPLAY_NAME_LENGTH} characters"
            )));
        }

        self.users
            .set_display_name(user_id, display_name)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    async fn consume(
        &self,
        purpose: VerificationPurpose,
        email: &str,
        code: &str,
    ) -> Result<(), AuthError> {
        match self.codes.consume(purpose, email, code).await? {
            ConsumeOutcome::Consumed => Ok(()),
            ConsumeOutcome::Mismatch => Err(AuthError::CodeMismatch),
            ConsumeOutcome::Missing => Err(AuthError::CodeMissingOrExpired),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Unwrap named fields, collecting every missing or empty one.
fn require<'v, const N: usize>(
    fields: [(&'static str, Option<&'v str>); N],
) -> Result<[&'v str; N], AuthError> {
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| value.is_none_or(str::is_empty))
        .map(|(name, _)| *name)
        .collect();

    if !missing.is_empty() {
        return Err(AuthError::MissingFields(missing));
    }

    Ok(fields.map(|(_, value)| value.unwrap_or_default()))
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::MemoryStore;
    use crate::error::ErrorKind;
    use crate::services::codes::{CODE_TTL, ManualClock, MokaCodeStore};
    use crate::services::delivery::RecordingDelivery;

    struct Harness {
        users: MemoryStore,
        codes: VerificationCodes,
        clock: Arc<ManualClock>,
        delivery: RecordingDelivery,
    }

    impl Harness {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::default());
            Self {
                users: MemoryStore::new(),
                codes: VerificationCodes::new(Arc::new(MokaCodeStore::new()), clock.clone()),
                clock,
                delivery: RecordingDelivery::new(),
            }
        }

        fn auth(&self) -> AuthService<'_> {
            AuthService::new(&self.users, &self.codes, &self.delivery)
        }

        async fn code(&self, email: &str, purpose: VerificationPurpose) -> String {
            self.auth()
                .request_code(Some(email), Some(purpose.as_str()))
                .await
                .unwrap();
            self.delivery.last_code(email, purpose).unwrap()
        }

        async fn registered(&self, email: &str, password: &str) -> User {
            let code = self.code(email, VerificationPurpose::Registration).await;
            self.auth()
                .register(Some(email), Some(password), Some(&code))
                .await
                .unwrap()
        }
    }

    fn wrong(code: &str) -> &'static str {
        if code == "000000" { "000001" } else { "000000" }
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("abcdefg1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("abcdefg1", &hash).is_ok());
        assert!(matches!(
            verify_password("abcdefg2", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_require_lists_all_missing_fields() {
        let err = require([("email", Some("")), ("password", None), ("code", Some("1"))])
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingFields(ref f) if f == &["email", "password"]));
    }

    #[tokio::test]
    async fn test_request_code_defaults_to_password_reset() {
        let h = Harness::new();
        let purpose = h.auth().request_code(Some("a@b.co"), None).await.unwrap();
        assert_eq!(purpose, VerificationPurpose::PasswordReset);
        assert!(
            h.delivery
                .last_code("a@b.co", VerificationPurpose::PasswordReset)
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_request_code_rejects_empty_email_and_bad_purpose() {
        let h = Harness::new();
        assert!(matches!(
            h.auth().request_code(Some(""), None).await,
            Err(AuthError::InvalidRequest(_))
        ));
        assert!(matches!(
            h.auth().request_code(None, None).await,
            Err(AuthError::InvalidRequest(_))
        ));
        assert!(matches!(
            h.auth().request_code(Some("a@b.co"), Some("login")).await,
            Err(AuthError::InvalidRequest(_))
        ));
        assert!(h.delivery.all().is_empty());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let h = Harness::new();
        let user = h.registered("jane@example.com", "abcdefg1").await;
        assert_eq!(user.display_name, "jane");

        let logged_in = h.auth().login("jane@example.com", "abcdefg1").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            h.auth().login("jane@example.com", "wrongpass1").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            h.auth().login("nobody@example.com", "abcdefg1").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_check_order() {
        let h = Harness::new();
        let auth = h.auth();

        assert!(matches!(
            auth.register(Some("bad"), Some("weak"), None).await,
            Err(AuthError::MissingFields(_))
        ));
        assert!(matches!(
            auth.register(Some("bad"), Some("weak"), Some("123456")).await,
            Err(AuthError::InvalidEmailShape)
        ));
        assert!(matches!(
            auth.register(Some("a@b.co"), Some("weak"), Some("123456")).await,
            Err(AuthError::WeakPassword)
        ));
        assert!(matches!(
            auth.register(Some("a@b.co"), Some("abcdefg1"), Some("123456")).await,
            Err(AuthError::CodeMissingOrExpired)
        ));
    }

    #[tokio::test]
    async fn test_register_wrong_code_keeps_code_usable() {
        let h = Harness::new();
        let code = h.code("a@b.co", VerificationPurpose::Registration).await;

        assert!(matches!(
            h.auth()
                .register(Some("a@b.co"), Some("abcdefg1"), Some(wrong(&code)))
                .await,
            Err(AuthError::CodeMismatch)
        ));
        assert!(
            h.auth()
                .register(Some("a@b.co"), Some("abcdefg1"), Some(&code))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_register_rejects_reset_code() {
        let h = Harness::new();
        let code = h.code("a@b.co", VerificationPurpose::PasswordReset).await;
        assert!(matches!(
            h.auth()
                .register(Some("a@b.co"), Some("abcdefg1"), Some(&code))
                .await,
            Err(AuthError::CodeMissingOrExpired)
        ));
    }

    #[tokio::test]
    async fn test_register_expired_code() {
        let h = Harness::new();
        let code = h.code("a@b.co", VerificationPurpose::Registration).await;
        h.clock.advance(CODE_TTL);
        assert!(matches!(
            h.auth()
                .register(Some("a@b.co"), Some("abcdefg1"), Some(&code))
                .await,
            Err(AuthError::CodeMissingOrExpired)
        ));
    }

    #[tokio::test]
    async fn test_register_twice_conflicts() {
        let h = Harness::new();
        h.registered("a@b.co", "abcdefg1").await;

        let code = h.code("a@b.co", VerificationPurpose::Registration).await;
        assert!(matches!(
            h.auth()
                .register(Some("a@b.co"), Some("abcdefg2"), Some(&code))
                .await,
            Err(AuthError::EmailAlreadyRegistered)
        ));
    }

    /// Sees no existing users, so two registrations for one email both reach
    /// the insert, as when they race.
    struct RacingUsers(MemoryStore);

    #[async_trait::async_trait]
    impl UserStore for RacingUsers {
        async fn create(&self, user: NewUser<'_>) -> Result<User, RepositoryError> {
            UserStore::create(&self.0, user).await
        }

        async fn get_by_email(&self, _email: &Email) -> Result<Option<User>, RepositoryError> {
            Ok(None)
        }

        async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
            self.0.get_by_id(id).await
        }

        async fn get_password_hash(
            &self,
            email: &Email,
        ) -> Result<Option<(User, String)>, RepositoryError> {
            self.0.get_password_hash(email).await
        }

        async fn set_password_hash(
            &self,
            id: UserId,
            password_hash: &str,
        ) -> Result<(), RepositoryError> {
            self.0.set_password_hash(id, password_hash).await
        }

        async fn set_display_name(
            &self,
            id: UserId,
            display_name: &str,
        ) -> Result<User, RepositoryError> {
            self.0.set_display_name(id, display_name).await
        }
    }

    #[tokio::test]
    async fn test_register_insert_conflict_is_storage_conflict() {
        let users = RacingUsers(MemoryStore::new());
        let codes = VerificationCodes::new(
            Arc::new(MokaCodeStore::new()),
            Arc::new(ManualClock::default()),
        );
        let delivery = RecordingDelivery::new();
        let auth = AuthService::new(&users, &codes, &delivery);

        let mut results = Vec::new();
        for _ in 0..2 {
            auth.request_code(Some("race@b.co"), Some("registration"))
                .await
                .unwrap();
            let code = delivery
                .last_code("race@b.co", VerificationPurpose::Registration)
                .unwrap();
            results.push(
                auth.register(Some("race@b.co"), Some("abcdefg1"), Some(&code))
                    .await,
            );
        }

        assert!(results[0].is_ok());
        let err = results.pop().unwrap().unwrap_err();
        assert!(matches!(err, AuthError::StorageConflict));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_reset_password_flow() {
        let h = Harness::new();
        h.registered("a@b.co", "abcdefg1").await;
        let code = h.code("a@b.co", VerificationPurpose::PasswordReset).await;

        h.auth()
            .reset_password(Some("a@b.co"), Some(&code), Some("newpass99"))
            .await
            .unwrap();

        assert!(h.auth().login("a@b.co", "newpass99").await.is_ok());
        assert!(h.auth().login("a@b.co", "abcdefg1").await.is_err());

        // The code is single-use.
        assert!(matches!(
            h.auth()
                .reset_password(Some("a@b.co"), Some(&code), Some("another99"))
                .await,
            Err(AuthError::CodeMissingOrExpired)
        ));
    }

    #[tokio::test]
    async fn test_reset_check_order() {
        let h = Harness::new();
        let auth = h.auth();

        assert!(matches!(
            auth.reset_password(Some("a@b.co"), None, Some("x")).await,
            Err(AuthError::MissingFields(ref f)) if f == &["code"]
        ));
        assert!(matches!(
            auth.reset_password(Some("a@b.co"), Some("123456"), Some("short1")).await,
            Err(AuthError::WeakPassword)
        ));
        assert!(matches!(
            auth.reset_password(Some("a@b.co"), Some("123456"), Some("abcdefg1")).await,
            Err(AuthError::CodeMissingOrExpired)
        ));
    }

    #[tokio::test]
    async fn test_reset_burns_code_for_unknown_user() {
        let h = Harness::new();
        let code = h.code("ghost@b.co", VerificationPurpose::PasswordReset).await;

        assert!(matches!(
            h.auth()
                .reset_password(Some("ghost@b.co"), Some(&code), Some("abcdefg1"))
                .await,
            Err(AuthError::UserNotFound)
        ));

        // The account appears, but the code is already gone.
        h.registered("ghost@b.co", "abcdefg1").await;
        assert!(matches!(
            h.auth()
                .reset_password(Some("ghost@b.co"), Some(&code), Some("abcdefg2"))
                .await,
            Err(AuthError::CodeMissingOrExpired)
        ));
    }

    #[tokio::test]
    async fn test_update_display_name() {
        let h = Harness::new();
        let user = h.registered("a@b.co", "abcdefg1").await;

        let updated = h
            .auth()
            .update_display_name(user.id, Some("  Jane  "))
            .await
            .unwrap();
        assert_eq!(updated.display_name, "Jane");

        assert!(matches!(
            h.auth().update_display_name(user.id, Some("   ")).await,
            Err(AuthError::InvalidDisplayName(_))
        ));
        let long = "x".repeat(MAX_DISPLAY_NAME_LENGTH + 1);
        assert!(matches!(
            h.auth().update_display_name(user.id, Some(&long)).await,
            Err(AuthError::InvalidDisplayName(_))
        ));
        assert!(matches!(
            h.auth().update_display_name(UserId::new(999), Some("x")).await,
            Err(AuthError::UserNotFound)
        ));
    }
}
