//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::error::ErrorKind;
use crate::services::codes::CodeStoreError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// One or more required fields are missing or empty.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// The request is malformed in some other way.
    #[error("{0}")]
    InvalidRequest(String),

    /// Email does not look like an email address.
    #[error("invalid email format")]
    InvalidEmailShape,

    /// Password too weak.
    #[error("password must be at least 8 characters and contain letters and digits")]
    WeakPassword,

    /// No live code for this email and purpose.
    #[error("verification code is missing or expired")]
    CodeMissingOrExpired,

    /// A live code exists but does not match.
    #[error("verification code is incorrect")]
    CodeMismatch,

    /// Email already belongs to an account.
    #[error("email is already registered")]
    EmailAlreadyRegistered,

    /// The account insert hit the unique constraint after the existence check passed.
    #[error("registration conflicted with existing user data")]
    StorageConflict,

    /// No account for this email.
    #[error("user not found")]
    UserNotFound,

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Display name blank or too long.
    #[error("invalid display name: {0}")]
    InvalidDisplayName(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Code store error.
    #[error("code store error: {0}")]
    CodeStore(#[from] CodeStoreError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Taxonomy bucket for transport mapping.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingFields(_)
            | Self::InvalidRequest(_)
            | Self::InvalidEmailShape
            | Self::WeakPassword
            | Self::CodeMissingOrExpired
            | Self::CodeMismatch
            | Self::InvalidCredentials
            | Self::InvalidDisplayName(_) => ErrorKind::Validation,
            Self::EmailAlreadyRegistered | Self::StorageConflict => ErrorKind::Conflict,
            Self::UserNotFound => ErrorKind::NotFound,
            Self::Repository(_) | Self::CodeStore(_) => ErrorKind::Storage,
            Self::PasswordHash => ErrorKind::Internal,
        }
    }

    /// Message shown to the client.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::MissingFields(fields) => {
                format!("Missing required fields: {}", fields.join(", "))
            }
            Self::InvalidRequest(msg) => msg.clone(),
            Self::InvalidEmailShape => "Invalid email format".to_owned(),
            Self::WeakPassword => {
                "Password must be at least 8 characters and contain both letters and digits"
                    .to_owned()
            }
            Self::CodeMissingOrExpired => "Verification code is missing or expired".to_owned(),
            Self::CodeMismatch => "Verification code is incorrect".to_owned(),
            Self::EmailAlreadyRegistered => "This email is already registered".to_owned(),
            Self::StorageConflict => "Registration failed due to conflicting user data".to_owned(),
            Self::UserNotFound => "User not found".to_owned(),
            Self::InvalidCredentials => "Invalid email or password".to_owned(),
            Self::InvalidDisplayName(reason) => reason.clone(),
            Self::Repository(_) | Self::CodeStore(_) | Self::PasswordHash => {
                self.kind().default_message().to_owned()
            }
        }
    }
}
