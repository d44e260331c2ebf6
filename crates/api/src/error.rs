//! Unified error handling with Sentry integration.
//!
//! Every domain error reports an [`ErrorKind`]. [`AppError`] is the only
//! place that turns a kind into an HTTP status and decides what the client
//! sees. Server-side failures are captured to Sentry before responding and
//! never leak their details.

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::orders::OrderError;
use crate::services::tokens::TokenError;

/// Error taxonomy shared by all layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input.
    Validation,
    /// Missing or invalid credentials.
    Auth,
    /// Entity absent or not owned by the caller.
    NotFound,
    /// Uniqueness violation.
    Conflict,
    /// Storage failure.
    Storage,
    /// Anything else that is our fault.
    Internal,
}

impl ErrorKind {
    /// HTTP status for this kind.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Validation | Self::Conflict => StatusCode::BAD_REQUEST,
            Self::Auth => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Storage | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Generic client message, used whenever details must not be exposed.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Validation => "Invalid request",
            Self::Auth => "Authentication credentials were not provided or are invalid",
            Self::NotFound => "Not found",
            Self::Conflict => "Conflicting data",
            Self::Storage => "Database error, please try again later",
            Self::Internal => "Internal server error",
        }
    }

    /// Whether errors of this kind are our fault and worth reporting.
    #[must_use]
    pub const fn is_server_error(self) -> bool {
        matches!(self, Self::Storage | Self::Internal)
    }
}

/// Application-level error type. All route handlers return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Credential workflow failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Token could not be issued or verified.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Taxonomy bucket of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(err) => err.kind(),
            Self::Order(err) => err.kind(),
            Self::Token(TokenError::Encode(_)) | Self::Internal(_) => ErrorKind::Internal,
            Self::Token(_) | Self::Unauthorized(_) => ErrorKind::Auth,
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => ErrorKind::NotFound,
            Self::Database(RepositoryError::Conflict(_)) => ErrorKind::Conflict,
            Self::Database(_) => ErrorKind::Storage,
            Self::BadRequest(_) => ErrorKind::Validation,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Auth(err) => err.client_message(),
            Self::Order(err) => err.client_message().to_owned(),
            Self::Token(TokenError::Encode(_)) | Self::Internal(_) | Self::Database(_) => {
                self.kind().default_message().to_owned()
            }
            Self::Token(_) => "Token is invalid or expired".to_owned(),
            Self::BadRequest(msg) | Self::Unauthorized(msg) | Self::NotFound(msg) => msg.clone(),
        }
    }

    /// Field-level validation detail, keyed by path.
    fn field_errors(&self) -> Option<BTreeMap<String, Vec<String>>> {
        let Self::Order(OrderError::InvalidOrderData(errors)) = self else {
            return None;
        };

        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for error in errors {
            map.entry(error.path.clone())
                .or_default()
                .push(error.message.clone());
        }
        Some(map)
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<BTreeMap<String, Vec<String>>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();

        // Capture server errors to Sentry
        if kind.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = ErrorBody {
            message: self.client_message(),
            errors: self.field_errors(),
        };

        (kind.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called by the bearer-token extractor so errors are associated with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}
