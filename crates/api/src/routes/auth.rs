//! Account and token route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::extract::JsonBody;
use crate::routes::ApiResponse;
use crate::state::AppState;

// =============================================================================
// Registration
// =============================================================================

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "verification_code")]
    pub code: Option<String>,
}

/// Create an account.
///
/// POST /register
///
/// # Errors
///
/// Returns `AppError` for missing fields, bad email/password, a bad code,
/// an already registered email, or a storage failure.
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<()>>)> {
    state
        .auth()
        .register(
            req.email.as_deref(),
            req.password.as_deref(),
            req.code.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message("Registration successful")),
    ))
}

// =============================================================================
// Login
// =============================================================================

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Tokens handed out on login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub access_token: String,
    pub refresh_token: String,
    pub display_name: String,
}

/// Exchange email and password for a token pair.
///
/// POST /login
///
/// # Errors
///
/// Returns `AppError` (400) for unknown email or wrong password.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = state
        .auth()
        .login(
            req.email.as_deref().unwrap_or_default(),
            req.password.as_deref().unwrap_or_default(),
        )
        .await?;

    let pair = state.tokens().issue_pair(user.id)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        message: "Login successful",
        access_token: pair.access,
        refresh_token: pair.refresh,
        display_name: user.display_name,
    }))
}

// =============================================================================
// Verification Codes
// =============================================================================

/// Code request body.
#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    pub email: Option<String>,
    /// `registration` or `password_reset` (the default).
    pub purpose: Option<String>,
}

/// Issue a verification code.
///
/// POST /send_verification_code
///
/// Responds the same way whether or not the email has an account.
///
/// # Errors
///
/// Returns `AppError` if the email is missing, the purpose is unknown, or
/// the code cannot be stored.
pub async fn send_verification_code(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SendCodeRequest>,
) -> Result<Json<ApiResponse<()>>> {
    state
        .auth()
        .request_code(req.email.as_deref(), req.purpose.as_deref())
        .await?;

    Ok(Json(ApiResponse::message("Verification code sent")))
}

// =============================================================================
// Password Reset
// =============================================================================

/// Password reset request body.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub code: Option<String>,
    pub password: Option<String>,
}

/// Set a new password using a reset code.
///
/// POST /reset_password
///
/// # Errors
///
/// Returns `AppError` for missing fields, a weak password, a bad code, an
/// unknown user, or a storage failure.
pub async fn reset_password(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<()>>> {
    state
        .auth()
        .reset_password(
            req.email.as_deref(),
            req.code.as_deref(),
            req.password.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::message("Password reset successful")))
}

// =============================================================================
// Tokens
// =============================================================================

/// Refresh request body.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: &'static str,
    pub access: String,
}

/// Trade a refresh token for a new access token.
///
/// POST /token/refresh
///
/// # Errors
///
/// Returns `AppError::BadRequest` without a token, `AppError::Token` (401)
/// if it is invalid or not a refresh token.
pub async fn refresh_token(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> Result<Json<RefreshResponse>> {
    let refresh = req
        .refresh
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing required fields: refresh".to_owned()))?;

    let access = state.tokens().refresh(&refresh)?;

    Ok(Json(RefreshResponse {
        message: "Token refreshed",
        access,
    }))
}

/// Verify request body.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: Option<String>,
}

/// Check that a token was issued by us and has not expired.
///
/// POST /token/verify
///
/// # Errors
///
/// Returns `AppError::BadRequest` without a token, `AppError::Token` (401)
/// if it does not verify.
pub async fn verify_token(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<VerifyRequest>,
) -> Result<Json<ApiResponse<()>>> {
    let token = req
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing required fields: token".to_owned()))?;

    state.tokens().verify(&token)?;

    Ok(Json(ApiResponse::message("Token is valid")))
}
