//! User profile route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::extract::JsonBody;
use crate::middleware::RequireAuth;
use crate::models::UserProfile;
use crate::routes::ApiResponse;
use crate::state::AppState;

/// The caller's display name and email.
///
/// GET /user/info
///
/// # Errors
///
/// Returns `AppError::Unauthorized` if the token is valid but the account
/// no longer exists.
pub async fn info(
    State(state): State<AppState>,
    RequireAuth(user_id): RequireAuth,
) -> Result<Json<ApiResponse<UserProfile>>> {
    let user = state
        .auth()
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User is not logged in".to_owned()))?;

    Ok(Json(ApiResponse::with_data(
        "User profile retrieved",
        user.profile(),
    )))
}

/// Display name update body.
#[derive(Debug, Deserialize)]
pub struct UpdateNameRequest {
    pub display_name: Option<String>,
}

/// Change the caller's display name.
///
/// PUT /user/update_name
///
/// # Errors
///
/// Returns `AppError::Auth` (400) for a blank or overlong name.
pub async fn update_name(
    State(state): State<AppState>,
    RequireAuth(user_id): RequireAuth,
    JsonBody(req): JsonBody<UpdateNameRequest>,
) -> Result<Json<ApiResponse<UserProfile>>> {
    let user = state
        .auth()
        .update_display_name(user_id, req.display_name.as_deref())
        .await?;

    Ok(Json(ApiResponse::with_data(
        "Display name updated",
        user.profile(),
    )))
}
