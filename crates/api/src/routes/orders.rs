//! Order route handlers. Every handler requires a bearer token.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::Value;

use sundry_core::OrderId;

use crate::error::Result;
use crate::extract::JsonBody;
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::routes::ApiResponse;
use crate::services::orders::OrderError;
use crate::state::AppState;

/// List the caller's orders.
///
/// GET /orders
///
/// # Errors
///
/// Returns `AppError::Order` if the orders cannot be read.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user_id): RequireAuth,
) -> Result<Json<ApiResponse<Vec<Order>>>> {
    let orders = state.orders().list(user_id).await?;

    Ok(Json(ApiResponse::with_data("Order list retrieved", orders)))
}

/// Place an order.
///
/// POST /orders
///
/// # Errors
///
/// Returns `AppError::Order` for an empty or invalid body, or if the order
/// cannot be stored.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user_id): RequireAuth,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>)> {
    let order = state.orders().create(user_id, &body).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_data("Order created", order)),
    ))
}

/// Cancel (delete) one of the caller's orders.
///
/// DELETE /orders/{id}/cancel
///
/// An id that is not a number is treated like any other unknown order.
///
/// # Errors
///
/// Returns `AppError::Order` (404) if the caller has no such order.
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user_id): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    let order_id = id
        .parse::<i32>()
        .map(OrderId::new)
        .map_err(|_| OrderError::NotFound)?;

    state.orders().cancel(user_id, order_id).await?;

    Ok(Json(ApiResponse::message("Order cancelled")))
}
