//! Product route handlers.

use axum::{Json, extract::State};

use crate::error::Result;
use crate::models::Product;
use crate::routes::ApiResponse;
use crate::state::AppState;

/// List the catalog.
///
/// GET /products
///
/// # Errors
///
/// Returns `AppError::Database` if the catalog cannot be read.
pub async fn index(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Product>>>> {
    let products = state.stores().products.list().await?;

    Ok(Json(ApiResponse::with_data(
        "Product list retrieved",
        products,
    )))
}
