//! Catalog product.

use serde::Serialize;

use sundry_core::{Price, ProductId};

/// A catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
}
