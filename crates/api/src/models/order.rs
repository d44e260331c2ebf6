//! Order aggregate: an order and its line items.

use chrono::{DateTime, Utc};
use serde::Serialize;

use sundry_core::{OrderId, OrderItemId, Price, UserId};

/// Maximum product name length, in characters.
pub const MAX_PRODUCT_NAME_LENGTH: usize = 255;

/// A placed order with its items in insertion order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    /// Owning user.
    pub user: UserId,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// A persisted line item. Name and price are snapshots taken at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_name: String,
    pub product_price: Price,
    pub quantity: i32,
}

/// A validated line item that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_name: String,
    pub product_price: Price,
    /// Always at least 1.
    pub quantity: i32,
}
