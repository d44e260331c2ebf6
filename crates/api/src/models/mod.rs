//! Domain models for the shop.
//!
//! These are validated domain objects. Row types used for `sqlx` decoding
//! live next to the queries in `crate::db`.

pub mod order;
pub mod product;
pub mod user;

pub use order::{NewOrderItem, Order, OrderItem};
pub use product::Product;
pub use user::{User, UserProfile};
