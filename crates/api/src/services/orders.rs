//! Order aggregate management.
//!
//! Orders are created from a loosely typed JSON body so that every problem
//! can be reported with its field path (`products[1].quantity`) instead of
//! failing on the first one.

use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;

use sundry_core::{OrderId, Price, UserId};

use crate::db::{OrderStore, RepositoryError};
use crate::error::ErrorKind;
use crate::models::order::{MAX_PRODUCT_NAME_LENGTH, NewOrderItem, Order};

/// A validation problem at a specific location in the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The body carried no data at all.
    #[error("order payload is empty")]
    EmptyPayload,

    /// One or more fields failed validation.
    #[error("invalid order data ({} field errors)", .0.len())]
    InvalidOrderData(Vec<FieldError>),

    /// No order with this id belongs to the caller.
    #[error("order not found")]
    NotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl OrderError {
    /// Taxonomy bucket for transport mapping.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyPayload | Self::InvalidOrderData(_) => ErrorKind::Validation,
            Self::NotFound => ErrorKind::NotFound,
            Self::Repository(RepositoryError::Conflict(_)) => ErrorKind::Conflict,
            Self::Repository(_) => ErrorKind::Storage,
        }
    }

    /// Message shown to the client.
    #[must_use]
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::EmptyPayload => "Order creation failed, no input data",
            Self::InvalidOrderData(_) => "Order creation failed, please check the submitted data",
            Self::NotFound => "Order does not exist or you do not have permission to modify it",
            Self::Repository(RepositoryError::Conflict(_)) => {
                "Order creation failed due to conflicting data"
            }
            Self::Repository(_) => self.kind().default_message(),
        }
    }
}

/// Order operations for one request.
pub struct OrderService<'a> {
    orders: &'a dyn OrderStore,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(orders: &'a dyn OrderStore) -> Self {
        Self { orders }
    }

    /// All orders owned by `user`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn list(&self, user: UserId) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_for_user(user).await?)
    }

    /// Validate a create-order body and persist the order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyPayload` or `OrderError::InvalidOrderData`
    /// for bad input, `OrderError::Repository` if the insert fails.
    pub async fn create(&self, user: UserId, body: &Value) -> Result<Order, OrderError> {
        let items = parse_order_payload(body)?;
        let order = self.orders.create(user, &items).await?;

        tracing::info!(
            user_id = %user,
            order_id = %order.id,
            items = order.items.len(),
            "Order created"
        );
        Ok(order)
    }

    /// Delete an order the caller owns.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist or belongs
    /// to someone else.
    pub async fn cancel(&self, user: UserId, order: OrderId) -> Result<(), OrderError> {
        if !self.orders.delete_for_user(user, order).await? {
            return Err(OrderError::NotFound);
        }

        tracing::info!(user_id = %user, order_id = %order, "Order cancelled");
        Ok(())
    }
}

// =============================================================================
// Payload Validation
// =============================================================================

/// Validate a create-order body into line items.
///
/// The body is rejected as empty when every top-level value is blank, so
/// `{"products": []}` fails while `{"note": "x", "products": []}` yields an
/// order without items.
///
/// # Errors
///
/// Returns `OrderError::EmptyPayload` or `OrderError::InvalidOrderData`.
pub fn parse_order_payload(body: &Value) -> Result<Vec<NewOrderItem>, OrderError> {
    if is_blank(body) || body.as_object().is_some_and(|o| o.values().all(is_blank)) {
        return Err(OrderError::EmptyPayload);
    }

    let Some(object) = body.as_object() else {
        return Err(OrderError::InvalidOrderData(vec![FieldError::new(
            "non_field_errors",
            "Expected a JSON object",
        )]));
    };

    let products = match object.get("products") {
        None => {
            return Err(OrderError::InvalidOrderData(vec![FieldError::new(
                "products",
                "This field is required.",
            )]));
        }
        Some(Value::Array(products)) => products,
        Some(_) => {
            return Err(OrderError::InvalidOrderData(vec![FieldError::new(
                "products",
                "Expected a list of items.",
            )]));
        }
    };

    let mut errors = Vec::new();
    let mut items = Vec::with_capacity(products.len());

    for (index, product) in products.iter().enumerate() {
        let path = format!("products[{index}]");
        let Some(fields) = product.as_object() else {
            errors.push(FieldError::new(path, "Expected an object."));
            continue;
        };

        let name = parse_name(fields, &path, &mut errors);
        let price = parse_price(fields, &path, &mut errors);
        let quantity = parse_quantity(fields, &path, &mut errors);

        if let (Some(product_name), Some(product_price), Some(quantity)) = (name, price, quantity) {
            items.push(NewOrderItem {
                product_name,
                product_price,
                quantity,
            });
        }
    }

    if errors.is_empty() {
        Ok(items)
    } else {
        Err(OrderError::InvalidOrderData(errors))
    }
}

/// Whether a JSON value carries no data.
#[allow(clippy::float_cmp)]
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn parse_name(
    fields: &Map<String, Value>,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let path = format!("{path}.product_name");
    match fields.get("product_name") {
        None | Some(Value::Null) => {
            errors.push(FieldError::new(path, "This field is required."));
            None
        }
        Some(Value::String(name)) if name.trim().is_empty() => {
            errors.push(FieldError::new(path, "This field may not be blank."));
            None
        }
        Some(Value::String(name)) if name.trim().chars().count() > MAX_PRODUCT_NAME_LENGTH => {
            errors.push(FieldError::new(
                path,
                format!("Ensure this field has no more than {MAX_PRODUCT_NAME_LENGTH} characters."),
            ));
            None
        }
        Some(Value::String(name)) => Some(name.trim().to_owned()),
        Some(_) => {
            errors.push(FieldError::new(path, "Not a valid string."));
            None
        }
    }
}

fn parse_price(
    fields: &Map<String, Value>,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Price> {
    let path = format!("{path}.product_price");
    let raw = match fields.get("product_price").or_else(|| fields.get("unit_price")) {
        None | Some(Value::Null) => {
            errors.push(FieldError::new(path, "This field is required."));
            return None;
        }
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.trim().to_owned(),
        Some(_) => {
            errors.push(FieldError::new(path, "A valid number is required."));
            return None;
        }
    };

    match Price::from_str(&raw) {
        Ok(price) => Some(price),
        Err(e) => {
            errors.push(FieldError::new(path, capitalize(&e.to_string())));
            None
        }
    }
}

#[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
fn parse_quantity(
    fields: &Map<String, Value>,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Option<i32> {
    let path = format!("{path}.quantity");
    let quantity = match fields.get("quantity") {
        None | Some(Value::Null) => {
            errors.push(FieldError::new(path, "This field is required."));
            return None;
        }
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 1e15)
                .map(|f| f as i64)
        }),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    let Some(quantity) = quantity.and_then(|q| i32::try_from(q).ok()) else {
        errors.push(FieldError::new(path, "A valid integer is required."));
        return None;
    };

    if quantity < 1 {
        errors.push(FieldError::new(
            path,
            "Ensure this value is greater than or equal to 1.",
        ));
        return None;
    }

    Some(quantity)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        let mut out: String = first.to_uppercase().collect();
        out.push_str(chars.as_str());
        out.push('.');
        out
    })
}
