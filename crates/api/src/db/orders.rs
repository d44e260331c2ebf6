//! Order repository.
//!
//! Orders and their items are written in one transaction. Items carry a
//! `position` column so they always come back in submission order.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use sundry_core::{OrderId, OrderItemId, Price, UserId};

use super::{OWNER_MISSING, OrderStore, RepositoryError};
use crate::models::order::{NewOrderItem, Order, OrderItem};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_name: String,
    product_price: Price,
    quantity: i32,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            product_name: row.product_name,
            product_price: row.product_price,
            quantity: row.quantity,
        }
    }
}

/// `PostgreSQL` implementation of [`OrderStore`].
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn list_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders: Vec<OrderRow> = sqlx::query_as(
            r"
            SELECT id, user_id, created_at
            FROM shop.orders
            WHERE user_id = $1
            ORDER BY id
            ",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<i32> = orders.iter().map(|o| o.id.as_i32()).collect();
        let items: Vec<OrderItemRow> = sqlx::query_as(
            r"
            SELECT id, order_id, product_name, product_price, quantity
            FROM shop.order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            ",
        )
        .bind(&order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in items {
            items_by_order
                .entry(item.order_id)
                .or_default()
                .push(item.into());
        }

        Ok(orders
            .into_iter()
            .map(|o| Order {
                items: items_by_order.remove(&o.id).unwrap_or_default(),
                id: o.id,
                user: o.user_id,
                created_at: o.created_at,
            })
            .collect())
    }

    async fn create(
        &self,
        user: UserId,
        items: &[NewOrderItem],
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order: OrderRow = sqlx::query_as(
            r"
            INSERT INTO shop.orders (user_id)
            VALUES ($1)
            RETURNING id, user_id, created_at
            ",
        )
        .bind(user)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_insert(e, OWNER_MISSING))?;

        let mut stored = Vec::with_capacity(items.len());
        for (position, item) in (0_i32..).zip(items) {
            let row: OrderItemRow = sqlx::query_as(
                r"
                INSERT INTO shop.order_items
                    (order_id, position, product_name, product_price, quantity)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, order_id, product_name, product_price, quantity
                ",
            )
            .bind(order.id)
            .bind(position)
            .bind(&item.product_name)
            .bind(item.product_price)
            .bind(item.quantity)
            .fetch_one(&mut *tx)
            .await?;

            stored.push(row.into());
        }

        tx.commit().await?;

        Ok(Order {
            id: order.id,
            user: order.user_id,
            created_at: order.created_at,
            items: stored,
        })
    }

    async fn delete_for_user(&self, user: UserId, order: OrderId) -> Result<bool, RepositoryError> {
        // Items go with the order via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM shop.orders WHERE id = $1 AND user_id = $2")
            .bind(order)
            .bind(user)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
