//! Product catalog repository.

use async_trait::async_trait;
use sqlx::PgPool;

use sundry_core::{Price, ProductId};

use super::{ProductStore, RepositoryError};
use crate::models::product::Product;

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    price: Price,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
        }
    }
}

/// `PostgreSQL` implementation of [`ProductStore`].
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for ProductRepository {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> =
            sqlx::query_as("SELECT id, name, price FROM shop.products ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn create(&self, name: &str, price: Price) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(
            r"
            INSERT INTO shop.products (name, price)
            VALUES ($1, $2)
            RETURNING id, name, price
            ",
        )
        .bind(name)
        .bind(price)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }
}
