//! In-memory storage.
//!
//! Implements every store trait over one mutex-guarded state, enforcing the
//! same rules as the database schema: unique emails, owner-scoped deletes,
//! item cascade and insertion order. Used by tests and for running the API
//! without `PostgreSQL`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use sundry_core::{Email, OrderId, OrderItemId, Price, ProductId, UserId};

use super::{NewUser, OWNER_MISSING, OrderStore, ProductStore, RepositoryError, UserStore};
use crate::models::order::{NewOrderItem, Order, OrderItem};
use crate::models::product::Product;
use crate::models::user::User;

#[derive(Default)]
struct State {
    users: BTreeMap<UserId, (User, String)>,
    orders: BTreeMap<OrderId, Order>,
    products: Vec<Product>,
    next_user_id: i32,
    next_order_id: i32,
    next_item_id: i32,
    next_product_id: i32,
}

impl State {
    fn user_by_email(&self, email: &Email) -> Option<&(User, String)> {
        self.users.values().find(|(u, _)| u.email == *email)
    }
}

fn next(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

/// In-memory implementation of the store traits.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored order items across all orders.
    pub async fn order_item_count(&self) -> usize {
        self.state
            .lock()
            .await
            .orders
            .values()
            .map(|o| o.items.len())
            .sum()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser<'_>) -> Result<User, RepositoryError> {
        let mut state = self.state.lock().await;

        if state.user_by_email(user.email).is_some() {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = Utc::now();
        let created = User {
            id: UserId::new(next(&mut state.next_user_id)),
            email: user.email.clone(),
            display_name: user.display_name.to_owned(),
            created_at: now,
            updated_at: now,
        };

        state.users.insert(
            created.id,
            (created.clone(), user.password_hash.to_owned()),
        );

        Ok(created)
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.user_by_email(email).map(|(u, _)| u.clone()))
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.users.get(&id).map(|(u, _)| u.clone()))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.user_by_email(email).cloned())
    }

    async fn set_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        let (user, hash) = state.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        password_hash.clone_into(hash);
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn set_display_name(
        &self,
        id: UserId,
        display_name: &str,
    ) -> Result<User, RepositoryError> {
        let mut state = self.state.lock().await;
        let (user, _) = state.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        display_name.clone_into(&mut user.display_name);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn list_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .values()
            .filter(|o| o.user == user)
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        user: UserId,
        items: &[NewOrderItem],
    ) -> Result<Order, RepositoryError> {
        let mut state = self.state.lock().await;

        if !state.users.contains_key(&user) {
            return Err(RepositoryError::Conflict(OWNER_MISSING.to_owned()));
        }

        let id = OrderId::new(next(&mut state.next_order_id));
        let items = items
            .iter()
            .map(|item| OrderItem {
                id: OrderItemId::new(next(&mut state.next_item_id)),
                product_name: item.product_name.clone(),
                product_price: item.product_price,
                quantity: item.quantity,
            })
            .collect();

        let order = Order {
            id,
            user,
            created_at: Utc::now(),
            items,
        };
        state.orders.insert(id, order.clone());

        Ok(order)
    }

    async fn delete_for_user(&self, user: UserId, order: OrderId) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;

        if state.orders.get(&order).is_some_and(|o| o.user == user) {
            state.orders.remove(&order);
            return Ok(true);
        }

        Ok(false)
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.state.lock().await.products.clone())
    }

    async fn create(&self, name: &str, price: Price) -> Result<Product, RepositoryError> {
        let mut state = self.state.lock().await;
        let product = Product {
            id: ProductId::new(next(&mut state.next_product_id)),
            name: name.to_owned(),
            price,
        };
        state.products.push(product.clone());
        Ok(product)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn item(name: &str, price: &str, quantity: i32) -> NewOrderItem {
        NewOrderItem {
            product_name: name.to_owned(),
            product_price: price.parse().unwrap(),
            quantity,
        }
    }

    async fn user(store: &MemoryStore, email: &str) -> User {
        let email = Email::parse(email).unwrap();
        UserStore::create(
            store,
            NewUser {
                email: &email,
                password_hash: "hash",
                display_name: "name",
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        user(&store, "a@b.co").await;

        let email = Email::parse("a@b.co").unwrap();
        let err = UserStore::create(
            &store,
            NewUser {
                email: &email,
                password_hash: "other",
                display_name: "other",
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_concurrent_creates_only_one_wins() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let email = Email::parse("race@b.co").unwrap();
                    UserStore::create(
                        store.as_ref(),
                        NewUser {
                            email: &email,
                            password_hash: "hash",
                            display_name: "race",
                        },
                    )
                    .await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_orders_are_scoped_to_owner() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner@b.co").await;
        let other = user(&store, "other@b.co").await;

        let order = OrderStore::create(
            &store,
            owner.id,
            &[item("Widget", "9.99", 2), item("Gadget", "4.50", 1)],
        )
        .await
        .unwrap();

        let names: Vec<_> = order.items.iter().map(|i| i.product_name.as_str()).collect();
        assert_eq!(names, ["Widget", "Gadget"]);
        assert_eq!(store.list_for_user(owner.id).await.unwrap().len(), 1);
        assert!(store.list_for_user(other.id).await.unwrap().is_empty());

        assert!(!store.delete_for_user(other.id, order.id).await.unwrap());
        assert_eq!(store.order_item_count().await, 2);

        assert!(store.delete_for_user(owner.id, order.id).await.unwrap());
        assert!(store.list_for_user(owner.id).await.unwrap().is_empty());
        assert_eq!(store.order_item_count().await, 0);
    }

    #[tokio::test]
    async fn test_order_for_missing_owner_conflicts() {
        let store = MemoryStore::new();
        let err = OrderStore::create(&store, UserId::new(42), &[item("Widget", "9.99", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(ref m) if m == OWNER_MISSING));
        assert_eq!(store.order_item_count().await, 0);
    }

    #[tokio::test]
    async fn test_set_display_name_unknown_user() {
        let store = MemoryStore::new();
        let err = store
            .set_display_name(UserId::new(99), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
