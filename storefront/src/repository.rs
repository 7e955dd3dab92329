//! Order persistence collaborator.
//!
//! The engine never owns order storage: it is handed an [`OrderRepository`]
//! whose lifecycle belongs to the process or session that created it.
//! [`InMemoryOrderRepository`] is the bundled implementation, used by the demo
//! binary and by tests.

use crate::orders::Order;
use crate::types::{OrderId, UserId};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Boxed future returned by repository operations
pub type RepositoryFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, RepositoryError>> + Send + 'a>>;

/// Errors reported by an order repository
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// No order with this id
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// The backend refused the write
    #[error("Order rejected: {0}")]
    Rejected(String),

    /// The backend could not be reached
    #[error("Order service unavailable: {0}")]
    Unavailable(String),
}

/// Where orders are submitted and read back.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of
/// `async fn` so it can be shared as `Arc<dyn OrderRepository>` and captured
/// by effects.
pub trait OrderRepository: Send + Sync {
    /// Persist a newly placed order, returning the stored record
    fn submit(&self, order: Order) -> RepositoryFuture<'_, Order>;

    /// All orders placed by `user_id`, oldest first
    fn fetch_for_user(&self, user_id: UserId) -> RepositoryFuture<'_, Vec<Order>>;

    /// A single order
    fn fetch(&self, order_id: OrderId) -> RepositoryFuture<'_, Order>;

    /// Overwrite an existing order, returning the stored record
    ///
    /// Fails with [`RepositoryError::NotFound`] if no order has this id; it
    /// never inserts.
    fn replace(&self, order: Order) -> RepositoryFuture<'_, Order>;
}

/// Insertion-ordered in-memory repository
///
/// Clones share the same storage.
#[derive(Clone, Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<Vec<Order>>>,
}

impl InMemoryOrderRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository that already holds `orders`
    #[must_use]
    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            orders: Arc::new(RwLock::new(orders)),
        }
    }

    /// Number of stored orders
    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Whether no orders are stored
    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn submit(&self, order: Order) -> RepositoryFuture<'_, Order> {
        Box::pin(async move {
            let mut orders = self.orders.write().await;
            if orders.iter().any(|existing| existing.id == order.id) {
                return Err(RepositoryError::Rejected(format!(
                    "duplicate order id {}",
                    order.id
                )));
            }
            orders.push(order.clone());
            Ok(order)
        })
    }

    fn fetch_for_user(&self, user_id: UserId) -> RepositoryFuture<'_, Vec<Order>> {
        Box::pin(async move {
            let orders = self.orders.read().await;
            Ok(orders
                .iter()
                .filter(|order| order.user_id == user_id)
                .cloned()
                .collect())
        })
    }

    fn fetch(&self, order_id: OrderId) -> RepositoryFuture<'_, Order> {
        Box::pin(async move {
            let orders = self.orders.read().await;
            orders
                .iter()
                .find(|order| order.id == order_id)
                .cloned()
                .ok_or(RepositoryError::NotFound(order_id))
        })
    }

    fn replace(&self, order: Order) -> RepositoryFuture<'_, Order> {
        Box::pin(async move {
            let mut orders = self.orders.write().await;
            match orders.iter_mut().find(|existing| existing.id == order.id) {
                Some(slot) => {
                    *slot = order.clone();
                    Ok(order)
                },
                None => Err(RepositoryError::NotFound(order.id)),
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::orders::{OrderDraft, OrderStatus, ShippingAddress};
    use storefront_testing::test_epoch;

    fn order(id: &str, user: &str) -> Order {
        Order::place(
            OrderId::new(id),
            OrderDraft {
                user_id: UserId::new(user),
                items: vec![],
                shipping_address: ShippingAddress::default(),
                payment_method: "paypal".to_string(),
            },
            test_epoch(),
        )
    }

    #[tokio::test]
    async fn lists_by_user_in_insertion_order() {
        let repo = InMemoryOrderRepository::new();
        repo.submit(order("a", "alice")).await.unwrap();
        repo.submit(order("b", "bob")).await.unwrap();
        repo.submit(order("c", "alice")).await.unwrap();

        let ids: Vec<_> = repo
            .fetch_for_user(UserId::new("alice"))
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec![OrderId::new("a"), OrderId::new("c")]);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let repo = InMemoryOrderRepository::with_orders(vec![order("a", "alice")]);
        let result = repo.submit(order("a", "bob")).await;

        assert!(matches!(result, Err(RepositoryError::Rejected(_))));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn replace_never_inserts() {
        let repo = InMemoryOrderRepository::new();
        let result = repo.replace(order("ghost", "alice")).await;

        assert_eq!(result, Err(RepositoryError::NotFound(OrderId::new("ghost"))));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn replace_overwrites_in_place() {
        let repo = InMemoryOrderRepository::with_orders(vec![order("a", "alice"), order("b", "alice")]);
        let shipped = order("a", "alice").with_status(OrderStatus::Shipped, test_epoch());
        repo.replace(shipped).await.unwrap();

        let orders = repo.fetch_for_user(UserId::new("alice")).await.unwrap();
        assert_eq!(orders[0].status, OrderStatus::Shipped);
        assert_eq!(orders[1].id, OrderId::new("b"));
    }
}
