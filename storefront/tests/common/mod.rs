//! Shared fixtures for storefront integration tests.

#![allow(dead_code)] // Each test binary uses a different subset

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use storefront::repository::RepositoryFuture;
use storefront::{
    InMemoryCatalog, InMemoryOrderRepository, Money, Order, OrderEngine, OrderEnvironment,
    OrderId, OrderRepository, Product, RepositoryError, ShippingAddress, ShopSession,
    StaticSession, StorefrontConfig, TransitionPolicy, UserId,
};
use storefront_testing::{SequentialIdGenerator, test_clock};

/// Repository whose submissions always fail; reads go to an inner store
#[derive(Debug, Default)]
pub struct RejectingRepository {
    inner: InMemoryOrderRepository,
    attempts: AtomicUsize,
}

impl RejectingRepository {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl OrderRepository for RejectingRepository {
    fn submit(&self, _order: Order) -> RepositoryFuture<'_, Order> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Err(RepositoryError::Unavailable("connection refused".to_string())) })
    }

    fn fetch_for_user(&self, user_id: UserId) -> RepositoryFuture<'_, Vec<Order>> {
        self.inner.fetch_for_user(user_id)
    }

    fn fetch(&self, order_id: OrderId) -> RepositoryFuture<'_, Order> {
        self.inner.fetch(order_id)
    }

    fn replace(&self, order: Order) -> RepositoryFuture<'_, Order> {
        self.inner.replace(order)
    }
}

/// Repository whose writes take `delay` before reaching an inner store
#[derive(Debug)]
pub struct SlowRepository {
    inner: InMemoryOrderRepository,
    delay: Duration,
}

impl SlowRepository {
    pub fn new(inner: InMemoryOrderRepository, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl OrderRepository for SlowRepository {
    fn submit(&self, order: Order) -> RepositoryFuture<'_, Order> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            self.inner.submit(order).await
        })
    }

    fn fetch_for_user(&self, user_id: UserId) -> RepositoryFuture<'_, Vec<Order>> {
        self.inner.fetch_for_user(user_id)
    }

    fn fetch(&self, order_id: OrderId) -> RepositoryFuture<'_, Order> {
        self.inner.fetch(order_id)
    }

    fn replace(&self, order: Order) -> RepositoryFuture<'_, Order> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            self.inner.replace(order).await
        })
    }
}

pub fn headphones() -> Product {
    Product::new(
        "1",
        "Wireless Bluetooth Headphones",
        Money::from_cents(14_999),
        25,
        "headphones.jpg",
    )
}

pub fn watch() -> Product {
    Product::new("2", "Smart Watch Series 5", Money::from_cents(29_999), 15, "watch.jpg")
}

pub fn tshirt() -> Product {
    Product::new("3", "Organic Cotton T-Shirt", Money::from_cents(2_499), 100, "tshirt.jpg")
}

pub fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::with_products([headphones(), watch(), tshirt()])
}

pub fn address() -> ShippingAddress {
    ShippingAddress {
        street: "123 Main St".to_string(),
        city: "New York".to_string(),
        state: "NY".to_string(),
        country: "USA".to_string(),
        zip_code: "10001".to_string(),
        phone: "+1 555 123 4567".to_string(),
    }
}

pub fn engine(repository: Arc<dyn OrderRepository>, policy: TransitionPolicy) -> Arc<OrderEngine> {
    Arc::new(OrderEngine::new(
        OrderEnvironment::new(
            repository,
            Arc::new(test_clock()),
            Arc::new(SequentialIdGenerator::new("order")),
        )
        .with_policy(policy),
    ))
}

/// Engine built from settings with a short request timeout
pub fn engine_with_timeout(
    repository: Arc<dyn OrderRepository>,
    request_timeout_ms: u64,
) -> Arc<OrderEngine> {
    let config = StorefrontConfig {
        request_timeout_ms,
        ..StorefrontConfig::default()
    };
    Arc::new(OrderEngine::with_config(
        OrderEnvironment::new(
            repository,
            Arc::new(test_clock()),
            Arc::new(SequentialIdGenerator::new("order")),
        ),
        &config,
    ))
}

pub fn shop(engine: Arc<OrderEngine>, catalog: InMemoryCatalog) -> ShopSession {
    ShopSession::new(engine, Arc::new(catalog), Arc::new(StaticSession::signed_in("user-1")))
}
