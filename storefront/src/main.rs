//! Storefront demo.
//!
//! Seeds a catalog and a shopper's order history, then walks one session
//! through add-to-cart, checkout, cancellation and a refund.
//!
//! Run with: `cargo run -p storefront`
//! (`STOREFRONT_LOG=info` for a quieter run)

use anyhow::Context;
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use storefront::orders::{OrderDraft, OrderItem};
use storefront::{
    InMemoryCatalog, InMemoryOrderRepository, Money, Order, OrderEngine, OrderEnvironment,
    OrderId, OrderStatus, Product, ProductId, ShippingAddress, ShopSession, StaticSession,
    StorefrontConfig, UserId, telemetry,
};
use storefront_core::environment::{Clock, SystemClock, UuidIdGenerator};
use tracing::info;

fn catalog() -> Vec<Product> {
    vec![
        Product::new(
            "1",
            "Wireless Bluetooth Headphones",
            Money::from_cents(14_999),
            25,
            "https://images.example.com/headphones.jpg",
        ),
        Product::new(
            "2",
            "Smart Watch Series 5",
            Money::from_cents(29_999),
            15,
            "https://images.example.com/watch.jpg",
        ),
        Product::new(
            "3",
            "Organic Cotton T-Shirt",
            Money::from_cents(2_499),
            100,
            "https://images.example.com/tshirt.jpg",
        ),
    ]
}

fn address() -> ShippingAddress {
    ShippingAddress {
        street: "123 Main St".to_string(),
        city: "New York".to_string(),
        state: "NY".to_string(),
        country: "USA".to_string(),
        zip_code: "10001".to_string(),
        phone: "+1 555 123 4567".to_string(),
    }
}

/// Two orders placed by `user` a few weeks ago
fn history(user: &UserId, products: &[Product], clock: &dyn Clock) -> Vec<Order> {
    let item = |product: &Product, quantity| OrderItem {
        product_id: product.id.clone(),
        name: product.name.clone(),
        price: product.price,
        quantity,
        image: product.image.clone(),
    };
    let draft = |items| OrderDraft {
        user_id: user.clone(),
        items,
        shipping_address: address(),
        payment_method: "credit_card".to_string(),
    };
    let now = clock.now();

    let mut delivered = Order::place(
        OrderId::new("ORD-1001"),
        draft(vec![item(&products[0], 1), item(&products[2], 2)]),
        now - ChronoDuration::days(21),
    )
    .with_status(OrderStatus::Delivered, now - ChronoDuration::days(14))
    .with_tracking("TRK123456", Some(now - ChronoDuration::days(14)));
    delivered.payment_status = storefront::PaymentStatus::Completed;

    let mut processing = Order::place(
        OrderId::new("ORD-1002"),
        draft(vec![item(&products[1], 1)]),
        now - ChronoDuration::days(2),
    )
    .with_status(OrderStatus::Processing, now - ChronoDuration::days(1));
    processing.payment_status = storefront::PaymentStatus::Completed;

    vec![delivered, processing]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = StorefrontConfig::from_env().context("loading configuration")?;
    telemetry::init(&config.log_filter).context("initializing telemetry")?;
    info!(environment = %config.environment, policy = ?config.transition_policy, "Storefront starting");

    let user = UserId::new("user-1");
    let products = catalog();
    let clock = SystemClock;
    let repository = InMemoryOrderRepository::with_orders(history(&user, &products, &clock));

    let engine = Arc::new(OrderEngine::with_config(
        OrderEnvironment::new(
            Arc::new(repository),
            Arc::new(clock),
            Arc::new(UuidIdGenerator),
        ),
        &config,
    ));
    let shop = ShopSession::with_config(
        Arc::clone(&engine),
        Arc::new(InMemoryCatalog::with_products(products)),
        Arc::new(StaticSession::signed_in(user.as_str())),
        &config,
    );

    // Print every order lifecycle change as it happens
    let mut observed = engine.subscribe();
    let observer = tokio::spawn(async move {
        while let Ok(action) = observed.recv().await {
            if let storefront::OrderAction::OrderUpdated { order, .. } = action {
                info!(order_id = %order.id, status = %order.status, "Observed order change");
            }
        }
    });

    // ========== Shopping ==========
    shop.add_product(ProductId::new("1"), 2).await?;
    shop.add_product(ProductId::new("2"), 1).await?;
    shop.adjust(ProductId::new("1"), -1).await?;
    let cart = shop.add_product(ProductId::new("3"), 3).await?;
    info!(lines = cart.lines().len(), items = cart.item_count(), total = %cart.total(), "Cart ready");

    // ========== Checkout ==========
    let order = shop.checkout(address(), "credit_card").await?;
    info!(order_id = %order.id, total = %order.total_amount, "Order placed");
    info!(empty = shop.cart().await.is_empty(), "Cart after checkout");

    // ========== History ==========
    for order in shop.order_history().await? {
        info!(
            order_id = %order.id,
            status = %order.status,
            total = %order.total_amount,
            tracking = order.tracking_number.as_deref().unwrap_or("-"),
            "Order history"
        );
    }

    // ========== Lifecycle ==========
    let cancelled = engine.cancel(order.id.clone()).await?;
    info!(order_id = %cancelled.id, status = %cancelled.status, "Cancelled new order");

    if let Err(error) = engine.cancel(OrderId::new("ORD-1002")).await {
        info!(%error, "Processing orders cannot be cancelled");
    }

    let refunded = engine
        .request_refund(OrderId::new("ORD-1001"), "Item arrived damaged".to_string())
        .await?;
    info!(
        order_id = %refunded.id,
        status = %refunded.status,
        notes = refunded.notes.as_deref().unwrap_or_default(),
        "Refunded delivered order"
    );

    shop.close(Duration::from_secs(5)).await?;
    engine.shutdown(Duration::from_secs(5)).await?;
    drop(engine);
    drop(shop);
    observer.abort();
    info!("Storefront demo complete");
    Ok(())
}
