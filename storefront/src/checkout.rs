//! One shopper's session: their cart plus access to the shared order engine.
//!
//! The cart lives in a [`Store`] owned by the session. Checkout freezes the
//! cart into order items, hands them to the [`OrderEngine`], and clears the
//! cart only once the order has been recorded.

use crate::cart::{CartAction, CartReducer, CartState};
use crate::catalog::ProductCatalog;
use crate::config::StorefrontConfig;
use crate::error::OrderError;
use crate::orders::{Order, OrderEngine, ShippingAddress};
use crate::session::Session;
use crate::types::{Product, ProductId, UserId};
use std::sync::Arc;
use storefront_runtime::{Store, StoreConfig};
use tokio::sync::broadcast;

/// Store running the cart ledger
pub type CartStore = Store<CartState, CartAction, (), CartReducer>;

/// A shopper's cart and checkout
pub struct ShopSession {
    cart: CartStore,
    orders: Arc<OrderEngine>,
    catalog: Arc<dyn ProductCatalog>,
    session: Arc<dyn Session>,
}

impl std::fmt::Debug for ShopSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopSession")
            .field("cart", &self.cart)
            .field("user", &self.session.current_user_id())
            .finish_non_exhaustive()
    }
}

impl ShopSession {
    /// Start a session with an empty cart
    #[must_use]
    pub fn new(
        orders: Arc<OrderEngine>,
        catalog: Arc<dyn ProductCatalog>,
        session: Arc<dyn Session>,
    ) -> Self {
        Self::with_store_config(orders, catalog, session, &StoreConfig::default())
    }

    /// Start a session using storefront settings for the cart store
    #[must_use]
    pub fn with_config(
        orders: Arc<OrderEngine>,
        catalog: Arc<dyn ProductCatalog>,
        session: Arc<dyn Session>,
        config: &StorefrontConfig,
    ) -> Self {
        Self::with_store_config(orders, catalog, session, &config.store_config())
    }

    fn with_store_config(
        orders: Arc<OrderEngine>,
        catalog: Arc<dyn ProductCatalog>,
        session: Arc<dyn Session>,
        store_config: &StoreConfig,
    ) -> Self {
        Self {
            cart: Store::with_config(CartState::default(), CartReducer, (), store_config),
            orders,
            catalog,
            session,
        }
    }

    /// The order engine this session checks out against
    #[must_use]
    pub fn orders(&self) -> &Arc<OrderEngine> {
        &self.orders
    }

    /// Snapshot of the cart
    pub async fn cart(&self) -> CartState {
        self.cart.state(CartState::clone).await
    }

    /// Observe every cart action as it is applied
    #[must_use]
    pub fn subscribe_cart(&self) -> broadcast::Receiver<CartAction> {
        self.cart.subscribe_actions()
    }

    /// Add `quantity` units of a catalog product
    ///
    /// # Errors
    ///
    /// - [`OrderError::Catalog`] if the product cannot be looked up
    /// - [`OrderError::ValidationFailed`] if `quantity` is zero, the product
    ///   is out of stock, or the cart would hold more than the stock
    #[tracing::instrument(skip(self))]
    pub async fn add_product(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartState, OrderError> {
        if quantity == 0 {
            return Err(OrderError::ValidationFailed(
                "quantity must be at least 1".to_string(),
            ));
        }
        let product = self.catalog.get_product(product_id).await?;
        let held = self.cart.state(|cart| cart.quantity_of(&product.id)).await;
        check_stock(&product, u64::from(held) + u64::from(quantity))?;

        self.apply(CartAction::AddOrAdjust {
            product,
            delta: i64::from(quantity),
        })
        .await
    }

    /// Change a line by `delta` units
    ///
    /// Positive deltas go through [`ShopSession::add_product`] and its stock
    /// check. Negative deltas never fail; a line that reaches zero is removed.
    ///
    /// # Errors
    ///
    /// As [`ShopSession::add_product`] for positive deltas.
    pub async fn adjust(&self, product_id: ProductId, delta: i64) -> Result<CartState, OrderError> {
        if delta > 0 {
            let quantity = u32::try_from(delta).unwrap_or(u32::MAX);
            return self.add_product(product_id, quantity).await;
        }

        let line_product = self
            .cart
            .state(|cart| cart.line(&product_id).map(|line| line.product.clone()))
            .await;
        match line_product {
            Some(product) => self.apply(CartAction::AddOrAdjust { product, delta }).await,
            None => Ok(self.cart().await),
        }
    }

    /// Overwrite a line's quantity; zero or less removes the line
    ///
    /// # Errors
    ///
    /// [`OrderError::ValidationFailed`] if `quantity` exceeds current stock;
    /// [`OrderError::Catalog`] if stock cannot be looked up.
    #[tracing::instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartState, OrderError> {
        if quantity > 0 {
            let product = self.catalog.get_product(product_id.clone()).await?;
            check_stock(&product, u64::try_from(quantity).unwrap_or(u64::MAX))?;
        }
        self.apply(CartAction::SetQuantity {
            product_id,
            quantity,
        })
        .await
    }

    /// Drop a line
    ///
    /// # Errors
    ///
    /// [`OrderError::Runtime`] if the cart store is shutting down.
    pub async fn remove(&self, product_id: ProductId) -> Result<CartState, OrderError> {
        self.apply(CartAction::Remove { product_id }).await
    }

    /// Empty the cart
    ///
    /// # Errors
    ///
    /// [`OrderError::Runtime`] if the cart store is shutting down.
    pub async fn clear(&self) -> Result<CartState, OrderError> {
        self.apply(CartAction::Clear).await
    }

    /// Orders placed by the signed-in user
    ///
    /// # Errors
    ///
    /// [`OrderError::NotSignedIn`] without a user; otherwise as
    /// [`OrderEngine::list_for_user`].
    pub async fn order_history(&self) -> Result<Vec<Order>, OrderError> {
        let user_id = self.signed_in_user()?;
        self.orders.list_for_user(user_id).await
    }

    /// Turn the cart into an order
    ///
    /// The cart is cleared only after the order is recorded; on any error it
    /// is left exactly as it was. Once the order is recorded checkout
    /// succeeds, even if the cart can no longer be cleared.
    ///
    /// # Errors
    ///
    /// - [`OrderError::NotSignedIn`] without a user
    /// - [`OrderError::ValidationFailed`] for an empty cart, an incomplete
    ///   address or a blank payment method
    /// - [`OrderError::OutcomeUnknown`] if the order may or may not have been
    ///   recorded; check [`ShopSession::order_history`] before retrying
    /// - whatever else [`OrderEngine::create_order`] reports
    #[tracing::instrument(skip(self, shipping_address))]
    pub async fn checkout(
        &self,
        shipping_address: ShippingAddress,
        payment_method: &str,
    ) -> Result<Order, OrderError> {
        let user_id = self.signed_in_user()?;

        let items = self.cart.state(CartState::snapshot).await;
        if items.is_empty() {
            return Err(OrderError::ValidationFailed("cart is empty".to_string()));
        }
        let missing = shipping_address.missing_fields();
        if !missing.is_empty() {
            return Err(OrderError::ValidationFailed(format!(
                "shipping address is missing {}",
                missing.join(", ")
            )));
        }
        if payment_method.trim().is_empty() {
            return Err(OrderError::ValidationFailed(
                "payment method is required".to_string(),
            ));
        }

        let order = self
            .orders
            .create_order(user_id, items, shipping_address, payment_method.to_string())
            .await
            .inspect_err(|error| match error {
                OrderError::OutcomeUnknown(_) => {
                    tracing::error!(%error, "Checkout outcome unknown, cart kept");
                },
                _ => tracing::warn!(%error, "Checkout failed, cart kept"),
            })?;

        if let Err(error) = self.cart.send(CartAction::Clear).await {
            tracing::warn!(order_id = %order.id, %error, "Order placed but cart not cleared");
        }
        tracing::info!(order_id = %order.id, total = %order.total_amount, "Checkout complete");
        Ok(order)
    }

    /// Stop the cart store, waiting for running effects to finish
    ///
    /// Later cart changes fail with [`OrderError::Runtime`]. The shared order
    /// engine is not affected.
    ///
    /// # Errors
    ///
    /// [`OrderError::Runtime`] if cart effects are still running after `timeout`.
    pub async fn close(&self, timeout: std::time::Duration) -> Result<(), OrderError> {
        self.cart.shutdown(timeout).await?;
        Ok(())
    }

    fn signed_in_user(&self) -> Result<UserId, OrderError> {
        self.session.current_user_id().ok_or(OrderError::NotSignedIn)
    }

    async fn apply(&self, action: CartAction) -> Result<CartState, OrderError> {
        self.cart.send(action).await?;
        Ok(self.cart().await)
    }
}

fn check_stock(product: &Product, wanted: u64) -> Result<(), OrderError> {
    if !product.in_stock() {
        return Err(OrderError::ValidationFailed(format!(
            "{} is out of stock",
            product.name
        )));
    }
    if wanted > u64::from(product.stock) {
        return Err(OrderError::ValidationFailed(format!(
            "only {} of {} in stock",
            product.stock, product.name
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::orders::OrderEnvironment;
    use crate::repository::InMemoryOrderRepository;
    use crate::session::StaticSession;
    use crate::types::Money;
    use storefront_testing::{SequentialIdGenerator, test_clock};

    fn shop(session: StaticSession) -> ShopSession {
        let engine = OrderEngine::new(OrderEnvironment::new(
            Arc::new(InMemoryOrderRepository::new()),
            Arc::new(test_clock()),
            Arc::new(SequentialIdGenerator::new("order")),
        ));
        let catalog = InMemoryCatalog::with_products([
            Product::new("1", "Headphones", Money::from_cents(14_999), 3, "h.jpg"),
            Product::new("2", "Sold Out Lamp", Money::from_cents(4_500), 0, "l.jpg"),
        ]);
        ShopSession::new(Arc::new(engine), Arc::new(catalog), Arc::new(session))
    }

    #[tokio::test]
    async fn stock_limits_additions() {
        let shop = shop(StaticSession::signed_in("user-1"));

        shop.add_product(ProductId::new("1"), 2).await.unwrap();
        let result = shop.add_product(ProductId::new("1"), 2).await;
        assert!(matches!(result, Err(OrderError::ValidationFailed(_))));
        assert_eq!(shop.cart().await.quantity_of(&ProductId::new("1")), 2);

        let result = shop.add_product(ProductId::new("2"), 1).await;
        assert_eq!(
            result,
            Err(OrderError::ValidationFailed("Sold Out Lamp is out of stock".to_string()))
        );

        let result = shop.set_quantity(ProductId::new("1"), 4).await;
        assert!(matches!(result, Err(OrderError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn negative_adjust_never_consults_catalog() {
        let shop = shop(StaticSession::signed_in("user-1"));
        shop.add_product(ProductId::new("1"), 1).await.unwrap();

        let cart = shop.adjust(ProductId::new("1"), -1).await.unwrap();
        assert!(cart.is_empty());

        let cart = shop.adjust(ProductId::new("404"), -1).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn unknown_product_is_a_catalog_error() {
        let shop = shop(StaticSession::signed_in("user-1"));
        let result = shop.add_product(ProductId::new("404"), 1).await;
        assert!(matches!(result, Err(OrderError::Catalog(_))));
    }

    #[tokio::test]
    async fn checkout_validates_before_submitting() {
        let shop = shop(StaticSession::signed_in("user-1"));

        let result = shop.checkout(ShippingAddress::default(), "paypal").await;
        assert_eq!(result, Err(OrderError::ValidationFailed("cart is empty".to_string())));

        shop.add_product(ProductId::new("1"), 1).await.unwrap();
        let result = shop.checkout(ShippingAddress::default(), "paypal").await;
        assert!(matches!(result, Err(OrderError::ValidationFailed(msg)) if msg.contains("zipCode")));

        assert!(!shop.cart().await.is_empty());
        assert!(shop.order_history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn order_stands_when_cart_cannot_be_cleared() {
        let shop = shop(StaticSession::signed_in("user-1"));
        shop.add_product(ProductId::new("1"), 1).await.unwrap();
        shop.close(std::time::Duration::from_secs(1)).await.unwrap();

        let address = ShippingAddress {
            street: "1 Elm St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            country: "USA".to_string(),
            zip_code: "62701".to_string(),
            phone: "555-0100".to_string(),
        };
        let order = shop.checkout(address, "paypal").await.unwrap();

        assert_eq!(shop.order_history().await.unwrap(), vec![order]);
        assert_eq!(shop.cart().await.quantity_of(&ProductId::new("1")), 1);
        assert!(matches!(shop.clear().await, Err(OrderError::Runtime(_))));
    }

    #[tokio::test]
    async fn anonymous_shopper_cannot_check_out() {
        let shop = shop(StaticSession::anonymous());
        shop.add_product(ProductId::new("1"), 1).await.unwrap();

        let result = shop.checkout(ShippingAddress::default(), "paypal").await;
        assert_eq!(result, Err(OrderError::NotSignedIn));
        assert_eq!(shop.order_history().await, Err(OrderError::NotSignedIn));
    }
}
