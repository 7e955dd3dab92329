//! Request/response façade over the order store.
//!
//! Each call sends one command and waits for the result action carrying the
//! same [`RequestId`]. Failures come back as [`OrderError`] values and leave
//! the repository untouched.
//!
//! Reads give up after the configured request timeout. Writes never do: once
//! a write effect is running it may still land, so reporting it as failed
//! would invite a duplicate retry. A slow repository makes writes slow, not
//! failed.

use super::reducer::{OrderAction, OrderBook, OrderEnvironment, OrderReducer, RequestId};
use super::types::{Order, OrderDraft, OrderItem, OrderStatus, ShippingAddress};
use crate::config::StorefrontConfig;
use crate::error::OrderError;
use crate::types::{OrderId, UserId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use storefront_runtime::{Store, StoreConfig};
use tokio::sync::broadcast;

/// Store running the order reducer
pub type OrderStore = Store<OrderBook, OrderAction, OrderEnvironment, OrderReducer>;

/// Order lifecycle operations for one storefront
#[derive(Debug)]
pub struct OrderEngine {
    store: OrderStore,
    next_request: AtomicU64,
    request_timeout: Duration,
}

impl OrderEngine {
    /// Create an engine with default settings
    #[must_use]
    pub fn new(env: OrderEnvironment) -> Self {
        Self::with_store_config(
            env,
            &StoreConfig::default(),
            StorefrontConfig::default().request_timeout(),
        )
    }

    /// Create an engine from storefront settings
    ///
    /// The configured transition policy replaces the one in `env`.
    #[must_use]
    pub fn with_config(env: OrderEnvironment, config: &StorefrontConfig) -> Self {
        Self::with_store_config(
            env.with_policy(config.transition_policy),
            &config.store_config(),
            config.request_timeout(),
        )
    }

    fn with_store_config(
        env: OrderEnvironment,
        store_config: &StoreConfig,
        request_timeout: Duration,
    ) -> Self {
        Self {
            store: Store::with_config(OrderBook::default(), OrderReducer, env, store_config),
            next_request: AtomicU64::new(1),
            request_timeout,
        }
    }

    /// Send a read and wait up to the request timeout for its result
    async fn request<F>(&self, build: F) -> Result<OrderAction, OrderError>
    where
        F: FnOnce(RequestId) -> OrderAction,
    {
        let request_id = self.next_request_id();
        let reply = self
            .store
            .send_and_wait_for(
                build(request_id),
                |action| action.reply_to() == Some(request_id),
                self.request_timeout,
            )
            .await?;

        settle(reply)
    }

    /// Send a write and wait for its result however long it takes
    async fn command<F>(&self, build: F) -> Result<OrderAction, OrderError>
    where
        F: FnOnce(RequestId) -> OrderAction,
    {
        let request_id = self.next_request_id();
        let reply = self
            .store
            .send_and_await(build(request_id), |action| {
                action.reply_to() == Some(request_id)
            })
            .await
            .map_err(OrderError::from)
            .inspect_err(|error| {
                if matches!(error, OrderError::OutcomeUnknown(_)) {
                    tracing::error!(%request_id, %error, "Lost the result of an order write");
                }
            })?;

        settle(reply)
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::new(self.next_request.fetch_add(1, Ordering::Relaxed))
    }

    /// Record a new pending order for `user_id`
    ///
    /// `items` are frozen copies; the engine never reads the cart.
    ///
    /// # Errors
    ///
    /// [`OrderError::SubmissionFailed`] if the repository refuses the order;
    /// [`OrderError::Runtime`] if the engine is shutting down;
    /// [`OrderError::OutcomeUnknown`] if the result was lost, in which case
    /// the order may exist.
    #[tracing::instrument(skip(self, items, shipping_address), fields(items = items.len()))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        payment_method: String,
    ) -> Result<Order, OrderError> {
        let draft = OrderDraft {
            user_id,
            items,
            shipping_address,
            payment_method,
        };
        match self
            .command(|request_id| OrderAction::PlaceOrder { request_id, draft })
            .await?
        {
            OrderAction::OrderPlaced { order, .. } => Ok(order),
            other => Err(unexpected(&other)),
        }
    }

    /// Every order placed by `user_id`, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be read.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        match self
            .request(|request_id| OrderAction::LoadOrders { request_id, user_id })
            .await?
        {
            OrderAction::OrdersLoaded { orders, .. } => Ok(orders),
            other => Err(unexpected(&other)),
        }
    }

    /// One order by id
    ///
    /// # Errors
    ///
    /// [`OrderError::NotFound`] if no such order exists.
    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, order_id: OrderId) -> Result<Order, OrderError> {
        match self
            .request(|request_id| OrderAction::LoadOrder { request_id, order_id })
            .await?
        {
            OrderAction::OrderLoaded { order, .. } => Ok(order),
            other => Err(unexpected(&other)),
        }
    }

    /// Move an order to `status`
    ///
    /// # Errors
    ///
    /// [`OrderError::NotFound`] if no such order exists;
    /// [`OrderError::InvalidState`] if the transition policy refuses the move.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, OrderError> {
        self.transition(|request_id| OrderAction::ChangeStatus {
            request_id,
            order_id,
            status,
        })
        .await
    }

    /// Cancel an order
    ///
    /// # Errors
    ///
    /// As [`OrderEngine::update_status`] with [`OrderStatus::Cancelled`].
    pub async fn cancel(&self, order_id: OrderId) -> Result<Order, OrderError> {
        self.update_status(order_id, OrderStatus::Cancelled).await
    }

    /// Refund an order, recording `reason` in its notes
    ///
    /// # Errors
    ///
    /// [`OrderError::NotFound`] if no such order exists;
    /// [`OrderError::InvalidState`] if the transition policy refuses the move.
    #[tracing::instrument(skip(self))]
    pub async fn request_refund(
        &self,
        order_id: OrderId,
        reason: String,
    ) -> Result<Order, OrderError> {
        self.transition(|request_id| OrderAction::RequestRefund {
            request_id,
            order_id,
            reason,
        })
        .await
    }

    async fn transition<F>(&self, build: F) -> Result<Order, OrderError>
    where
        F: FnOnce(RequestId) -> OrderAction,
    {
        match self.command(build).await? {
            OrderAction::OrderUpdated { order, .. } => Ok(order),
            other => Err(unexpected(&other)),
        }
    }

    /// Observe every action the engine reduces
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OrderAction> {
        self.store.subscribe_actions()
    }

    /// Read the order book
    pub async fn book<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&OrderBook) -> T,
    {
        self.store.state(f).await
    }

    /// Forget the current order
    ///
    /// # Errors
    ///
    /// [`OrderError::Runtime`] if the engine is shutting down.
    pub async fn clear_current_order(&self) -> Result<(), OrderError> {
        self.store.send(OrderAction::ClearCurrentOrder).await?;
        Ok(())
    }

    /// Forget the last error
    ///
    /// # Errors
    ///
    /// [`OrderError::Runtime`] if the engine is shutting down.
    pub async fn dismiss_error(&self) -> Result<(), OrderError> {
        self.store.send(OrderAction::DismissError).await?;
        Ok(())
    }

    /// Stop accepting requests and wait for in-flight ones to finish
    ///
    /// # Errors
    ///
    /// [`OrderError::Runtime`] if requests are still running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), OrderError> {
        self.store.shutdown(timeout).await?;
        Ok(())
    }
}

fn settle(reply: OrderAction) -> Result<OrderAction, OrderError> {
    match reply {
        OrderAction::RequestFailed { error, .. } => Err(error),
        reply => Ok(reply),
    }
}

/// A reply of the wrong kind; the reducer pairs every command with one kind
fn unexpected(action: &OrderAction) -> OrderError {
    tracing::error!(?action, "Unexpected reply to order request");
    OrderError::Runtime(format!("unexpected reply {action:?}"))
}
