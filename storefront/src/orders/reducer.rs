//! Order reducer: lifecycle commands, repository effects and the order book.
//!
//! Commands carry a [`RequestId`]. The reducer stamps identifiers and time
//! from the environment, then describes the repository call as an effect.
//! The effect answers with exactly one result action tagged with the same
//! request id, which both updates the [`OrderBook`] and lets the caller that
//! issued the command pick out its reply.

use super::types::{Order, OrderDraft, OrderStatus};
use crate::error::OrderError;
use crate::repository::OrderRepository;
use crate::types::{OrderId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use storefront_core::effect::Effect;
use storefront_core::environment::{Clock, IdGenerator};
use storefront_core::reducer::Reducer;
use storefront_core::{SmallVec, smallvec};

/// Correlates a command with its result action
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Wraps a raw request number
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// How status changes are checked
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    /// Only edges of the lifecycle graph are allowed
    #[default]
    Strict,
    /// Any status may be set from any status
    Permissive,
}

impl TransitionPolicy {
    /// Check that `order` may move to `to`
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidState`] under [`TransitionPolicy::Strict`]
    /// when `to` is not reachable in one step from the order's status.
    pub fn check(self, order: &Order, to: OrderStatus) -> Result<(), OrderError> {
        match self {
            Self::Permissive => Ok(()),
            Self::Strict if order.status.can_transition_to(to) => Ok(()),
            Self::Strict => Err(OrderError::InvalidState {
                order_id: order.id.clone(),
                from: order.status,
                to,
            }),
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "permissive" | "loose" => Ok(Self::Permissive),
            other => Err(format!("unknown transition policy '{other}'")),
        }
    }
}

/// Orders as last seen by this session
///
/// A cache for display; the repository stays the source of truth.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderBook {
    /// Orders from the last listing plus those placed since
    pub orders: Vec<Order>,
    /// The order last placed or opened
    pub current_order: Option<Order>,
    /// Commands still waiting for their result
    pub in_flight: usize,
    /// Message of the most recent failure
    pub last_error: Option<String>,
}

impl OrderBook {
    /// Whether any command is still waiting for its result
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    fn begin(&mut self) {
        self.in_flight += 1;
        self.last_error = None;
    }

    fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    fn store(&mut self, order: Order) {
        if self.current_order.as_ref().is_some_and(|current| current.id == order.id) {
            self.current_order = Some(order.clone());
        }
        match self.orders.iter_mut().find(|existing| existing.id == order.id) {
            Some(slot) => *slot = order,
            None => self.orders.push(order),
        }
    }
}

/// Commands, their results and book housekeeping
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderAction {
    // ========== Commands ==========
    /// Command: Record a draft as a new order
    PlaceOrder {
        /// Correlation id
        request_id: RequestId,
        /// Frozen cart contents and checkout details
        draft: OrderDraft,
    },

    /// Command: Fetch a user's orders
    LoadOrders {
        /// Correlation id
        request_id: RequestId,
        /// Whose orders
        user_id: UserId,
    },

    /// Command: Fetch one order
    LoadOrder {
        /// Correlation id
        request_id: RequestId,
        /// Which order
        order_id: OrderId,
    },

    /// Command: Move an order to another status
    ChangeStatus {
        /// Correlation id
        request_id: RequestId,
        /// Which order
        order_id: OrderId,
        /// Target status
        status: OrderStatus,
    },

    /// Command: Refund a delivered order
    RequestRefund {
        /// Correlation id
        request_id: RequestId,
        /// Which order
        order_id: OrderId,
        /// Why, recorded in the order's notes
        reason: String,
    },

    // ========== Results ==========
    /// Result: Order stored
    OrderPlaced {
        /// Correlation id
        request_id: RequestId,
        /// The stored order
        order: Order,
    },

    /// Result: User's orders fetched
    OrdersLoaded {
        /// Correlation id
        request_id: RequestId,
        /// Whose orders
        user_id: UserId,
        /// Oldest first
        orders: Vec<Order>,
    },

    /// Result: One order fetched
    OrderLoaded {
        /// Correlation id
        request_id: RequestId,
        /// The order
        order: Order,
    },

    /// Result: Order changed and stored
    OrderUpdated {
        /// Correlation id
        request_id: RequestId,
        /// The stored order
        order: Order,
    },

    /// Result: The command failed; nothing was stored
    RequestFailed {
        /// Correlation id
        request_id: RequestId,
        /// What went wrong
        error: OrderError,
    },

    // ========== Book housekeeping ==========
    /// Forget the current order
    ClearCurrentOrder,

    /// Forget the last error
    DismissError,
}

impl OrderAction {
    /// The request a result action answers, `None` for anything else
    #[must_use]
    pub const fn reply_to(&self) -> Option<RequestId> {
        match self {
            Self::OrderPlaced { request_id, .. }
            | Self::OrdersLoaded { request_id, .. }
            | Self::OrderLoaded { request_id, .. }
            | Self::OrderUpdated { request_id, .. }
            | Self::RequestFailed { request_id, .. } => Some(*request_id),
            _ => None,
        }
    }
}

/// Dependencies of the order reducer
#[derive(Clone)]
pub struct OrderEnvironment {
    /// Where orders live
    pub repository: Arc<dyn OrderRepository>,
    /// Timestamps for creation and updates
    pub clock: Arc<dyn Clock>,
    /// Fresh order identifiers
    pub ids: Arc<dyn IdGenerator>,
    /// How status changes are checked
    pub policy: TransitionPolicy,
}

impl OrderEnvironment {
    /// Creates an environment with the strict transition policy
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            repository,
            clock,
            ids,
            policy: TransitionPolicy::default(),
        }
    }

    /// Same environment with another transition policy
    #[must_use]
    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl fmt::Debug for OrderEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderEnvironment")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Reducer implementing the order lifecycle
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderReducer;

impl OrderReducer {
    /// Turn the outcome of a repository round trip into a result action
    fn reply(
        request_id: RequestId,
        outcome: Result<Order, OrderError>,
        on_success: impl FnOnce(RequestId, Order) -> OrderAction,
    ) -> OrderAction {
        match outcome {
            Ok(order) => on_success(request_id, order),
            Err(error) => OrderAction::RequestFailed { request_id, error },
        }
    }

    /// Effect that fetches an order, applies `change` if the policy allows
    /// moving to `target`, and stores the result
    fn transition_effect<F>(
        env: &OrderEnvironment,
        request_id: RequestId,
        order_id: OrderId,
        target: OrderStatus,
        change: F,
    ) -> Effect<OrderAction>
    where
        F: FnOnce(Order) -> Order + Send + 'static,
    {
        let repository = Arc::clone(&env.repository);
        let policy = env.policy;

        Effect::future(async move {
            let outcome = async {
                let order = repository.fetch(order_id).await?;
                policy.check(&order, target)?;
                Ok::<_, OrderError>(repository.replace(change(order)).await?)
            }
            .await;
            Self::reply(request_id, outcome, |request_id, order| {
                OrderAction::OrderUpdated { request_id, order }
            })
        })
    }
}

impl Reducer for OrderReducer {
    type State = OrderBook;
    type Action = OrderAction;
    type Environment = OrderEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            OrderAction::PlaceOrder { request_id, draft } => {
                state.begin();
                let order = Order::place(OrderId::new(env.ids.next_id()), draft, env.clock.now());
                tracing::debug!(%request_id, order_id = %order.id, total = %order.total_amount, "Submitting order");

                let repository = Arc::clone(&env.repository);
                smallvec![Effect::future(async move {
                    let outcome = repository
                        .submit(order)
                        .await
                        .map_err(|error| OrderError::submission(&error));
                    Self::reply(request_id, outcome, |request_id, order| {
                        OrderAction::OrderPlaced { request_id, order }
                    })
                })]
            },

            OrderAction::LoadOrders {
                request_id,
                user_id,
            } => {
                state.begin();
                let repository = Arc::clone(&env.repository);
                smallvec![Effect::future(async move {
                    match repository.fetch_for_user(user_id.clone()).await {
                        Ok(orders) => OrderAction::OrdersLoaded {
                            request_id,
                            user_id,
                            orders,
                        },
                        Err(error) => OrderAction::RequestFailed {
                            request_id,
                            error: error.into(),
                        },
                    }
                })]
            },

            OrderAction::LoadOrder {
                request_id,
                order_id,
            } => {
                state.begin();
                let repository = Arc::clone(&env.repository);
                smallvec![Effect::future(async move {
                    let outcome = repository.fetch(order_id).await.map_err(OrderError::from);
                    Self::reply(request_id, outcome, |request_id, order| {
                        OrderAction::OrderLoaded { request_id, order }
                    })
                })]
            },

            OrderAction::ChangeStatus {
                request_id,
                order_id,
                status,
            } => {
                state.begin();
                let now = env.clock.now();
                smallvec![Self::transition_effect(
                    env,
                    request_id,
                    order_id,
                    status,
                    move |order| order.with_status(status, now),
                )]
            },

            OrderAction::RequestRefund {
                request_id,
                order_id,
                reason,
            } => {
                state.begin();
                let now = env.clock.now();
                smallvec![Self::transition_effect(
                    env,
                    request_id,
                    order_id,
                    OrderStatus::Refunded,
                    move |order| order.refunded(&reason, now),
                )]
            },

            // ========== Results ==========
            OrderAction::OrderPlaced { order, .. } => {
                state.finish();
                tracing::info!(order_id = %order.id, user_id = %order.user_id, total = %order.total_amount, "Order placed");
                state.current_order = Some(order.clone());
                state.store(order);
                smallvec![Effect::None]
            },

            OrderAction::OrdersLoaded { orders, .. } => {
                state.finish();
                state.orders = orders;
                smallvec![Effect::None]
            },

            OrderAction::OrderLoaded { order, .. } => {
                state.finish();
                state.current_order = Some(order);
                smallvec![Effect::None]
            },

            OrderAction::OrderUpdated { order, .. } => {
                state.finish();
                tracing::info!(order_id = %order.id, status = %order.status, "Order updated");
                state.store(order);
                smallvec![Effect::None]
            },

            OrderAction::RequestFailed { request_id, error } => {
                state.finish();
                tracing::warn!(%request_id, %error, "Order request failed");
                state.last_error = Some(error.to_string());
                smallvec![Effect::None]
            },

            // ========== Book housekeeping ==========
            OrderAction::ClearCurrentOrder => {
                state.current_order = None;
                smallvec![Effect::None]
            },

            OrderAction::DismissError => {
                state.last_error = None;
                smallvec![Effect::None]
            },
        }
    }
}
