//! Order Transition Engine.
//!
//! - [`types`]: the order record and its lifecycle vocabulary
//! - [`reducer`]: commands, results and the [`OrderBook`] they maintain
//! - [`engine`]: the request/response façade callers use

pub mod engine;
pub mod reducer;
pub mod types;

pub use engine::{OrderEngine, OrderStore};
pub use reducer::{
    OrderAction, OrderBook, OrderEnvironment, OrderReducer, RequestId, TransitionPolicy,
};
pub use types::{
    Order, OrderDraft, OrderItem, OrderStatus, PaymentStatus, ShippingAddress,
};
