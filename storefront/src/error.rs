//! Errors surfaced by the order engine and the checkout session.

use crate::catalog::CatalogError;
use crate::orders::OrderStatus;
use crate::repository::RepositoryError;
use crate::types::OrderId;
use storefront_runtime::StoreError;
use thiserror::Error;

/// Errors returned by order and checkout operations
///
/// `Clone` so that failures can travel inside broadcast actions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// No order with this id
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// The requested status change is not an edge of the lifecycle graph
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidState {
        /// Order that was asked to move
        order_id: OrderId,
        /// Its current status
        from: OrderStatus,
        /// The refused target status
        to: OrderStatus,
    },

    /// The order service refused or could not be reached
    #[error("Order submission failed: {0}")]
    SubmissionFailed(String),

    /// Caller input was malformed (empty cart, address, payment method, stock)
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Checkout needs a signed-in user
    #[error("Sign in to check out")]
    NotSignedIn,

    /// Product lookup failed
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The store running the engine or cart is shutting down or unresponsive
    #[error("Order engine unavailable: {0}")]
    Runtime(String),

    /// A write was sent but its result was lost; it may have been applied
    ///
    /// Not safe to retry blindly. Check the order history first.
    #[error("Order outcome unknown: {0}")]
    OutcomeUnknown(String),
}

impl OrderError {
    /// Any repository failure while submitting a new order
    #[must_use]
    pub fn submission(error: &RepositoryError) -> Self {
        Self::SubmissionFailed(error.to_string())
    }
}

impl From<RepositoryError> for OrderError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(order_id) => Self::NotFound(order_id),
            RepositoryError::Rejected(_) | RepositoryError::Unavailable(_) => {
                Self::submission(&error)
            },
        }
    }
}

impl From<StoreError> for OrderError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Lagged(_) => Self::OutcomeUnknown(error.to_string()),
            _ => Self::Runtime(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_errors_map_to_order_errors() {
        assert_eq!(
            OrderError::from(RepositoryError::NotFound(OrderId::new("x"))),
            OrderError::NotFound(OrderId::new("x"))
        );
        assert_eq!(
            OrderError::from(RepositoryError::Unavailable("timeout".to_string())),
            OrderError::SubmissionFailed("Order service unavailable: timeout".to_string())
        );
    }

    #[test]
    fn lost_replies_are_not_plain_runtime_failures() {
        assert_eq!(
            OrderError::from(StoreError::Lagged(3)),
            OrderError::OutcomeUnknown("Observer lagged, 3 actions skipped".to_string())
        );
        assert_eq!(
            OrderError::from(StoreError::Timeout),
            OrderError::Runtime("Timeout waiting for action".to_string())
        );
    }

    #[test]
    fn invalid_state_message() {
        let error = OrderError::InvalidState {
            order_id: OrderId::new("7"),
            from: OrderStatus::Shipped,
            to: OrderStatus::Cancelled,
        };
        assert_eq!(error.to_string(), "Order 7 cannot move from shipped to cancelled");
    }
}
