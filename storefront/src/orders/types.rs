//! Order records and their lifecycle vocabulary.
//!
//! Orders move `pending → processing → shipped → delivered`; a pending order
//! may be cancelled and a delivered one refunded. `cancelled` and `refunded`
//! are terminal.

use crate::cart::CartLine;
use crate::types::{Money, OrderId, ProductId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an order in its lifecycle
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Recorded, awaiting fulfillment
    Pending,
    /// Being prepared
    Processing,
    /// Handed to the carrier
    Shipped,
    /// Received by the customer
    Delivered,
    /// Withdrawn before processing started
    Cancelled,
    /// Money returned after delivery
    Refunded,
}

impl OrderStatus {
    /// Whether no further transition is defined
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }

    /// Whether `next` is an edge of the lifecycle graph from `self`
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing | Self::Cancelled)
                | (Self::Processing, Self::Shipped)
                | (Self::Shipped, Self::Delivered)
                | (Self::Delivered, Self::Refunded)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        })
    }
}

/// Settlement state of an order's payment
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Not yet settled
    Pending,
    /// Settled
    Completed,
    /// Settlement failed
    Failed,
    /// Returned to the customer
    Refunded,
}

/// Where an order is delivered
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    /// Street and number
    pub street: String,
    /// City
    pub city: String,
    /// State or province
    pub state: String,
    /// Country
    pub country: String,
    /// Postal code
    pub zip_code: String,
    /// Contact phone number
    pub phone: String,
}

impl ShippingAddress {
    /// Names of the fields that are blank
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("country", &self.country),
            ("zipCode", &self.zip_code),
            ("phone", &self.phone),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// A cart line frozen into an order
///
/// Holds copies, not references: later catalog edits never change a placed order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Catalog identifier at checkout time
    pub product_id: ProductId,
    /// Product name at checkout time
    pub name: String,
    /// Unit price at checkout time
    pub price: Money,
    /// Units ordered
    pub quantity: u32,
    /// Image reference at checkout time
    pub image: String,
}

impl OrderItem {
    /// Price of this item times its quantity
    #[must_use]
    pub const fn subtotal(&self) -> Money {
        self.price.times(self.quantity)
    }
}

impl From<&CartLine> for OrderItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product.id.clone(),
            name: line.product.name.clone(),
            price: line.product.price,
            quantity: line.quantity,
            image: line.product.image.clone(),
        }
    }
}

/// Transient cart snapshot handed to order creation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    /// Who is ordering
    pub user_id: UserId,
    /// Frozen cart lines
    pub items: Vec<OrderItem>,
    /// Delivery address
    pub shipping_address: ShippingAddress,
    /// Payment method label, e.g. `credit_card`
    pub payment_method: String,
}

impl OrderDraft {
    /// Sum of item subtotals
    #[must_use]
    pub fn total(&self) -> Money {
        self.items.iter().map(OrderItem::subtotal).sum()
    }
}

/// A placed order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order identifier
    pub id: OrderId,
    /// Who placed it
    pub user_id: UserId,
    /// Frozen cart lines
    pub items: Vec<OrderItem>,
    /// Sum of item subtotals at checkout
    pub total_amount: Money,
    /// Lifecycle position
    pub status: OrderStatus,
    /// Settlement state
    pub payment_status: PaymentStatus,
    /// Payment method label
    pub payment_method: String,
    /// Delivery address
    pub shipping_address: ShippingAddress,
    /// When the order was placed
    pub created_at: DateTime<Utc>,
    /// When the order last changed
    pub updated_at: DateTime<Utc>,
    /// Carrier tracking number, once shipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    /// Expected delivery, once shipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    /// Free-text notes (refund reasons end up here)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Order {
    /// Records a draft as a new pending order
    #[must_use]
    pub fn place(id: OrderId, draft: OrderDraft, now: DateTime<Utc>) -> Self {
        let total_amount = draft.total();
        Self {
            id,
            user_id: draft.user_id,
            items: draft.items,
            total_amount,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: draft.payment_method,
            shipping_address: draft.shipping_address,
            created_at: now,
            updated_at: now,
            tracking_number: None,
            estimated_delivery_date: None,
            notes: None,
        }
    }

    /// Same order with a new status
    #[must_use]
    pub fn with_status(mut self, status: OrderStatus, now: DateTime<Utc>) -> Self {
        self.status = status;
        self.updated_at = now;
        self
    }

    /// Same order, refunded, with the reason recorded in `notes`
    #[must_use]
    pub fn refunded(mut self, reason: &str, now: DateTime<Utc>) -> Self {
        let entry = format!("Refund requested: {reason}");
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{entry}"),
            _ => entry,
        });
        self.status = OrderStatus::Refunded;
        self.payment_status = PaymentStatus::Refunded;
        self.updated_at = now;
        self
    }

    /// Same order with carrier details attached
    #[must_use]
    pub fn with_tracking(
        mut self,
        tracking_number: impl Into<String>,
        estimated_delivery_date: Option<DateTime<Utc>>,
    ) -> Self {
        self.tracking_number = Some(tracking_number.into());
        self.estimated_delivery_date = estimated_delivery_date;
        self
    }
}
