//! Cart ledger: product quantities and their derived total.
//!
//! The ledger is a pure reducer. Every action recomputes the total before
//! the reducer returns, so a stale total is never observable, and a line
//! whose quantity would drop to zero is removed instead of stored.

use crate::orders::OrderItem;
use crate::types::{Money, Product, ProductId};
use serde::{Deserialize, Serialize};
use storefront_core::effect::Effect;
use storefront_core::reducer::Reducer;
use storefront_core::{SmallVec, smallvec};

/// One product-quantity pairing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product as it was when the line was created
    pub product: Product,
    /// Always at least 1
    pub quantity: u32,
}

impl CartLine {
    /// Unit price times quantity
    #[must_use]
    pub const fn subtotal(&self) -> Money {
        self.product.price.times(self.quantity)
    }
}

/// The cart of one session
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    lines: Vec<CartLine>,
    total: Money,
}

impl CartState {
    /// Lines in insertion order
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Sum of line subtotals
    #[must_use]
    pub const fn total(&self) -> Money {
        self.total
    }

    /// The line for a product, if present
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.product.id == product_id)
    }

    /// Quantity held for a product (0 when absent)
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.line(product_id).map_or(0, |line| line.quantity)
    }

    /// Whether the cart has no lines
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across lines
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Frozen copies of the lines for order creation
    #[must_use]
    pub fn snapshot(&self) -> Vec<OrderItem> {
        self.lines.iter().map(OrderItem::from).collect()
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| &line.product.id == product_id)
    }

    /// Set a line's quantity, dropping the line at zero
    fn settle(&mut self, index: usize, quantity: u32) {
        if quantity == 0 {
            self.lines.remove(index);
        } else if let Some(line) = self.lines.get_mut(index) {
            line.quantity = quantity;
        }
    }

    fn recompute_total(&mut self) {
        self.total = self.lines.iter().map(CartLine::subtotal).sum();
    }
}

/// Clamp a signed quantity into `0..=u32::MAX`
fn clamp_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity.max(0)).unwrap_or(u32::MAX)
}

/// Inputs to the cart ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartAction {
    /// Add `delta` units of `product`; a negative delta removes units
    ///
    /// An absent product with a non-positive delta is ignored.
    AddOrAdjust {
        /// Product to add or adjust
        product: Product,
        /// Signed change in quantity
        delta: i64,
    },
    /// Overwrite a line's quantity; 0 or less removes it
    ///
    /// Ignored when the product has no line.
    SetQuantity {
        /// Product whose line to change
        product_id: ProductId,
        /// New absolute quantity
        quantity: i64,
    },
    /// Drop a line if present
    Remove {
        /// Product whose line to drop
        product_id: ProductId,
    },
    /// Drop every line
    Clear,
}

/// Reducer for the cart ledger
///
/// Never fails: out-of-range inputs are clamped. Never produces effects.
#[derive(Clone, Copy, Debug, Default)]
pub struct CartReducer;

impl Reducer for CartReducer {
    type State = CartState;
    type Action = CartAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CartAction::AddOrAdjust { product, delta } => match state.position(&product.id) {
                Some(index) => {
                    let current = state.lines.get(index).map_or(0, |line| line.quantity);
                    let quantity = clamp_quantity(i64::from(current).saturating_add(delta));
                    state.settle(index, quantity);
                },
                None if delta > 0 => {
                    state.lines.push(CartLine {
                        product,
                        quantity: clamp_quantity(delta),
                    });
                },
                None => {
                    tracing::trace!(product_id = %product.id, delta, "Ignoring removal from absent line");
                },
            },
            CartAction::SetQuantity {
                product_id,
                quantity,
            } => {
                if let Some(index) = state.position(&product_id) {
                    state.settle(index, clamp_quantity(quantity));
                }
            },
            CartAction::Remove { product_id } => {
                state.lines.retain(|line| line.product.id != product_id);
            },
            CartAction::Clear => {
                state.lines.clear();
            },
        }

        state.recompute_total();
        smallvec![Effect::None]
    }
}
