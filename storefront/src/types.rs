//! Identifiers, money and the catalog's product reference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the inner string value
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Catalog identifier of a product
    ProductId
);
string_id!(
    /// Identifier of a signed-in shopper
    UserId
);
string_id!(
    /// Identifier of a placed order
    OrderId
);

/// Money amount in cents (to avoid floating point issues)
///
/// Arithmetic saturates rather than wrapping; a cart can't hold enough items
/// to get anywhere near the limit.
///
/// Serialized as a decimal dollar number (`449.97`), the shape order records
/// take on the wire. Deserializing rounds to the nearest cent.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub struct Money(i64);

/// Largest cent count an `f64` holds exactly
const MAX_EXACT_CENTS: f64 = 9_007_199_254_740_992.0;

impl Money {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// Creates a new money amount from cents
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the value in cents
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns the value in dollars (as floating point)
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // i64 to f64 precision loss is acceptable for display
    pub fn dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Price of `quantity` units at this unit price
    #[must_use]
    pub const fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as i64))
    }
}

impl From<Money> for f64 {
    fn from(money: Money) -> Self {
        money.dollars()
    }
}

impl TryFrom<f64> for Money {
    type Error = String;

    #[allow(clippy::cast_possible_truncation)] // Range checked first
    fn try_from(dollars: f64) -> Result<Self, Self::Error> {
        let cents = (dollars * 100.0).round();
        if cents.is_finite() && cents.abs() <= MAX_EXACT_CENTS {
            Ok(Self(cents as i64))
        } else {
            Err(format!("{dollars} is not a money amount"))
        }
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

/// A product as the catalog describes it
///
/// Owned by the catalog. The cart keeps a copy per line and never edits it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog identifier
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Unit price
    pub price: Money,
    /// Units available for sale
    pub stock: u32,
    /// Display image reference
    pub image: String,
}

impl Product {
    /// Creates a product reference
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        stock: u32,
        image: impl Into<String>,
    ) -> Self {
        Self {
            id: ProductId::new(id),
            name: name.into(),
            price,
            stock,
            image: image.into(),
        }
    }

    /// Whether any units can be sold
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_times_quantity() {
        assert_eq!(Money::from_cents(14_999).times(3), Money::from_cents(44_997));
        assert_eq!(Money::from_cents(i64::MAX).times(2), Money::from_cents(i64::MAX));
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::from_cents(44_997).to_string(), "$449.97");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-250).to_string(), "-$2.50");
    }

    #[test]
    fn money_sum() {
        let total: Money = [Money::from_cents(100), Money::from_cents(250)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_cents(350));
        assert!((total.dollars() - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn money_travels_as_decimal_dollars() {
        let price = Money::from_cents(44_997);
        assert_eq!(serde_json::to_value(price).ok(), Some(serde_json::json!(449.97)));

        let read: Result<Money, _> = serde_json::from_str("19.99");
        assert_eq!(read.ok(), Some(Money::from_cents(1_999)));
        let read: Result<Money, _> = serde_json::from_str("12");
        assert_eq!(read.ok(), Some(Money::from_cents(1_200)));
        assert!(Money::try_from(f64::NAN).is_err());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = OrderId::new("abc123");
        assert_eq!(serde_json::to_string(&id).ok().as_deref(), Some("\"abc123\""));
        assert_eq!(id.to_string(), "abc123");
    }
}
