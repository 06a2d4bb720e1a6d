//! # Pricing
//!
//! Priced order lines, the shipping policy and the final totals identity.
//!
//! ## Totals Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PricedLine × N                                                         │
//! │    unit_price (catalog price at checkout) × quantity = line_total       │
//! │       │                                                                 │
//! │       ▼ Σ                                                               │
//! │  subtotal ──► discount (evaluator, ≤ subtotal)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  shipping = 0 if subtotal ≥ threshold else flat fee                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  total = subtotal - discount + shipping                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;

/// One order line priced against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: String,
    pub category_id: Option<String>,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

impl PricedLine {
    /// Prices a line, failing if `unit_price × quantity` overflows.
    pub fn new(
        product_id: impl Into<String>,
        category_id: Option<String>,
        name: impl Into<String>,
        unit_price: Money,
        quantity: i64,
    ) -> Result<Self, ValidationError> {
        let line_total = unit_price
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| amount_too_large("line_total"))?;

        Ok(PricedLine {
            product_id: product_id.into(),
            category_id,
            name: name.into(),
            unit_price,
            quantity,
            line_total,
        })
    }
}

/// Sum of all line totals.
pub fn subtotal(lines: &[PricedLine]) -> Result<Money, ValidationError> {
    lines.iter().try_fold(Money::zero(), |sum, line| {
        sum.checked_add(line.line_total)
            .ok_or_else(|| amount_too_large("subtotal"))
    })
}

fn amount_too_large(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
}

// =============================================================================
// Shipping
// =============================================================================

/// Flat-fee shipping waived above a subtotal threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    /// Subtotals at or above this ship free.
    pub free_shipping_threshold: Money,
    pub flat_fee: Money,
}

impl ShippingPolicy {
    pub const fn new(free_shipping_threshold: Money, flat_fee: Money) -> Self {
        ShippingPolicy {
            free_shipping_threshold,
            flat_fee,
        }
    }

    /// Shipping charged for an order with the given subtotal.
    ///
    /// The threshold is compared against the subtotal before discount.
    pub fn shipping_for(&self, subtotal: Money) -> Money {
        if subtotal >= self.free_shipping_threshold {
            Money::zero()
        } else {
            self.flat_fee
        }
    }
}

impl Default for ShippingPolicy {
    /// 500.00 threshold, 30.00 flat fee.
    fn default() -> Self {
        ShippingPolicy::new(Money::from_cents(50_000), Money::from_cents(3_000))
    }
}

// =============================================================================
// Totals
// =============================================================================

/// The four amounts stored on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub shipping: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Computes `total = subtotal - discount + shipping`.
    ///
    /// The discount is clamped to `0..=subtotal`, so the total never drops
    /// below the shipping charge.
    pub fn compute(subtotal: Money, discount: Money, shipping: Money) -> Self {
        let discount = if discount > subtotal {
            subtotal
        } else {
            discount.non_negative()
        };

        OrderTotals {
            subtotal,
            discount,
            shipping,
            total: subtotal - discount + shipping,
        }
    }
}
