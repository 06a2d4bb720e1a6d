//! # Discount Evaluator
//!
//! Decides whether a discount code applies to an order and how much it
//! takes off. Pure: the caller supplies the discount row, the priced lines
//! and the clock.
//!
//! ## Evaluation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  evaluate(discount, order_amount, lines, now)                           │
//! │                                                                         │
//! │   is_active?                        no ──► Inactive                     │
//! │   now ≥ starts_at?                  no ──► NotStarted                   │
//! │   now ≤ ends_at?                    no ──► Expired                      │
//! │   usage left?                       no ──► UsageLimitReached            │
//! │   order_amount ≥ min_order?         no ──► MinimumNotMet                │
//! │   scope covers any line?            no ──► NotApplicable                │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   percentage: amount × value% (half-up), capped at max_discount         │
//! │   fixed:      min(value, amount)                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first failing check wins, so the reason reported to the shopper is
//! deterministic.

use chrono::{DateTime, Utc};

use crate::error::{DiscountRejection, ValidationError};
use crate::money::Money;
use crate::pricing::PricedLine;
use crate::types::{Discount, DiscountType};
use crate::validation::validate_discount_code;

/// Evaluates `discount` against an order.
///
/// `order_amount` is the order subtotal. Scope only gates eligibility: the
/// amount is always computed against the whole subtotal.
///
/// ## Example
/// ```rust
/// use chrono::{Duration, Utc};
/// use storefront_core::discount::evaluate;
/// use storefront_core::pricing::PricedLine;
/// use storefront_core::{Discount, DiscountScope, DiscountType, Money};
///
/// let now = Utc::now();
/// let save10 = Discount {
///     id: "d1".into(),
///     code: "SAVE10".into(),
///     description: None,
///     discount_type: DiscountType::Percentage,
///     value: 10,
///     min_order_cents: 0,
///     max_discount_cents: 5000,
///     usage_limit: 0,
///     used_count: 0,
///     is_active: true,
///     starts_at: now - Duration::days(1),
///     ends_at: now + Duration::days(1),
///     created_at: now,
///     updated_at: now,
///     scope: DiscountScope::default(),
/// };
/// let lines = [PricedLine::new("p1", None, "Jacket", Money::from_cents(60000), 1).unwrap()];
///
/// let amount = evaluate(&save10, Money::from_cents(60000), &lines, now).unwrap();
/// assert_eq!(amount.cents(), 5000); // 10% would be 6000, capped
/// ```
pub fn evaluate(
    discount: &Discount,
    order_amount: Money,
    lines: &[PricedLine],
    now: DateTime<Utc>,
) -> Result<Money, DiscountRejection> {
    if !discount.is_active {
        return Err(DiscountRejection::Inactive);
    }
    if now < discount.starts_at {
        return Err(DiscountRejection::NotStarted {
            starts_at: discount.starts_at,
        });
    }
    if now > discount.ends_at {
        return Err(DiscountRejection::Expired {
            ends_at: discount.ends_at,
        });
    }
    if !discount.has_usage_left() {
        return Err(DiscountRejection::UsageLimitReached {
            limit: discount.usage_limit,
        });
    }
    if order_amount < discount.min_order() {
        return Err(DiscountRejection::MinimumNotMet {
            required: discount.min_order(),
            actual: order_amount,
        });
    }
    if !discount.scope.is_unrestricted()
        && !lines
            .iter()
            .any(|line| discount.scope.covers(&line.product_id, line.category_id.as_deref()))
    {
        return Err(DiscountRejection::NotApplicable);
    }

    Ok(amount_for(discount, order_amount))
}

/// Discount amount for an eligible order, never more than `order_amount`.
fn amount_for(discount: &Discount, order_amount: Money) -> Money {
    let order_amount = order_amount.non_negative();

    let amount = match discount.discount_type {
        DiscountType::Percentage => {
            let raw = order_amount.percent_bps(discount.value * 100);
            match discount.max_discount() {
                Some(cap) if raw > cap => cap,
                _ => raw,
            }
        }
        DiscountType::Fixed => Money::from_cents(discount.value),
    };

    if amount > order_amount {
        order_amount
    } else {
        amount.non_negative()
    }
}

/// Checks an admin-supplied discount definition before it is stored.
pub fn validate_definition(discount: &Discount) -> Result<(), ValidationError> {
    validate_discount_code(&discount.code)?;

    match discount.discount_type {
        DiscountType::Percentage if !(1..=100).contains(&discount.value) => {
            return Err(ValidationError::OutOfRange {
                field: "value".to_string(),
                min: 1,
                max: 100,
            });
        }
        DiscountType::Fixed if discount.value <= 0 => {
            return Err(ValidationError::MustBePositive {
                field: "value".to_string(),
            });
        }
        _ => {}
    }

    for (field, value) in [
        ("min_order_cents", discount.min_order_cents),
        ("max_discount_cents", discount.max_discount_cents),
        ("usage_limit", discount.usage_limit),
        ("used_count", discount.used_count),
    ] {
        if value < 0 {
            return Err(ValidationError::OutOfRange {
                field: field.to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
    }

    if discount.starts_at >= discount.ends_at {
        return Err(ValidationError::invalid_format(
            "ends_at",
            "must be after starts_at",
        ));
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
