//! # storefront-core: Pure Business Logic for the Storefront Order Engine
//!
//! This crate holds every rule of order placement that can be expressed
//! without touching a database: money arithmetic, discount evaluation,
//! order-code formatting, shipping policy, status lifecycles and input
//! validation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Storefront Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              HTTP layer / admin tools (not in this repo)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ OrderRequest                           │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          storefront-db: CheckoutService (transaction)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ pure calls                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ storefront-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌──────────┐ ┌────────────┐ ┌─────────┐ ┌───────┐ │   │
//! │  │  │  types  │ │ discount │ │ order_code │ │ pricing │ │ valid │ │   │
//! │  │  │ Order   │ │ evaluate │ │ ORD-DDMMYY │ │shipping │ │ ation │ │   │
//! │  │  └─────────┘ └──────────┘ └────────────┘ └─────────┘ └───────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, Discount, Customer, status enums)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`discount`] - Discount evaluator
//! - [`order_code`] - `PREFIX-DDMMYY###` order code format
//! - [`pricing`] - Priced lines, shipping policy, order totals
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation and normalisation
//!
//! ## Example Usage
//!
//! ```rust
//! use storefront_core::money::Money;
//! use storefront_core::pricing::{OrderTotals, ShippingPolicy};
//!
//! let subtotal = Money::from_cents(60000);
//! let discount = Money::from_cents(5000);
//! let shipping = ShippingPolicy::default().shipping_for(subtotal);
//!
//! let totals = OrderTotals::compute(subtotal, discount, shipping);
//! assert_eq!(totals.total.cents(), 55000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod discount;
pub mod error;
pub mod money;
pub mod order_code;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, DiscountRejection, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of distinct product lines in one order.
pub const MAX_ORDER_LINES: usize = 50;

/// Maximum quantity of a single product in one order.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest catalog price accepted, in cents (100,000,000.00).
///
/// At this price a full order (50 lines of 999 units) still fits in an i64.
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;

/// Credential stored for customers provisioned from a guest checkout.
///
/// It is not a valid hash of any password, so the account cannot sign in
/// until the owner sets a password through the account-recovery flow.
pub const GUEST_PASSWORD_SENTINEL: &str = "!guest-checkout-no-login";

/// Order code prefix used when none is configured.
pub const DEFAULT_ORDER_CODE_PREFIX: &str = "ORD";
