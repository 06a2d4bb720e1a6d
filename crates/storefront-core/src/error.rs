//! # Error Types
//!
//! Domain-specific error types for storefront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  storefront-core errors (this file)                                     │
//! │  ├── CoreError          - Domain rule violations                        │
//! │  ├── ValidationError    - Input validation failures                     │
//! │  └── DiscountRejection  - Why a discount code does not apply            │
//! │                                                                         │
//! │  storefront-db errors (separate crate)                                  │
//! │  ├── DbError            - Database operation failures                   │
//! │  └── CheckoutError      - What place_order reports to its caller        │
//! │                                                                         │
//! │  Flow: ValidationError / DiscountRejection / DbError → CheckoutError    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A lifecycle transition that the transition table does not allow.
    ///
    /// ## When This Occurs
    /// - Shipping an order that was never confirmed
    /// - Cancelling an order that has already shipped
    /// - Refunding a payment that was never collected
    #[error("{entity} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// They are raised before any side effect happens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub(crate) fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub(crate) fn too_long(field: &str, max: usize) -> Self {
        ValidationError::TooLong {
            field: field.to_string(),
            max,
        }
    }

    pub(crate) fn invalid_format(field: &str, reason: &str) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// Discount Rejection
// =============================================================================

/// The reason a discount code was refused for an order.
///
/// A rejected code blocks checkout; the order is never placed without it.
/// Each variant maps to a message the storefront can show next to the
/// code input so the shopper knows whether to fix the cart or drop the code.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DiscountRejection {
    /// No discount exists with that code.
    #[error("discount code does not exist")]
    NotFound,

    /// The code has been switched off by an admin.
    #[error("discount code is inactive")]
    Inactive,

    /// The validity window has not opened yet.
    #[error("discount code is not valid until {starts_at}")]
    NotStarted { starts_at: DateTime<Utc> },

    /// The validity window has closed.
    #[error("discount code expired at {ends_at}")]
    Expired { ends_at: DateTime<Utc> },

    /// Every redemption slot has been used.
    #[error("discount code has reached its usage limit of {limit}")]
    UsageLimitReached { limit: i64 },

    /// The order subtotal is below the code's minimum.
    #[error("order amount {actual} is below the minimum of {required}")]
    MinimumNotMet { required: Money, actual: Money },

    /// The code is scoped to products or categories absent from the cart.
    #[error("discount code is not applicable to any product in the order")]
    NotApplicable,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
