//! # Domain Types
//!
//! Core domain types of the order engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Order       │   │    Discount     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  order_code     │   │  code           │       │
//! │  │  price_cents    │   │  status         │   │  type / value   │       │
//! │  │  stock          │   │  total_cents    │   │  used_count     │       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │                                 │ owns                                  │
//! │  ┌─────────────────┐   ┌────────▼────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │   OrderItem     │   │ DiscountUsage   │       │
//! │  │  email / phone  │   │  price snapshot │   │ discount+order  │       │
//! │  │  aggregates     │   │  line_total     │   │ +customer       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, order_code, discount code, email) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A catalog product together with its inventory record.
///
/// The checkout reads this inside its transaction, so `price_cents` and
/// `stock` are the values the order is priced and reserved against.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name; copied into order items at checkout.
    pub name: String,

    pub description: Option<String>,

    /// Current price in cents.
    pub price_cents: i64,

    /// Units available for sale. Never negative.
    pub stock: i64,

    /// Category owned by the catalog subsystem (opaque here).
    pub category_id: Option<String>,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` units can be taken from stock.
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        self.is_active && quantity > 0 && self.stock >= quantity
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle of an order.
///
/// ## Transition Table
/// ```text
/// pending ──► confirmed ──► shipped ──► delivered
///    │            │
///    └────────────┴──► cancelled
/// ```
/// Anything not drawn above is rejected, including "transitions" to the
/// current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, waiting for the shop to accept it.
    Pending,
    /// Accepted by the shop.
    Confirmed,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer.
    Delivered,
    /// Called off before shipping.
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the transition table has an edge from `self` to `next`.
    pub const fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Confirmed)
                | (OrderStatus::Confirmed, OrderStatus::Shipped)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Confirmed, OrderStatus::Cancelled)
        )
    }

    /// Validates a transition, returning the new status.
    pub fn transition_to(self, next: OrderStatus) -> CoreResult<OrderStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidStatusTransition {
                entity: "order",
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    /// No further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        !Self::ALL.iter().any(|next| self.can_transition_to(*next))
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL.iter().map(|v| v.to_string()).collect(),
            })
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Where the money for an order stands.
///
/// ## Transition Table
/// ```text
/// pending ──► paid ──► refunded
///    ▲  │
///    │  ▼
///   failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub const fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Paid)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Failed, PaymentStatus::Pending)
                | (PaymentStatus::Paid, PaymentStatus::Refunded)
        )
    }

    pub fn transition_to(self, next: PaymentStatus) -> CoreResult<PaymentStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidStatusTransition {
                entity: "payment",
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the shopper intends to pay. A closed set.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Cod,
    BankTransfer,
    Card,
    EWallet,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cod,
        PaymentMethod::BankTransfer,
        PaymentMethod::Card,
        PaymentMethod::EWallet,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Card => "card",
            PaymentMethod::EWallet => "e_wallet",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        PaymentMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: PaymentMethod::ALL.iter().map(|m| m.to_string()).collect(),
            })
    }
}

// =============================================================================
// Order
// =============================================================================

/// One customer purchase.
///
/// `total_cents == subtotal_cents - discount_cents + shipping_cents` holds
/// for every stored order; see [`crate::pricing::OrderTotals`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Human-readable code, `PREFIX-DDMMYY###`. Immutable once assigned.
    pub order_code: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    /// Code of the discount applied, if any.
    pub discount_code: Option<String>,
    /// Linked customer. Guest orders get one from reconciliation before commit.
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub shipping_address: String,
    pub notes: Option<String>,
    /// Placed without an authenticated session.
    pub is_guest: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub shipped_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    #[inline]
    pub fn shipping(&self) -> Money {
        Money::from_cents(self.shipping_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Checks the stored amounts against the totals identity.
    pub fn totals_are_consistent(&self) -> bool {
        self.subtotal() - self.discount() + self.shipping() == self.total()
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line item in an order.
/// Uses snapshot pattern to freeze product data at time of order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at time of order (frozen).
    pub name_snapshot: String,
    /// Unit price in cents at time of order (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// unit_price × quantity.
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// An order with its items, as returned by checkout.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// A customer record was provisioned for this order.
    pub customer_created: bool,
}

// =============================================================================
// Customer
// =============================================================================

/// A user record, unique by email and by phone.
///
/// The aggregate columns are only written by the checkout transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Normalised (trimmed, lower-case). Also the login identity.
    pub email: String,
    /// Normalised (digits and leading `+` only).
    pub phone: Option<String>,
    #[serde(skip)]
    #[ts(skip)]
    pub password_hash: String,
    /// Provisioned by a guest checkout.
    pub is_guest: bool,
    pub total_orders: i64,
    pub total_spent_cents: i64,
    #[ts(as = "Option<String>")]
    pub last_order_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    #[inline]
    pub fn total_spent(&self) -> Money {
        Money::from_cents(self.total_spent_cents)
    }

    /// Guest-provisioned accounts carry the sentinel credential.
    pub fn can_authenticate(&self) -> bool {
        self.password_hash != crate::GUEST_PASSWORD_SENTINEL
    }
}

// =============================================================================
// Discount
// =============================================================================

/// How a discount's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` is a whole percentage of the order amount (0-100).
    Percentage,
    /// `value` is an amount in cents.
    Fixed,
}

/// Products and categories a discount is limited to.
///
/// Both lists empty means the discount applies to everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountScope {
    pub product_ids: Vec<String>,
    pub category_ids: Vec<String>,
}

impl DiscountScope {
    pub fn is_unrestricted(&self) -> bool {
        self.product_ids.is_empty() && self.category_ids.is_empty()
    }

    /// Whether a product (or its category) is on the allow-list.
    pub fn covers(&self, product_id: &str, category_id: Option<&str>) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        self.product_ids.iter().any(|id| id == product_id)
            || category_id.is_some_and(|cat| self.category_ids.iter().any(|id| id == cat))
    }
}

/// A promotional code.
///
/// ## Usage Counter
/// `used_count <= usage_limit` whenever `usage_limit > 0`. The counter is
/// incremented only by a committed checkout and lowered only by an
/// explicit admin correction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Discount {
    pub id: String,
    /// Upper-case code the shopper types (matched case-insensitively).
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    /// Percent (0-100) or cents, depending on `discount_type`.
    pub value: i64,
    /// Minimum order subtotal in cents.
    pub min_order_cents: i64,
    /// Cap for percentage discounts in cents; 0 means no cap.
    pub max_discount_cents: i64,
    /// 0 means unlimited.
    pub usage_limit: i64,
    pub used_count: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub starts_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub ends_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// Loaded from the scope tables, not the discounts row.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub scope: DiscountScope,
}

impl Discount {
    #[inline]
    pub fn min_order(&self) -> Money {
        Money::from_cents(self.min_order_cents)
    }

    /// The percentage cap, if one is set.
    pub fn max_discount(&self) -> Option<Money> {
        (self.max_discount_cents > 0).then(|| Money::from_cents(self.max_discount_cents))
    }

    pub fn has_usage_left(&self) -> bool {
        self.usage_limit == 0 || self.used_count < self.usage_limit
    }
}

/// One redemption of a discount by a committed order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DiscountUsage {
    pub id: String,
    pub discount_id: String,
    pub customer_id: String,
    pub order_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order Request
// =============================================================================

/// One requested product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLineRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// What a shopper submits at checkout.
///
/// ## Example (JSON)
/// ```json
/// {
///   "customer_name": "Lan Nguyen",
///   "customer_phone": "0900000000",
///   "customer_email": "a@x.com",
///   "shipping_address": "12 Tran Hung Dao, District 1",
///   "payment_method": "cod",
///   "discount_code": "SAVE10",
///   "items": [{ "product_id": "…", "quantity": 2 }]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderRequest {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub shipping_address: String,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub discount_code: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Set when the shopper is signed in; skips contact reconciliation.
    #[serde(default)]
    pub customer_id: Option<String>,
    pub items: Vec<OrderLineRequest>,
}

// =============================================================================
// Unit Tests
// =============================================================================
