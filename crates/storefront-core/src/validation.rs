//! # Validation Module
//!
//! Input validation and normalisation for the order engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront frontend                                           │
//! │  └── Basic format checks, immediate feedback                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any transaction is opened)                │
//! │  ├── Contact fields, payment method, discount code format               │
//! │  ├── Line count / quantity bounds                                       │
//! │  └── Normalisation (email case, phone punctuation, merged lines)        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── CHECK (stock >= 0), CHECK (used_count <= usage_limit)              │
//! │  ├── UNIQUE (order_code), UNIQUE (email), UNIQUE (phone)                │
//! │  └── Foreign key constraints                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use storefront_core::validation::{normalize_email, normalize_phone, validate_quantity};
//!
//! assert_eq!(normalize_email("  A@X.com ").unwrap(), "a@x.com");
//! assert_eq!(normalize_phone("0900 000-000").unwrap(), "0900000000");
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::types::{OrderLineRequest, OrderRequest, PaymentMethod};
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_LINES, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 254;
const MAX_ADDRESS_LEN: usize = 500;
const MAX_NOTES_LEN: usize = 1000;
const MAX_DISCOUNT_CODE_LEN: usize = 32;
const MAX_ORDER_CODE_PREFIX_LEN: usize = 10;
const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 8..=15;

// =============================================================================
// Catalog Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 50 characters
/// - Should contain only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_sku;
///
/// assert!(validate_sku("JKT-NAVY-M").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::required("sku"));
    }

    if sku.len() > 50 {
        return Err(ValidationError::too_long("sku", 50));
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid_format(
            "sku",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::too_long("name", 200));
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a restock amount.
pub fn validate_restock_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "restock quantity".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    validate_uuid_field("id", id)
}

fn validate_uuid_field(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    uuid::Uuid::parse_str(id.trim())
        .map_err(|_| ValidationError::invalid_format(field, "must be a valid UUID"))?;

    Ok(())
}

// =============================================================================
// Contact Validators
// =============================================================================

/// Trims and lower-cases an email address after checking its shape.
///
/// The check is deliberately loose: one `@`, a non-empty local part and a
/// dotted domain, no whitespace.
pub fn normalize_email(email: &str) -> ValidationResult<String> {
    let email = email.trim().to_lowercase();

    if email.is_empty() {
        return Err(ValidationError::required("customer_email"));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(ValidationError::too_long("customer_email", MAX_EMAIL_LEN));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ValidationError::invalid_format(
            "customer_email",
            "must look like name@example.com",
        ));
    }

    Ok(email)
}

/// Strips spaces, dashes, dots and parentheses from a phone number.
///
/// A single leading `+` is kept. The remaining digits must number 8 to 15.
pub fn normalize_phone(phone: &str) -> ValidationResult<String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(ValidationError::required("customer_phone"));
    }

    let (plus, rest) = match phone.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", phone),
    };

    let mut digits = String::with_capacity(rest.len());
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => {
                return Err(ValidationError::invalid_format(
                    "customer_phone",
                    "may contain only digits, spaces, dashes and a leading +",
                ))
            }
        }
    }

    if !PHONE_DIGITS.contains(&digits.len()) {
        return Err(ValidationError::invalid_format(
            "customer_phone",
            "must have between 8 and 15 digits",
        ));
    }

    Ok(format!("{plus}{digits}"))
}

/// Trims a required free-text field and enforces a character limit.
fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::required(field));
    }
    if value.chars().count() > max {
        return Err(ValidationError::too_long(field, max));
    }
    Ok(value.to_string())
}

pub fn validate_customer_name(name: &str) -> ValidationResult<String> {
    required_text("customer_name", name, MAX_NAME_LEN)
}

pub fn validate_shipping_address(address: &str) -> ValidationResult<String> {
    required_text("shipping_address", address, MAX_ADDRESS_LEN)
}

/// Blank notes become `None`.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<Option<String>> {
    match notes.map(str::trim) {
        None | Some("") => Ok(None),
        Some(notes) if notes.chars().count() > MAX_NOTES_LEN => {
            Err(ValidationError::too_long("notes", MAX_NOTES_LEN))
        }
        Some(notes) => Ok(Some(notes.to_string())),
    }
}

// =============================================================================
// Code Validators
// =============================================================================

/// Validates the shape of a discount code (letters, digits, `-`, `_`).
pub fn validate_discount_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::required("discount_code"));
    }
    if code.len() > MAX_DISCOUNT_CODE_LEN {
        return Err(ValidationError::too_long(
            "discount_code",
            MAX_DISCOUNT_CODE_LEN,
        ));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid_format(
            "discount_code",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(())
}

/// Validates and upper-cases a discount code. Codes are stored upper-case.
pub fn normalize_discount_code(code: &str) -> ValidationResult<String> {
    validate_discount_code(code)?;
    Ok(code.trim().to_ascii_uppercase())
}

/// Order code prefixes are 1-10 characters of `A-Z` and `0-9`.
pub fn validate_order_code_prefix(prefix: &str) -> ValidationResult<()> {
    if prefix.is_empty() {
        return Err(ValidationError::required("order_code_prefix"));
    }
    if prefix.len() > MAX_ORDER_CODE_PREFIX_LEN {
        return Err(ValidationError::too_long(
            "order_code_prefix",
            MAX_ORDER_CODE_PREFIX_LEN,
        ));
    }
    if !prefix
        .bytes()
        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    {
        return Err(ValidationError::invalid_format(
            "order_code_prefix",
            "must contain only A-Z and 0-9",
        ));
    }
    Ok(())
}

// =============================================================================
// Order Request
// =============================================================================

/// An order request that passed validation, with every field normalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrderRequest {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub shipping_address: String,
    pub payment_method: PaymentMethod,
    pub discount_code: Option<String>,
    pub notes: Option<String>,
    pub customer_id: Option<String>,
    /// One entry per product, in first-seen order.
    pub lines: Vec<OrderLineRequest>,
}

/// Validates a checkout request before any side effect happens.
///
/// Lines naming the same product are merged by summing their quantities;
/// the merged quantity must still be within bounds.
pub fn validate_order_request(request: &OrderRequest) -> ValidationResult<ValidatedOrderRequest> {
    let customer_name = validate_customer_name(&request.customer_name)?;
    let customer_email = normalize_email(&request.customer_email)?;
    let customer_phone = normalize_phone(&request.customer_phone)?;
    let shipping_address = validate_shipping_address(&request.shipping_address)?;
    let notes = validate_notes(request.notes.as_deref())?;

    let discount_code = match request.discount_code.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(code) => Some(normalize_discount_code(code)?),
    };

    let customer_id = match request.customer_id.as_deref() {
        Some(id) => {
            validate_uuid_field("customer_id", id)?;
            Some(id.trim().to_string())
        }
        None => None,
    };

    if request.items.is_empty() {
        return Err(ValidationError::required("items"));
    }

    let mut lines: Vec<OrderLineRequest> = Vec::with_capacity(request.items.len());
    for item in &request.items {
        validate_uuid_field("product_id", &item.product_id)?;
        validate_quantity(item.quantity)?;

        let product_id = item.product_id.trim();
        match lines.iter_mut().find(|line| line.product_id == product_id) {
            Some(line) => {
                line.quantity += item.quantity;
                validate_quantity(line.quantity)?;
            }
            None => lines.push(OrderLineRequest {
                product_id: product_id.to_string(),
                quantity: item.quantity,
            }),
        }
    }

    if lines.len() > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    Ok(ValidatedOrderRequest {
        customer_name,
        customer_phone,
        customer_email,
        shipping_address,
        payment_method: request.payment_method,
        discount_code,
        notes,
        customer_id,
        lines,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const P1: &str = "550e8400-e29b-41d4-a716-446655440001";
    const P2: &str = "550e8400-e29b-41d4-a716-446655440002";

    fn request() -> OrderRequest {
        OrderRequest {
            customer_name: " Lan Nguyen ".to_string(),
            customer_phone: "0900 000 000".to_string(),
            customer_email: "A@X.com".to_string(),
            shipping_address: "12 Le Loi, District 1".to_string(),
            payment_method: PaymentMethod::Cod,
            discount_code: Some(" save10 ".to_string()),
            notes: Some("   ".to_string()),
            customer_id: None,
            items: vec![OrderLineRequest {
                product_id: P1.to_string(),
                quantity: 2,
            }],
        }
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("JKT-NAVY-M").is_ok());
        assert!(validate_sku("product_1").is_ok());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(MAX_PRICE_CENTS).is_ok());
        assert!(validate_price_cents(-1).is_err());
        assert!(matches!(
            validate_price_cents(i64::MAX / 10),
            Err(ValidationError::OutOfRange { max: MAX_PRICE_CENTS, .. })
        ));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Lan@Shop.VN ").unwrap(), "lan@shop.vn");
        assert!(normalize_email("").is_err());
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("a@b").is_err());
        assert!(normalize_email("a b@x.com").is_err());
        assert!(normalize_email("a@@x.com").is_err());
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("0900000000").unwrap(), "0900000000");
        assert_eq!(normalize_phone("(090) 000-0000").unwrap(), "0900000000");
        assert_eq!(normalize_phone("+84 900 000 000").unwrap(), "+84900000000");
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("0900abc000").is_err());
        assert!(normalize_phone("++84900000000").is_err());
    }

    #[test]
    fn test_discount_code_normalised_upper_case() {
        assert_eq!(normalize_discount_code(" save10 ").unwrap(), "SAVE10");
        assert!(normalize_discount_code("SAVE 10").is_err());
        assert!(validate_discount_code(&"X".repeat(33)).is_err());
    }

    #[test]
    fn test_order_code_prefix() {
        assert!(validate_order_code_prefix("ORD").is_ok());
        assert!(validate_order_code_prefix("WEB2").is_ok());
        assert!(validate_order_code_prefix("ord").is_err());
        assert!(validate_order_code_prefix("OR-D").is_err());
        assert!(validate_order_code_prefix("").is_err());
    }

    #[test]
    fn test_validate_order_request_normalises() {
        let valid = validate_order_request(&request()).unwrap();
        assert_eq!(valid.customer_name, "Lan Nguyen");
        assert_eq!(valid.customer_email, "a@x.com");
        assert_eq!(valid.customer_phone, "0900000000");
        assert_eq!(valid.discount_code.as_deref(), Some("SAVE10"));
        assert_eq!(valid.notes, None);
    }

    #[test]
    fn test_duplicate_lines_are_merged() {
        let mut req = request();
        req.items = vec![
            OrderLineRequest { product_id: P1.to_string(), quantity: 2 },
            OrderLineRequest { product_id: P2.to_string(), quantity: 1 },
            OrderLineRequest { product_id: P1.to_string(), quantity: 3 },
        ];
        let valid = validate_order_request(&req).unwrap();
        assert_eq!(valid.lines.len(), 2);
        assert_eq!(valid.lines[0].product_id, P1);
        assert_eq!(valid.lines[0].quantity, 5);
        assert_eq!(valid.lines[1].quantity, 1);
    }

    #[test]
    fn test_merged_quantity_is_bounded() {
        let mut req = request();
        req.items = vec![
            OrderLineRequest { product_id: P1.to_string(), quantity: 600 },
            OrderLineRequest { product_id: P1.to_string(), quantity: 600 },
        ];
        assert!(matches!(
            validate_order_request(&req),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_request_rejections() {
        let mut req = request();
        req.items.clear();
        assert_eq!(
            validate_order_request(&req),
            Err(ValidationError::required("items"))
        );

        let mut req = request();
        req.items[0].product_id = "nope".to_string();
        assert!(validate_order_request(&req).is_err());

        let mut req = request();
        req.customer_email = "   ".to_string();
        assert_eq!(
            validate_order_request(&req),
            Err(ValidationError::required("customer_email"))
        );

        let mut req = request();
        req.items = (0..=MAX_ORDER_LINES)
            .map(|i| OrderLineRequest {
                product_id: format!("550e8400-e29b-41d4-a716-{:012}", i),
                quantity: 1,
            })
            .collect();
        assert!(validate_order_request(&req).is_err());
    }
}
