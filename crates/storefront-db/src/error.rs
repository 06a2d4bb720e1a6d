//! # Database Error Types
//!
//! Error types for database operations and for the checkout transaction.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError ← Adds context and categorization                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CheckoutError ← What place_order reports                               │
//! │       │           (stock? discount? customer? race? storage?)           │
//! │       ▼                                                                 │
//! │  Caller decides: fix the cart, drop the code, or resubmit               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use storefront_core::{CoreError, DiscountRejection, ValidationError};
use thiserror::Error;

// =============================================================================
// DbError
// =============================================================================

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - ID doesn't exist
    /// - Conditional update matched nothing
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate order code
    /// - Customer email or phone already registered
    /// - Second usage row for the same discount and order
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// CHECK constraint violation.
    ///
    /// ## When This Occurs
    /// - Stock would go negative
    /// - used_count would pass usage_limit
    #[error("Check constraint failed: {message}")]
    CheckViolation { message: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Another connection holds the write lock and the busy timeout ran out.
    #[error("Database busy: {0}")]
    Busy(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A guarded update found the row no longer in the state it was read in.
    ///
    /// ## When This Occurs
    /// - Two requests move the same order's status at once
    #[error("{entity} {id} was changed by another request")]
    Conflict { entity: String, id: String },

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A stored row broke a domain rule (e.g. an illegal status transition).
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a Conflict error for a row that changed under a guarded update.
    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::Conflict {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether this is a UNIQUE violation on `table.column`.
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field, .. } if field.split(", ").any(|f| f == column))
    }

    /// Errors where resubmitting the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DbError::Busy(_) | DbError::PoolExhausted | DbError::Conflict { .. }
        )
    }
}

/// SQLite primary result codes we care about.
const SQLITE_BUSY: &str = "5";
const SQLITE_LOCKED: &str = "6";
/// Extended codes: SQLITE_LOCKED_SHAREDCACHE, SQLITE_BUSY_SNAPSHOT.
const SQLITE_LOCKED_SHAREDCACHE: &str = "262";
const SQLITE_BUSY_SNAPSHOT: &str = "517";
const SQLITE_BUSY_RECOVERY: &str = "261";

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze code/message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let code = db_err.code();

                // SQLite constraint messages:
                // "UNIQUE constraint failed: <table>.<column>[, <table>.<column>]"
                // "CHECK constraint failed: <name or expression>"
                // "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if matches!(
                    code.as_deref(),
                    Some(
                        SQLITE_BUSY
                            | SQLITE_LOCKED
                            | SQLITE_BUSY_RECOVERY
                            | SQLITE_LOCKED_SHAREDCACHE
                            | SQLITE_BUSY_SNAPSHOT
                    )
                ) || msg.contains("database is locked")
                {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// CheckoutError
// =============================================================================

/// Which race a checkout lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// The order code was taken by a concurrent checkout.
    OrderCode,
    /// The last redemption slot of the discount went to another order.
    DiscountUsage,
    /// The write lock could not be acquired in time.
    DatabaseBusy,
}

/// Everything `CheckoutService::place_order` can fail with.
///
/// Every variant means the transaction was rolled back: no order, no stock
/// change, no usage increment and no customer mutation survived.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Malformed input, caught before the transaction was opened.
    #[error("Invalid order: {0}")]
    Validation(#[from] ValidationError),

    /// A line names a product that does not exist or is no longer sold.
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    #[error("Insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    #[error("Discount code {code} rejected: {reason}")]
    DiscountInvalid {
        code: String,
        reason: DiscountRejection,
    },

    /// The email and the phone belong to two different customers.
    #[error("Contact details match two customers (email: {email_match}, phone: {phone_match})")]
    CustomerConflict {
        email_match: String,
        phone_match: String,
    },

    /// Lost a race; resubmitting the whole order is safe.
    #[error("Concurrent update conflict ({kind:?}), please retry")]
    ConcurrencyConflict { kind: ConflictKind },

    #[error("Persistence error: {0}")]
    Persistence(DbError),
}

impl From<DbError> for CheckoutError {
    fn from(err: DbError) -> Self {
        if let DbError::Busy(_) = err {
            return CheckoutError::ConcurrencyConflict {
                kind: ConflictKind::DatabaseBusy,
            };
        }
        CheckoutError::Persistence(err)
    }
}

impl From<sqlx::Error> for CheckoutError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

impl CheckoutError {
    /// Short machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            CheckoutError::Validation(_) => "validation",
            CheckoutError::ProductNotFound { .. } => "product_not_found",
            CheckoutError::InsufficientStock { .. } => "insufficient_stock",
            CheckoutError::DiscountInvalid { .. } => "discount_invalid",
            CheckoutError::CustomerConflict { .. } => "customer_conflict",
            CheckoutError::ConcurrencyConflict { .. } => "concurrency_conflict",
            CheckoutError::Persistence(_) => "persistence",
        }
    }

    /// Whether the caller may resubmit the identical request.
    pub fn is_retryable(&self) -> bool {
        match self {
            CheckoutError::ConcurrencyConflict { .. } => true,
            CheckoutError::Persistence(err) => err.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_column_match() {
        let err = DbError::duplicate("orders.order_code", "ORD-010124001");
        assert!(err.is_unique_violation_on("orders.order_code"));
        assert!(!err.is_unique_violation_on("customers.email"));

        let composite = DbError::duplicate(
            "discount_usages.discount_id, discount_usages.order_id",
            "unknown",
        );
        assert!(composite.is_unique_violation_on("discount_usages.order_id"));
    }

    #[test]
    fn test_busy_becomes_concurrency_conflict() {
        let err: CheckoutError = DbError::Busy("database is locked".to_string()).into();
        assert!(matches!(
            err,
            CheckoutError::ConcurrencyConflict {
                kind: ConflictKind::DatabaseBusy
            }
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_retryability() {
        let stock = CheckoutError::InsufficientStock {
            product_id: "p1".to_string(),
            name: "Jacket".to_string(),
            available: 0,
            requested: 1,
        };
        assert!(!stock.is_retryable());
        assert_eq!(stock.kind(), "insufficient_stock");

        assert!(CheckoutError::Persistence(DbError::PoolExhausted).is_retryable());
        assert!(!CheckoutError::Persistence(DbError::QueryFailed("x".into())).is_retryable());
    }

    #[test]
    fn test_validation_converts() {
        let err: CheckoutError = ValidationError::Required {
            field: "items".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "validation");
        assert_eq!(err.to_string(), "Invalid order: items is required");
    }
}
