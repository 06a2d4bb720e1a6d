//! # Customer Repository
//!
//! Customer lookups and the reconciler that maps checkout contact details
//! to exactly one customer record.
//!
//! ## Reconciliation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  contact (normalised email + phone)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  by_email = lookup(email)      by_phone = lookup(phone)                 │
//! │       │                                                                 │
//! │       ├── both found, different ids ──► CustomerConflict                │
//! │       ├── either found              ──► use it                          │
//! │       └── none found                ──► INSERT guest customer           │
//! │                                           │                             │
//! │                     UNIQUE(email) / UNIQUE(phone) violated?             │
//! │                                           └──► look up again, use it    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reconciliation runs on the caller's transaction, so a rolled-back
//! checkout leaves no customer behind and a retried one finds the same
//! record again.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use storefront_core::{Customer, Money, GUEST_PASSWORD_SENTINEL};
use tracing::{debug, info, warn};

use super::generate_id;
use crate::error::{CheckoutError, DbError, DbResult};

/// Normalised contact details from an order.
#[derive(Debug, Clone, Copy)]
pub struct Contact<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
}

/// Outcome of a successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub customer_id: String,
    /// A guest customer was provisioned by this call.
    pub created: bool,
}

// =============================================================================
// Lookups
// =============================================================================

pub async fn find_by_id<'e, E>(executor: E, id: &str) -> DbResult<Option<Customer>>
where
    E: SqliteExecutor<'e>,
{
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, name, email, phone, password_hash, is_guest, total_orders,
               total_spent_cents, last_order_at, created_at, updated_at
        FROM customers
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(customer)
}

/// Looks up a customer by an already-normalised email.
pub async fn find_by_email<'e, E>(executor: E, email: &str) -> DbResult<Option<Customer>>
where
    E: SqliteExecutor<'e>,
{
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, name, email, phone, password_hash, is_guest, total_orders,
               total_spent_cents, last_order_at, created_at, updated_at
        FROM customers
        WHERE email = ?1
        "#,
    )
    .bind(email)
    .fetch_optional(executor)
    .await?;

    Ok(customer)
}

/// Looks up a customer by an already-normalised phone number.
pub async fn find_by_phone<'e, E>(executor: E, phone: &str) -> DbResult<Option<Customer>>
where
    E: SqliteExecutor<'e>,
{
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, name, email, phone, password_hash, is_guest, total_orders,
               total_spent_cents, last_order_at, created_at, updated_at
        FROM customers
        WHERE phone = ?1
        "#,
    )
    .bind(phone)
    .fetch_optional(executor)
    .await?;

    Ok(customer)
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Resolves contact details to one customer, provisioning a guest if needed.
///
/// Email and phone must already be normalised.
pub async fn reconcile(
    conn: &mut SqliteConnection,
    contact: Contact<'_>,
    now: DateTime<Utc>,
) -> Result<Reconciled, CheckoutError> {
    if let Some(existing) = lookup(conn, contact, now).await? {
        return Ok(existing);
    }

    match insert_guest(&mut *conn, contact, now).await {
        Ok(customer) => {
            info!(customer_id = %customer.id, "Provisioned guest customer");
            Ok(Reconciled {
                customer_id: customer.id,
                created: true,
            })
        }
        Err(err)
            if err.is_unique_violation_on("customers.email")
                || err.is_unique_violation_on("customers.phone") =>
        {
            warn!(error = %err, "Guest insert raced another checkout, looking up again");
            lookup(conn, contact, now)
                .await?
                .ok_or_else(|| CheckoutError::Persistence(err))
        }
        Err(err) => Err(err.into()),
    }
}

/// Email first, then phone. Two different matches is a conflict.
async fn lookup(
    conn: &mut SqliteConnection,
    contact: Contact<'_>,
    now: DateTime<Utc>,
) -> Result<Option<Reconciled>, CheckoutError> {
    let by_email = find_by_email(&mut *conn, contact.email).await?;
    let by_phone = find_by_phone(&mut *conn, contact.phone).await?;

    match (by_email, by_phone) {
        (Some(email_match), Some(phone_match)) if email_match.id != phone_match.id => {
            warn!(
                email_match = %email_match.id,
                phone_match = %phone_match.id,
                "Contact details match two customers"
            );
            Err(CheckoutError::CustomerConflict {
                email_match: email_match.id,
                phone_match: phone_match.id,
            })
        }
        (Some(customer), phone_match) => {
            if customer.phone.is_none() && phone_match.is_none() {
                attach_phone(&mut *conn, &customer.id, contact.phone, now).await?;
            }
            debug!(customer_id = %customer.id, "Matched customer by email");
            Ok(Some(Reconciled {
                customer_id: customer.id,
                created: false,
            }))
        }
        (None, Some(customer)) => {
            debug!(customer_id = %customer.id, "Matched customer by phone");
            Ok(Some(Reconciled {
                customer_id: customer.id,
                created: false,
            }))
        }
        (None, None) => Ok(None),
    }
}

/// Fills in the phone of an account registered without one.
async fn attach_phone<'e, E>(
    executor: E,
    customer_id: &str,
    phone: &str,
    now: DateTime<Utc>,
) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE customers SET phone = ?2, updated_at = ?3 WHERE id = ?1 AND phone IS NULL")
        .bind(customer_id)
        .bind(phone)
        .bind(now)
        .execute(executor)
        .await?;
    Ok(())
}

/// Inserts a guest customer that cannot sign in until a password is set.
pub async fn insert_guest<'e, E>(executor: E, contact: Contact<'_>, now: DateTime<Utc>) -> DbResult<Customer>
where
    E: SqliteExecutor<'e>,
{
    let customer = Customer {
        id: generate_id(),
        name: contact.name.to_string(),
        email: contact.email.to_string(),
        phone: Some(contact.phone.to_string()),
        password_hash: GUEST_PASSWORD_SENTINEL.to_string(),
        is_guest: true,
        total_orders: 0,
        total_spent_cents: 0,
        last_order_at: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO customers (
            id, name, email, phone, password_hash, is_guest,
            total_orders, total_spent_cents, last_order_at, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.name)
    .bind(&customer.email)
    .bind(&customer.phone)
    .bind(&customer.password_hash)
    .bind(customer.is_guest)
    .bind(customer.total_orders)
    .bind(customer.total_spent_cents)
    .bind(customer.last_order_at)
    .bind(customer.created_at)
    .bind(customer.updated_at)
    .execute(executor)
    .await?;

    Ok(customer)
}

/// Adds one order worth `total` to a customer's aggregates.
pub async fn record_order<'e, E>(
    executor: E,
    customer_id: &str,
    total: Money,
    now: DateTime<Utc>,
) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(customer_id = %customer_id, total = %total, "Updating customer aggregates");

    let result = sqlx::query(
        r#"
        UPDATE customers
        SET total_orders = total_orders + 1,
            total_spent_cents = total_spent_cents + ?2,
            last_order_at = ?3,
            updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(customer_id)
    .bind(total.cents())
    .bind(now)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Customer", customer_id));
    }

    Ok(())
}

// =============================================================================
// CustomerRepository
// =============================================================================

/// Repository for customer reads outside checkout.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        find_by_id(&self.pool, id).await
    }

    /// Normalises the email before looking it up.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<Customer>> {
        find_by_email(&self.pool, &email.trim().to_lowercase()).await
    }

    pub async fn find_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        find_by_phone(&self.pool, phone.trim()).await
    }

    /// Runs a standalone reconciliation in its own transaction.
    pub async fn reconcile(&self, contact: Contact<'_>) -> Result<Reconciled, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let reconciled = reconcile(&mut tx, contact, Utc::now()).await?;
        tx.commit().await?;
        Ok(reconciled)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use chrono::TimeZone;

    fn contact<'a>(email: &'a str, phone: &'a str) -> Contact<'a> {
        Contact {
            name: "Lan Nguyen",
            email,
            phone,
        }
    }

    #[tokio::test]
    async fn test_reconcile_twice_creates_one_customer() {
        let db = test_support::database().await;
        let guest = contact("a@x.com", "0900000000");

        let first = db.customers().reconcile(guest).await.unwrap();
        let second = db.customers().reconcile(guest).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.customer_id, second.customer_id);
        assert_eq!(db.customers().count().await.unwrap(), 1);

        let customer = db.customers().get_by_id(&first.customer_id).await.unwrap().unwrap();
        assert!(customer.is_guest);
        assert!(!customer.can_authenticate());
    }

    #[tokio::test]
    async fn test_match_by_either_key() {
        let db = test_support::database().await;
        let created = db.customers().reconcile(contact("a@x.com", "0900000000")).await.unwrap();

        let by_email = db.customers().reconcile(contact("a@x.com", "0911111111")).await.unwrap();
        let by_phone = db.customers().reconcile(contact("b@x.com", "0900000000")).await.unwrap();

        assert_eq!(by_email.customer_id, created.customer_id);
        assert_eq!(by_phone.customer_id, created.customer_id);
        assert_eq!(db.customers().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_two_different_matches_conflict() {
        let db = test_support::database().await;
        let first = db.customers().reconcile(contact("a@x.com", "0900000000")).await.unwrap();
        let second = db.customers().reconcile(contact("b@x.com", "0911111111")).await.unwrap();

        let err = db
            .customers()
            .reconcile(contact("a@x.com", "0911111111"))
            .await
            .unwrap_err();
        match err {
            CheckoutError::CustomerConflict {
                email_match,
                phone_match,
            } => {
                assert_eq!(email_match, first.customer_id);
                assert_eq!(phone_match, second.customer_id);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_registered_account_without_phone_gets_it() {
        let db = test_support::database().await;
        let registered_at = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, email, phone, password_hash, is_guest, created_at, updated_at)
            VALUES ('c1', 'Lan', 'a@x.com', NULL, 'argon2-hash', 0, ?1, ?1)
            "#,
        )
        .bind(registered_at)
        .execute(db.pool())
        .await
        .unwrap();

        let checkout_at = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        let mut tx = db.begin().await.unwrap();
        let reconciled = reconcile(&mut tx, contact("a@x.com", "0900000000"), checkout_at)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(reconciled.customer_id, "c1");

        let customer = db.customers().find_by_phone("0900000000").await.unwrap().unwrap();
        assert_eq!(customer.id, "c1");
        assert!(customer.can_authenticate());
        assert_eq!(customer.created_at, registered_at);
        assert_eq!(customer.updated_at, checkout_at);
    }

    #[tokio::test]
    async fn test_record_order_updates_aggregates() {
        let db = test_support::database().await;
        let reconciled = db.customers().reconcile(contact("a@x.com", "0900000000")).await.unwrap();

        let now = Utc::now();
        record_order(db.pool(), &reconciled.customer_id, Money::from_cents(55000), now)
            .await
            .unwrap();
        record_order(db.pool(), &reconciled.customer_id, Money::from_cents(3000), now)
            .await
            .unwrap();

        let customer = db.customers().find_by_email("A@X.com").await.unwrap().unwrap();
        assert_eq!(customer.total_orders, 2);
        assert_eq!(customer.total_spent().cents(), 58000);
        assert!(customer.last_order_at.is_some());

        assert!(record_order(db.pool(), "missing", Money::zero(), now).await.is_err());
    }
}
