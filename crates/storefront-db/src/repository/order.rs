//! # Order Repository
//!
//! Writing orders inside the checkout transaction, and reading and moving
//! them through their lifecycle afterwards.
//!
//! ## Lifecycle Updates
//! ```text
//! update_status(id, Shipped)
//!      │
//!      ├── load current status
//!      ├── OrderStatus::transition_to (core) ── illegal? → DbError::Domain
//!      └── UPDATE orders SET status = 'shipped', shipped_at = now
//!          WHERE id = ? AND status = 'confirmed'
//!                              └── the status we validated against; a
//!                                  concurrent change makes this match 0 rows
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use storefront_core::{Order, OrderItem, OrderStatus, PaymentStatus};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};

// =============================================================================
// Transaction-scoped inserts
// =============================================================================

/// Inserts the order header.
///
/// A taken `order_code` surfaces as a UNIQUE violation on
/// `orders.order_code`.
pub async fn insert_order<'e, E>(executor: E, order: &Order) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(order_code = %order.order_code, total = order.total_cents, "Inserting order");

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, order_code, status, payment_status, payment_method,
            subtotal_cents, discount_cents, shipping_cents, total_cents,
            discount_code, customer_id, customer_name, customer_phone,
            customer_email, shipping_address, notes, is_guest,
            created_at, updated_at, confirmed_at, shipped_at, delivered_at, cancelled_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9,
            ?10, ?11, ?12, ?13,
            ?14, ?15, ?16, ?17,
            ?18, ?19, ?20, ?21, ?22, ?23
        )
        "#,
    )
    .bind(&order.id)
    .bind(&order.order_code)
    .bind(order.status)
    .bind(order.payment_status)
    .bind(order.payment_method)
    .bind(order.subtotal_cents)
    .bind(order.discount_cents)
    .bind(order.shipping_cents)
    .bind(order.total_cents)
    .bind(&order.discount_code)
    .bind(&order.customer_id)
    .bind(&order.customer_name)
    .bind(&order.customer_phone)
    .bind(&order.customer_email)
    .bind(&order.shipping_address)
    .bind(&order.notes)
    .bind(order.is_guest)
    .bind(order.created_at)
    .bind(order.updated_at)
    .bind(order.confirmed_at)
    .bind(order.shipped_at)
    .bind(order.delivered_at)
    .bind(order.cancelled_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Inserts one order line.
pub async fn insert_item<'e, E>(executor: E, item: &OrderItem) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, product_id, name_snapshot,
            unit_price_cents, quantity, line_total_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.product_id)
    .bind(&item.name_snapshot)
    .bind(item.unit_price_cents)
    .bind(item.quantity)
    .bind(item.line_total_cents)
    .bind(item.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

// =============================================================================
// OrderRepository
// =============================================================================

/// Repository for order reads and lifecycle updates.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

const ORDER_COLUMNS: &str = r#"
    id, order_code, status, payment_status, payment_method,
    subtotal_cents, discount_cents, shipping_cents, total_cents,
    discount_code, customer_id, customer_name, customer_phone,
    customer_email, shipping_address, notes, is_guest,
    created_at, updated_at, confirmed_at, shipped_at, delivered_at, cancelled_at
"#;

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    pub async fn get_by_code(&self, order_code: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_code = ?1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(order_code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Items of an order in insertion order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, name_snapshot,
                   unit_price_cents, quantity, line_total_cents, created_at
            FROM order_items
            WHERE order_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// A customer's orders, newest first.
    pub async fn list_for_customer(&self, customer_id: &str, limit: u32) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = ?1 \
             ORDER BY created_at DESC, order_code DESC LIMIT ?2"
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(customer_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    /// Number of orders (for diagnostics and tests).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Moves an order to `next`, stamping the matching timestamp.
    ///
    /// Cancelling does not put stock back; that is an explicit restock.
    pub async fn update_status(&self, id: &str, next: OrderStatus) -> DbResult<Order> {
        let order = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;
        self.transition_status(&order, next).await
    }

    /// Applies `next` to `order` as it was read. Fails with
    /// [`DbError::Conflict`] if the stored status has moved on since.
    async fn transition_status(&self, order: &Order, next: OrderStatus) -> DbResult<Order> {
        let id = order.id.as_str();
        let current = order.status;
        current.transition_to(next)?;

        let stamp_column = match next {
            OrderStatus::Confirmed => "confirmed_at",
            OrderStatus::Shipped => "shipped_at",
            OrderStatus::Delivered => "delivered_at",
            OrderStatus::Cancelled => "cancelled_at",
            OrderStatus::Pending => "updated_at",
        };
        let sql = format!(
            "UPDATE orders SET status = ?3, updated_at = ?4, {stamp_column} = ?4 \
             WHERE id = ?1 AND status = ?2"
        );

        let result = sqlx::query(&sql)
            .bind(id)
            .bind(current)
            .bind(next)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            warn!(order_code = %order.order_code, expected = %current, "Order status changed underneath update");
            return Err(DbError::conflict("Order", id));
        }

        info!(order_code = %order.order_code, from = %current, to = %next, "Order status changed");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    /// Moves an order's payment to `next`.
    pub async fn update_payment_status(&self, id: &str, next: PaymentStatus) -> DbResult<Order> {
        let order = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;
        self.transition_payment(&order, next).await
    }

    async fn transition_payment(&self, order: &Order, next: PaymentStatus) -> DbResult<Order> {
        let id = order.id.as_str();
        let current = order.payment_status;
        current.transition_to(next)?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_status = ?3, updated_at = ?4
            WHERE id = ?1 AND payment_status = ?2
            "#,
        )
        .bind(id)
        .bind(current)
        .bind(next)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(order_code = %order.order_code, expected = %current, "Payment status changed underneath update");
            return Err(DbError::conflict("Order", id));
        }

        info!(order_code = %order.order_code, from = %current, to = %next, "Payment status changed");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }
}

/// Builds an order item priced at the moment of checkout.
pub fn new_item(
    order_id: &str,
    product_id: &str,
    name: &str,
    unit_price_cents: i64,
    quantity: i64,
    now: DateTime<Utc>,
) -> OrderItem {
    OrderItem {
        id: super::generate_id(),
        order_id: order_id.to_string(),
        product_id: product_id.to_string(),
        name_snapshot: name.to_string(),
        unit_price_cents,
        quantity,
        line_total_cents: unit_price_cents * quantity,
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{generate_id, test_support};
    use storefront_core::{CoreError, PaymentMethod};

    fn order(code: &str, now: DateTime<Utc>) -> Order {
        Order {
            id: generate_id(),
            order_code: code.to_string(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: PaymentMethod::BankTransfer,
            subtotal_cents: 2000,
            discount_cents: 0,
            shipping_cents: 3000,
            total_cents: 5000,
            discount_code: None,
            customer_id: None,
            customer_name: "Lan".to_string(),
            customer_phone: "0900000000".to_string(),
            customer_email: "a@x.com".to_string(),
            shipping_address: "12 Le Loi".to_string(),
            notes: None,
            is_guest: true,
            created_at: now,
            updated_at: now,
            confirmed_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = test_support::database().await;
        let product = test_support::product("TEE-1", 1000, 5);
        db.products().insert(&product).await.unwrap();
        let now = Utc::now();

        let order = order("ORD-150324001", now);
        insert_order(db.pool(), &order).await.unwrap();
        let item = new_item(&order.id, &product.id, &product.name, 1000, 2, now);
        insert_item(db.pool(), &item).await.unwrap();

        let stored = db.orders().get_by_code("ORD-150324001").await.unwrap().unwrap();
        assert_eq!(stored.id, order.id);
        assert_eq!(stored.payment_method, PaymentMethod::BankTransfer);
        assert!(stored.totals_are_consistent());

        let items = db.orders().get_items(&order.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].line_total().cents(), 2000);
    }

    #[tokio::test]
    async fn test_duplicate_code_is_unique_violation() {
        let db = test_support::database().await;
        let now = Utc::now();
        insert_order(db.pool(), &order("ORD-150324001", now)).await.unwrap();

        let err = insert_order(db.pool(), &order("ORD-150324001", now))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation_on("orders.order_code"));
    }

    #[tokio::test]
    async fn test_inconsistent_totals_rejected() {
        let db = test_support::database().await;
        let mut bad = order("ORD-150324001", Utc::now());
        bad.total_cents += 1;
        assert!(matches!(
            insert_order(db.pool(), &bad).await,
            Err(DbError::CheckViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_status_lifecycle() {
        let db = test_support::database().await;
        let order = order("ORD-150324001", Utc::now());
        insert_order(db.pool(), &order).await.unwrap();

        let confirmed = db.orders().update_status(&order.id, OrderStatus::Confirmed).await.unwrap();
        assert!(confirmed.confirmed_at.is_some());

        let err = db
            .orders()
            .update_status(&order.id, OrderStatus::Delivered)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InvalidStatusTransition { .. })
        ));

        let cancelled = db.orders().update_status(&order.id, OrderStatus::Cancelled).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());
        assert!(db.orders().update_status(&order.id, OrderStatus::Confirmed).await.is_err());
    }

    #[tokio::test]
    async fn test_payment_lifecycle() {
        let db = test_support::database().await;
        let order = order("ORD-150324001", Utc::now());
        insert_order(db.pool(), &order).await.unwrap();

        db.orders().update_payment_status(&order.id, PaymentStatus::Failed).await.unwrap();
        db.orders().update_payment_status(&order.id, PaymentStatus::Pending).await.unwrap();
        let paid = db.orders().update_payment_status(&order.id, PaymentStatus::Paid).await.unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);

        assert!(db
            .orders()
            .update_payment_status(&order.id, PaymentStatus::Failed)
            .await
            .is_err());
        assert!(db
            .orders()
            .update_payment_status("missing", PaymentStatus::Paid)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_status_update_on_stale_read_conflicts() {
        let db = test_support::database().await;
        let order = order("ORD-150324001", Utc::now());
        insert_order(db.pool(), &order).await.unwrap();
        let orders = db.orders();

        let stale = orders.get_by_id(&order.id).await.unwrap().unwrap();
        orders.update_status(&order.id, OrderStatus::Confirmed).await.unwrap();
        let err = orders
            .transition_status(&stale, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { ref id, .. } if *id == order.id));
        assert!(err.is_retryable());

        let stored = orders.get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Confirmed);
        assert!(stored.cancelled_at.is_none());

        orders.update_payment_status(&order.id, PaymentStatus::Paid).await.unwrap();
        let err = orders
            .transition_payment(&stale, PaymentStatus::Failed)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
    }
}
