//! # Inventory Ledger
//!
//! Stock moves in exactly two ways: committed orders take it out, admin
//! restocks put it back in.
//!
//! ## Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ❌ WRONG: read, compare in Rust, then write                            │
//! │     SELECT stock ...            (two checkouts both read 1)             │
//! │     UPDATE ... SET stock = 0    (both "succeed", one unit oversold)     │
//! │                                                                         │
//! │  ✅ CORRECT: one statement that only applies if stock suffices         │
//! │     UPDATE products SET stock = stock - ?qty                            │
//! │     WHERE id = ? AND stock >= ?qty                                      │
//! │                                                                         │
//! │     rows_affected = 1 → reserved                                        │
//! │     rows_affected = 0 → insufficient stock (or unknown product)         │
//! │                                                                         │
//! │  CHECK (stock >= 0) on the table backs this up.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Takes `quantity` units out of stock if at least that many are available.
///
/// Returns `false`, changing nothing, when stock is short.
pub async fn decrement_stock<'e, E>(
    executor: E,
    product_id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    debug!(product_id = %product_id, quantity, "Decrementing stock");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - ?2,
            updated_at = ?3
        WHERE id = ?1 AND stock >= ?2
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Adds `quantity` units to stock and returns the new level.
pub async fn restock<'e, E>(
    executor: E,
    product_id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<i64>
where
    E: SqliteExecutor<'e>,
{
    debug!(product_id = %product_id, quantity, "Restocking");

    let stock: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock = stock + ?2,
            updated_at = ?3
        WHERE id = ?1
        RETURNING stock
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .fetch_optional(executor)
    .await?;

    stock.ok_or_else(|| DbError::not_found("Product", product_id))
}

/// Current stock of a product, `None` if it does not exist.
pub async fn available<'e, E>(executor: E, product_id: &str) -> DbResult<Option<i64>>
where
    E: SqliteExecutor<'e>,
{
    let stock = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_optional(executor)
        .await?;

    Ok(stock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;

    #[tokio::test]
    async fn test_decrement_is_conditional() {
        let db = test_support::database().await;
        let product = test_support::product("CAP-1", 1500, 3);
        db.products().insert(&product).await.unwrap();
        let now = Utc::now();

        assert!(decrement_stock(db.pool(), &product.id, 2, now).await.unwrap());
        assert!(!decrement_stock(db.pool(), &product.id, 2, now).await.unwrap());
        assert_eq!(available(db.pool(), &product.id).await.unwrap(), Some(1));

        assert!(decrement_stock(db.pool(), &product.id, 1, now).await.unwrap());
        assert_eq!(available(db.pool(), &product.id).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = test_support::database().await;
        let now = Utc::now();

        assert!(!decrement_stock(db.pool(), "missing", 1, now).await.unwrap());
        assert!(matches!(
            restock(db.pool(), "missing", 5, now).await,
            Err(DbError::NotFound { .. })
        ));
        assert_eq!(available(db.pool(), "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_check_constraint_rejects_negative_stock() {
        let db = test_support::database().await;
        let product = test_support::product("CAP-2", 1500, 1);
        db.products().insert(&product).await.unwrap();

        let err = sqlx::query("UPDATE products SET stock = stock - 5 WHERE id = ?1")
            .bind(&product.id)
            .execute(db.pool())
            .await
            .map_err(DbError::from)
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }
}
