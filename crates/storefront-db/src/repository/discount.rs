//! # Discount Repository
//!
//! Loading discounts with their scope, claiming redemption slots, and the
//! admin operations around them.
//!
//! ## Usage Counter Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout tx:  find_by_code ──► evaluate (core) ──► claim_usage         │
//! │                                                        │                │
//! │                UPDATE discounts SET used_count = used_count + 1         │
//! │                WHERE id = ? AND (usage_limit = 0                        │
//! │                                  OR used_count < usage_limit)           │
//! │                                                        │                │
//! │                0 rows → slot lost to another order     ▼                │
//! │                                                  record_usage           │
//! │                                       (UNIQUE discount_id, order_id)    │
//! │                                                                         │
//! │  admin:        correct_used_count (only ever lowers the counter)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use storefront_core::discount::validate_definition;
use storefront_core::validation::normalize_discount_code;
use storefront_core::{CoreError, Discount, DiscountScope, DiscountUsage, ValidationError};
use tracing::{debug, info};

use super::generate_id;
use crate::error::{DbError, DbResult};

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// Loads a discount and its scope by code (case-insensitive).
pub async fn find_by_code(conn: &mut SqliteConnection, code: &str) -> DbResult<Option<Discount>> {
    let code = code.trim().to_ascii_uppercase();
    debug!(code = %code, "Looking up discount");

    let discount = sqlx::query_as::<_, Discount>(
        r#"
        SELECT id, code, description, discount_type, value, min_order_cents,
               max_discount_cents, usage_limit, used_count, is_active,
               starts_at, ends_at, created_at, updated_at
        FROM discounts
        WHERE code = ?1
        "#,
    )
    .bind(&code)
    .fetch_optional(&mut *conn)
    .await?;

    match discount {
        Some(mut discount) => {
            discount.scope = load_scope(conn, &discount.id).await?;
            Ok(Some(discount))
        }
        None => Ok(None),
    }
}

async fn load_scope(conn: &mut SqliteConnection, discount_id: &str) -> DbResult<DiscountScope> {
    let product_ids: Vec<String> = sqlx::query_scalar(
        "SELECT product_id FROM discount_products WHERE discount_id = ?1 ORDER BY product_id",
    )
    .bind(discount_id)
    .fetch_all(&mut *conn)
    .await?;

    let category_ids: Vec<String> = sqlx::query_scalar(
        "SELECT category_id FROM discount_categories WHERE discount_id = ?1 ORDER BY category_id",
    )
    .bind(discount_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(DiscountScope {
        product_ids,
        category_ids,
    })
}

/// Takes one redemption slot. Returns `false` if none is left.
pub async fn claim_usage<'e, E>(executor: E, discount_id: &str, now: DateTime<Utc>) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    debug!(discount_id = %discount_id, "Claiming discount usage");

    let result = sqlx::query(
        r#"
        UPDATE discounts
        SET used_count = used_count + 1,
            updated_at = ?2
        WHERE id = ?1
          AND (usage_limit = 0 OR used_count < usage_limit)
        "#,
    )
    .bind(discount_id)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Records which customer redeemed a discount on which order.
pub async fn record_usage<'e, E>(
    executor: E,
    discount_id: &str,
    customer_id: &str,
    order_id: &str,
    now: DateTime<Utc>,
) -> DbResult<DiscountUsage>
where
    E: SqliteExecutor<'e>,
{
    let usage = DiscountUsage {
        id: generate_id(),
        discount_id: discount_id.to_string(),
        customer_id: customer_id.to_string(),
        order_id: order_id.to_string(),
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO discount_usages (id, discount_id, customer_id, order_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&usage.id)
    .bind(&usage.discount_id)
    .bind(&usage.customer_id)
    .bind(&usage.order_id)
    .bind(usage.created_at)
    .execute(executor)
    .await?;

    Ok(usage)
}

// =============================================================================
// DiscountRepository
// =============================================================================

/// Repository for discount administration.
#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    /// Inserts a discount and its scope rows in one transaction.
    ///
    /// The code is stored upper-case.
    pub async fn insert(&self, discount: &Discount) -> DbResult<Discount> {
        let mut discount = discount.clone();
        discount.code = normalize_discount_code(&discount.code).map_err(CoreError::from)?;
        validate_definition(&discount).map_err(CoreError::from)?;

        debug!(code = %discount.code, "Inserting discount");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO discounts (
                id, code, description, discount_type, value, min_order_cents,
                max_discount_cents, usage_limit, used_count, is_active,
                starts_at, ends_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&discount.id)
        .bind(&discount.code)
        .bind(&discount.description)
        .bind(discount.discount_type)
        .bind(discount.value)
        .bind(discount.min_order_cents)
        .bind(discount.max_discount_cents)
        .bind(discount.usage_limit)
        .bind(discount.used_count)
        .bind(discount.is_active)
        .bind(discount.starts_at)
        .bind(discount.ends_at)
        .bind(discount.created_at)
        .bind(discount.updated_at)
        .execute(&mut *tx)
        .await?;

        for product_id in &discount.scope.product_ids {
            sqlx::query("INSERT INTO discount_products (discount_id, product_id) VALUES (?1, ?2)")
                .bind(&discount.id)
                .bind(product_id)
                .execute(&mut *tx)
                .await?;
        }
        for category_id in &discount.scope.category_ids {
            sqlx::query("INSERT INTO discount_categories (discount_id, category_id) VALUES (?1, ?2)")
                .bind(&discount.id)
                .bind(category_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(discount)
    }

    /// Gets a discount with its scope by code (case-insensitive).
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Discount>> {
        let mut conn = self.pool.acquire().await?;
        find_by_code(&mut conn, code).await
    }

    /// Switches a discount on or off.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active, "Setting discount active flag");

        let result = sqlx::query("UPDATE discounts SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Discount", id));
        }

        Ok(())
    }

    /// Lowers `used_count`, e.g. after an order was refunded by hand.
    ///
    /// Raising the counter is only done by checkout.
    pub async fn correct_used_count(&self, id: &str, used_count: i64) -> DbResult<()> {
        if used_count < 0 {
            return Err(CoreError::from(ValidationError::OutOfRange {
                field: "used_count".to_string(),
                min: 0,
                max: i64::MAX,
            })
            .into());
        }

        let result = sqlx::query(
            r#"
            UPDATE discounts
            SET used_count = ?2, updated_at = ?3
            WHERE id = ?1 AND used_count >= ?2
            "#,
        )
        .bind(id)
        .bind(used_count)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Discount with used_count above target", id));
        }

        info!(discount_id = %id, used_count, "Discount usage corrected");
        Ok(())
    }

    /// Usage rows of a discount, oldest first.
    pub async fn list_usages(&self, discount_id: &str) -> DbResult<Vec<DiscountUsage>> {
        let usages = sqlx::query_as::<_, DiscountUsage>(
            r#"
            SELECT id, discount_id, customer_id, order_id, created_at
            FROM discount_usages
            WHERE discount_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(discount_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(usages)
    }
}
