//! # Catalog Lookup
//!
//! The read the checkout makes for every order line. It runs on the
//! checkout's own transaction, so price and stock come from the same
//! snapshot the stock decrement is applied to.

use sqlx::SqliteExecutor;
use storefront_core::Money;
use tracing::debug;

use crate::error::DbResult;

/// What the checkout needs to know about a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub product_id: String,
    pub name: String,
    pub price: Money,
    pub stock: i64,
    pub category_id: Option<String>,
    pub is_active: bool,
}

#[derive(sqlx::FromRow)]
struct CatalogRow {
    id: String,
    name: String,
    price_cents: i64,
    stock: i64,
    category_id: Option<String>,
    is_active: bool,
}

impl From<CatalogRow> for CatalogEntry {
    fn from(row: CatalogRow) -> Self {
        CatalogEntry {
            product_id: row.id,
            name: row.name,
            price: Money::from_cents(row.price_cents),
            stock: row.stock,
            category_id: row.category_id,
            is_active: row.is_active,
        }
    }
}

/// Loads a product's current price, stock and category.
///
/// Inactive products are returned too; the caller decides what to do with
/// them.
pub async fn fetch_for_order<'e, E>(executor: E, product_id: &str) -> DbResult<Option<CatalogEntry>>
where
    E: SqliteExecutor<'e>,
{
    debug!(product_id = %product_id, "Fetching catalog entry");

    let row = sqlx::query_as::<_, CatalogRow>(
        r#"
        SELECT id, name, price_cents, stock, category_id, is_active
        FROM products
        WHERE id = ?1
        "#,
    )
    .bind(product_id)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(CatalogEntry::from))
}
