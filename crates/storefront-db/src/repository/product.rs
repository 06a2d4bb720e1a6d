//! # Product Repository
//!
//! Catalog administration: product CRUD and restocking.
//!
//! ## Key Operations
//! - Lookups by ID and SKU
//! - Insert / update / soft delete
//! - Restock (the only way stock goes up)
//!
//! Checkout does not go through this repository; it reads the catalog with
//! [`catalog::fetch_for_order`](super::catalog::fetch_for_order) and takes
//! stock with [`inventory::decrement_stock`](super::inventory::decrement_stock)
//! on its own transaction.

use chrono::Utc;
use sqlx::SqlitePool;
use storefront_core::validation::{
    validate_price_cents, validate_product_name, validate_restock_quantity, validate_sku,
};
use storefront_core::{CoreError, Product};
use tracing::{debug, info};

use super::inventory;
use crate::error::{DbError, DbResult};

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let product = repo.get_by_sku("JKT-NAVY-M").await?;
/// let stock = repo.restock(&product.id, 20).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists active products ordered by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, description, price_cents, stock,
                   category_id, is_active, created_at, updated_at
            FROM products
            WHERE is_active = 1
            ORDER BY name
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, description, price_cents, stock,
                   category_id, is_active, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, description, price_cents, stock,
                   category_id, is_active, created_at, updated_at
            FROM products
            WHERE sku = ?1
            "#,
        )
        .bind(sku.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        validate_sku(&product.sku).map_err(CoreError::from)?;
        validate_product_name(&product.name).map_err(CoreError::from)?;
        validate_price_cents(product.price_cents).map_err(CoreError::from)?;

        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, description, price_cents, stock,
                category_id, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(&product.category_id)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Updates a product's catalog fields.
    ///
    /// Stock is not touched here; see [`restock`](Self::restock).
    /// Past orders keep the price they were placed at.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        validate_product_name(&product.name).map_err(CoreError::from)?;
        validate_price_cents(product.price_cents).map_err(CoreError::from)?;

        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                price_cents = ?4,
                category_id = ?5,
                is_active = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(&product.category_id)
        .bind(product.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Adds stock and returns the new level.
    pub async fn restock(&self, id: &str, quantity: i64) -> DbResult<i64> {
        validate_restock_quantity(quantity).map_err(CoreError::from)?;

        let stock = inventory::restock(&self.pool, id, quantity, Utc::now()).await?;
        info!(product_id = %id, quantity, stock, "Product restocked");
        Ok(stock)
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Order items keep referencing it, and checkout rejects it from now on.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET is_active = 0, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = test_support::database().await;
        let product = test_support::product("JKT-NAVY-M", 60000, 5);
        db.products().insert(&product).await.unwrap();

        let by_sku = db.products().get_by_sku("JKT-NAVY-M").await.unwrap().unwrap();
        assert_eq!(by_sku.id, product.id);
        assert_eq!(by_sku.price().cents(), 60000);
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_sku() {
        let db = test_support::database().await;
        db.products()
            .insert(&test_support::product("DUP-1", 100, 1))
            .await
            .unwrap();

        let err = db
            .products()
            .insert(&test_support::product("DUP-1", 200, 1))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation_on("products.sku"));
    }

    #[tokio::test]
    async fn test_invalid_product_rejected() {
        let db = test_support::database().await;
        let product = test_support::product("BAD SKU", 100, 1);
        assert!(matches!(
            db.products().insert(&product).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_restock() {
        let db = test_support::database().await;
        let product = test_support::product("SCK-1", 500, 0);
        db.products().insert(&product).await.unwrap();

        assert_eq!(db.products().restock(&product.id, 12).await.unwrap(), 12);
        assert_eq!(db.products().restock(&product.id, 3).await.unwrap(), 15);
        assert!(db.products().restock(&product.id, 0).await.is_err());
        assert!(db.products().restock("missing", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_soft_delete() {
        let db = test_support::database().await;
        let mut product = test_support::product("HAT-1", 900, 2);
        db.products().insert(&product).await.unwrap();

        product.price_cents = 1200;
        db.products().update(&product).await.unwrap();
        db.products().soft_delete(&product.id).await.unwrap();

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.price_cents, 1200);
        assert_eq!(stored.stock, 2);
        assert!(!stored.is_active);
        assert_eq!(db.products().count().await.unwrap(), 0);
    }
}
