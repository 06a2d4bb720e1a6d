//! # Repository Module
//!
//! Database repository implementations for the storefront.
//!
//! ## Two Kinds of Access
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Admin / read paths                 Checkout transaction                │
//! │  ──────────────────                 ────────────────────                │
//! │  db.orders().get_by_code(..)        let mut tx = db.begin().await?;     │
//! │  db.products().restock(..)          order_code::next_code(&mut *tx, ..) │
//! │  db.discounts().set_active(..)      catalog::fetch_for_order(&mut *tx)  │
//! │       │                             inventory::decrement_stock(..)      │
//! │       │ own pool connection         order::insert_order(..)             │
//! │       ▼                             tx.commit().await?;                 │
//! │  XxxRepository { pool }                  │                              │
//! │                                          │ free functions taking an     │
//! │                                          ▼ executor / &mut connection   │
//! │                              SQLite                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Free functions never open or commit a transaction themselves, so the
//! checkout can compose them into one unit of work.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog CRUD and restock
//! - [`DiscountRepository`](discount::DiscountRepository) - Discount admin
//! - [`CustomerRepository`](customer::CustomerRepository) - Customer lookups
//! - [`OrderRepository`](order::OrderRepository) - Order reads and lifecycle

pub mod catalog;
pub mod customer;
pub mod discount;
pub mod inventory;
pub mod order;
pub mod order_code;
pub mod product;

/// Generates a new entity ID (UUID v4).
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by the repository and checkout unit tests.

    use chrono::{DateTime, Duration, Utc};
    use storefront_core::{Discount, DiscountScope, DiscountType, Product};

    use crate::pool::{Database, DbConfig};

    pub async fn database() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn product(sku: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: super::generate_id(),
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            description: None,
            price_cents,
            stock,
            category_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn discount(code: &str, discount_type: DiscountType, value: i64, now: DateTime<Utc>) -> Discount {
        Discount {
            id: super::generate_id(),
            code: code.to_string(),
            description: None,
            discount_type,
            value,
            min_order_cents: 0,
            max_discount_cents: 0,
            usage_limit: 0,
            used_count: 0,
            is_active: true,
            starts_at: now - Duration::days(1),
            ends_at: now + Duration::days(30),
            created_at: now,
            updated_at: now,
            scope: DiscountScope::default(),
        }
    }
}
