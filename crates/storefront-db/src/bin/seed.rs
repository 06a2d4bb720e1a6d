//! # Seed Data Generator
//!
//! Populates the database with a small apparel catalog and a few discount
//! codes for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./storefront.db
//! cargo run -p storefront-db --bin seed
//!
//! # Specify database path
//! cargo run -p storefront-db --bin seed -- --db ./data/shop.db
//! ```
//!
//! ## Generated Data
//! - Categories: Outerwear, Tops, Accessories
//! - Each category's products in S/M/L sizes: SKU `{CATEGORY}-{ITEM}-{SIZE}`
//! - Discounts:
//!   - `SAVE10`  10% off, capped at 50.00
//!   - `WELCOME` 20.00 off orders of 100.00 or more, first 100 uses
//!   - `TOPS15`  15% off orders containing a top

use chrono::{Duration, Utc};
use std::env;
use storefront_core::{Discount, DiscountScope, DiscountType, Product};
use storefront_db::repository::generate_id;
use storefront_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

/// Categories with (item code, name, base price in cents)
const CATEGORIES: &[(&str, &str, &[(&str, &str, i64)])] = &[
    (
        "OUT",
        "Outerwear",
        &[
            ("JKT", "Denim Jacket", 60_000),
            ("PRK", "Parka", 95_000),
            ("WBK", "Windbreaker", 42_000),
        ],
    ),
    (
        "TOP",
        "Tops",
        &[
            ("TEE", "Cotton Tee", 12_000),
            ("OXF", "Oxford Shirt", 28_000),
            ("HOO", "Hoodie", 35_000),
        ],
    ),
    (
        "ACC",
        "Accessories",
        &[
            ("CAP", "Baseball Cap", 15_000),
            ("SCF", "Wool Scarf", 18_000),
            ("BLT", "Leather Belt", 22_000),
        ],
    ),
];

/// Size variants with price add-on in cents
const SIZES: &[(&str, i64)] = &[("S", 0), ("M", 0), ("L", 2_000)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,storefront_db=debug")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./storefront.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Storefront Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./storefront.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Storefront Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let now = Utc::now();
    let mut generated = 0;
    let mut tops_category = None;

    for (category_code, category_name, items) in CATEGORIES {
        let category_id = generate_id();
        sqlx::query("INSERT INTO categories (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&category_id)
            .bind(*category_name)
            .bind(now)
            .execute(db.pool())
            .await?;

        if *category_code == "TOP" {
            tops_category = Some(category_id.clone());
        }

        for (index, (item_code, item_name, base_price)) in items.iter().enumerate() {
            for (size, price_addon) in SIZES {
                let product = Product {
                    id: generate_id(),
                    sku: format!("{}-{}-{}", category_code, item_code, size),
                    name: format!("{} ({})", item_name, size),
                    description: None,
                    price_cents: base_price + price_addon,
                    stock: 10 + (index as i64 * 7) % 25,
                    category_id: Some(category_id.clone()),
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                };

                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.sku, e);
                    continue;
                }
                generated += 1;
            }
        }
    }

    println!("✓ Generated {} products", generated);

    let discounts = [
        Discount {
            max_discount_cents: 5_000,
            ..sample_discount("SAVE10", "10% off, up to 50.00", DiscountType::Percentage, 10)
        },
        Discount {
            min_order_cents: 10_000,
            usage_limit: 100,
            ..sample_discount("WELCOME", "20.00 off your first order", DiscountType::Fixed, 2_000)
        },
        Discount {
            scope: DiscountScope {
                product_ids: Vec::new(),
                category_ids: tops_category.into_iter().collect(),
            },
            ..sample_discount("TOPS15", "15% off when you buy a top", DiscountType::Percentage, 15)
        },
    ];

    for discount in &discounts {
        db.discounts().insert(discount).await?;
        println!("✓ Discount {}", discount.code);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// A discount valid for the next 90 days with no limits.
fn sample_discount(code: &str, description: &str, discount_type: DiscountType, value: i64) -> Discount {
    let now = Utc::now();
    Discount {
        id: generate_id(),
        code: code.to_string(),
        description: Some(description.to_string()),
        discount_type,
        value,
        min_order_cents: 0,
        max_discount_cents: 0,
        usage_limit: 0,
        used_count: 0,
        is_active: true,
        starts_at: now,
        ends_at: now + Duration::days(90),
        created_at: now,
        updated_at: now,
        scope: DiscountScope::default(),
    }
}
