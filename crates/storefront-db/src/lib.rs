//! # storefront-db: Database Layer for the Storefront Order Engine
//!
//! This crate owns persistence for the storefront and the checkout
//! transaction that places orders. It uses SQLite through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Storefront Data Flow                               │
//! │                                                                         │
//! │  caller (HTTP handler, `checkout` binary, tests)                        │
//! │       │  OrderRequest                                                   │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                   storefront-db (THIS CRATE)                    │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │    │
//! │  │   │CheckoutService│───►│ Repositories  │    │  Migrations  │    │    │
//! │  │   │ (checkout.rs) │    │ inventory     │    │  (embedded)  │    │    │
//! │  │   │               │    │ discount      │    │              │    │    │
//! │  │   │ one tx per    │    │ customer      │    │ 001_initial  │    │    │
//! │  │   │ order         │    │ order_code    │    │ _schema.sql  │    │    │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘    │    │
//! │  │           │ pricing, discount  │                                │    │
//! │  │           ▼ rules              ▼                                │    │
//! │  │     storefront-core       Database (pool.rs)                    │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL) at STOREFRONT_DATABASE_PATH                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`checkout`] - The order transaction coordinator
//! - [`config`] - Environment configuration
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and checkout error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_db::{CheckoutService, Database, StoreConfig};
//!
//! let config = StoreConfig::load()?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let checkout = CheckoutService::new(db, config.checkout_settings());
//! let placed = checkout.place_order(request).await?;
//! println!("{}", placed.order.order_code);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutService, CheckoutSettings, LoggingObserver, OrderObserver};
pub use config::{ConfigError, StoreConfig};
pub use error::{CheckoutError, ConflictKind, DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::discount::DiscountRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
