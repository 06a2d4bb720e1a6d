//! Store configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use storefront_core::pricing::ShippingPolicy;
use storefront_core::validation::validate_order_code_prefix;
use storefront_core::{Money, DEFAULT_ORDER_CODE_PREFIX};

use crate::checkout::CheckoutSettings;
use crate::pool::DbConfig;

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Order code prefix, e.g. `ORD` in `ORD-150324001`
    pub order_code_prefix: String,

    /// Orders with a subtotal at or above this ship free
    pub free_shipping_threshold_cents: i64,

    /// Flat shipping fee below the threshold
    pub shipping_fee_cents: i64,

    /// Offset of the store's local time from UTC; decides which day an order belongs to
    pub utc_offset_minutes: i32,

    /// How many times a checkout is rerun after losing an order-code race
    pub code_retry_limit: u32,

    /// Connection pool size
    pub max_connections: u32,

    /// How long a checkout waits for the write lock, in milliseconds
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            database_path: PathBuf::from("./storefront.db"),
            order_code_prefix: DEFAULT_ORDER_CODE_PREFIX.to_string(),
            free_shipping_threshold_cents: 50_000,
            shipping_fee_cents: 3_000,
            utc_offset_minutes: 0,
            code_retry_limit: 3,
            max_connections: 5,
            busy_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = StoreConfig::default();

        let config = StoreConfig {
            database_path: lookup("STOREFRONT_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            order_code_prefix: lookup("STOREFRONT_ORDER_CODE_PREFIX")
                .map(|prefix| prefix.trim().to_string())
                .unwrap_or(defaults.order_code_prefix),

            free_shipping_threshold_cents: parse_or(
                &lookup,
                "STOREFRONT_FREE_SHIPPING_THRESHOLD_CENTS",
                defaults.free_shipping_threshold_cents,
            )?,

            shipping_fee_cents: parse_or(
                &lookup,
                "STOREFRONT_SHIPPING_FEE_CENTS",
                defaults.shipping_fee_cents,
            )?,

            utc_offset_minutes: parse_or(
                &lookup,
                "STOREFRONT_UTC_OFFSET_MINUTES",
                defaults.utc_offset_minutes,
            )?,

            code_retry_limit: parse_or(
                &lookup,
                "STOREFRONT_CODE_RETRY_LIMIT",
                defaults.code_retry_limit,
            )?,

            max_connections: parse_or(
                &lookup,
                "STOREFRONT_MAX_CONNECTIONS",
                defaults.max_connections,
            )?,

            busy_timeout_ms: parse_or(
                &lookup,
                "STOREFRONT_BUSY_TIMEOUT_MS",
                defaults.busy_timeout_ms,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_order_code_prefix(&self.order_code_prefix)
            .map_err(|_| ConfigError::InvalidValue("STOREFRONT_ORDER_CODE_PREFIX".to_string()))?;

        if self.free_shipping_threshold_cents < 0 {
            return Err(ConfigError::InvalidValue(
                "STOREFRONT_FREE_SHIPPING_THRESHOLD_CENTS".to_string(),
            ));
        }
        if self.shipping_fee_cents < 0 {
            return Err(ConfigError::InvalidValue(
                "STOREFRONT_SHIPPING_FEE_CENTS".to_string(),
            ));
        }
        // Offsets in use worldwide stay within ±14h; chrono accepts < 24h.
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::InvalidValue(
                "STOREFRONT_UTC_OFFSET_MINUTES".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "STOREFRONT_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(())
    }

    /// Pool settings for this store.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }

    /// Checkout settings for this store.
    pub fn checkout_settings(&self) -> CheckoutSettings {
        CheckoutSettings {
            order_code_prefix: self.order_code_prefix.clone(),
            shipping: ShippingPolicy::new(
                Money::from_cents(self.free_shipping_threshold_cents),
                Money::from_cents(self.shipping_fee_cents),
            ),
            utc_offset_minutes: self.utc_offset_minutes,
            code_retry_limit: self.code_retry_limit,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
