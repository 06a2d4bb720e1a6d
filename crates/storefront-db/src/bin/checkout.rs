//! # Checkout Runner
//!
//! Places one order from a JSON request file and prints the result as JSON.
//!
//! ## Usage
//! ```bash
//! cargo run -p storefront-db --bin checkout -- order.json
//!
//! # Read the request from stdin
//! cat order.json | cargo run -p storefront-db --bin checkout -- -
//! ```
//!
//! Configuration comes from `STOREFRONT_*` environment variables
//! (see [`StoreConfig`]). Logs go to stderr; stdout carries only JSON.
//!
//! ## Output
//! - success: the placed order with its items, exit code 0
//! - failure: `{"error": "<kind>", "message": "...", "retryable": bool}`, exit code 1

use std::env;
use std::io::Read;
use std::process::ExitCode;

use serde_json::json;
use storefront_core::OrderRequest;
use storefront_db::{CheckoutService, Database, StoreConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let source = match args.get(1).map(String::as_str) {
        Some("--help" | "-h") | None => {
            println!("Storefront Checkout Runner");
            println!();
            println!("Usage: checkout <REQUEST.json | ->");
            return Ok(ExitCode::SUCCESS);
        }
        Some(source) => source.to_string(),
    };

    let raw = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(&source)?
    };
    let request: OrderRequest = serde_json::from_str(&raw)?;

    let config = StoreConfig::load()?;
    let db = Database::new(config.db_config()).await?;
    let checkout = CheckoutService::new(db.clone(), config.checkout_settings());

    let outcome = checkout.place_order(request).await;
    db.close().await;

    match outcome {
        Ok(placed) => {
            println!("{}", serde_json::to_string_pretty(&placed)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let body = json!({
                "error": err.kind(),
                "message": err.to_string(),
                "retryable": err.is_retryable(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(ExitCode::FAILURE)
        }
    }
}
