//! # Order Code Generator
//!
//! Issues `PREFIX-DDMMYY###` codes from a per-day counter row.
//!
//! ## Why a Counter Row
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ❌ "read max code, add one, insert" without a lock:                    │
//! │     checkout A reads ORD-150324041 ─┐                                   │
//! │     checkout B reads ORD-150324041 ─┴─► both insert ORD-150324042       │
//! │                                                                         │
//! │  ✅ counter row, incremented by a single write:                         │
//! │     INSERT (prefix, day, 0) ON CONFLICT DO NOTHING  ← takes write lock  │
//! │     UPDATE ... SET last_seq = last_seq + 1 RETURNING last_seq           │
//! │                                                                         │
//! │     The second checkout blocks on the write lock until the first        │
//! │     commits or rolls back, then sees its counter value.                 │
//! │     UNIQUE(order_code) on orders remains the last line of defence.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The counter is bumped inside the checkout transaction, so a rolled-back
//! checkout gives its number back. Before each bump it is raised past the
//! highest code already stored for that day, so codes written around the
//! counter (imports, manual fixes) are skipped instead of colliding on
//! every retry.

use chrono::NaiveDate;
use sqlx::SqliteConnection;
use storefront_core::order_code::{code_prefix, day_key, format_code, parse_sequence};
use tracing::debug;

use crate::error::DbResult;

/// Reserves the next order code for `date`.
///
/// Should be the first statement of the checkout transaction: it is a
/// write, so SQLite hands the transaction the write lock before anything
/// else is read.
pub async fn next_code(conn: &mut SqliteConnection, prefix: &str, date: NaiveDate) -> DbResult<String> {
    let day = day_key(date);

    sqlx::query(
        r#"
        INSERT INTO order_code_counters (prefix, day_key, last_seq)
        VALUES (?1, ?2, 0)
        ON CONFLICT (prefix, day_key) DO NOTHING
        "#,
    )
    .bind(prefix)
    .bind(&day)
    .execute(&mut *conn)
    .await?;

    catch_up_with_existing(conn, prefix, date).await?;

    let sequence: i64 = sqlx::query_scalar(
        r#"
        UPDATE order_code_counters
        SET last_seq = last_seq + 1
        WHERE prefix = ?1 AND day_key = ?2
        RETURNING last_seq
        "#,
    )
    .bind(prefix)
    .bind(&day)
    .fetch_one(&mut *conn)
    .await?;

    let code = format_code(prefix, date, sequence);
    debug!(code = %code, "Reserved order code");
    Ok(code)
}

/// Raises the counter to the highest code already stored for that day.
///
/// Never lowers it. Codes are compared by length first so `…1000` ranks
/// above `…999`. The range bounds keep the lookup on the order_code index
/// (`:` sorts right after `9`).
async fn catch_up_with_existing(conn: &mut SqliteConnection, prefix: &str, date: NaiveDate) -> DbResult<()> {
    let day_prefix = code_prefix(prefix, date);

    let highest: Option<String> = sqlx::query_scalar(
        r#"
        SELECT order_code
        FROM orders
        WHERE order_code > ?1 AND order_code < ?2
        ORDER BY length(order_code) DESC, order_code DESC
        LIMIT 1
        "#,
    )
    .bind(&day_prefix)
    .bind(format!("{day_prefix}:"))
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(sequence) = highest.as_deref().and_then(|code| parse_sequence(code, &day_prefix)) {
        debug!(day_prefix = %day_prefix, sequence, "Catching order code counter up");
        sqlx::query(
            r#"
            UPDATE order_code_counters
            SET last_seq = ?3
            WHERE prefix = ?1 AND day_key = ?2 AND last_seq < ?3
            "#,
        )
        .bind(prefix)
        .bind(day_key(date))
        .bind(sequence)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[tokio::test]
    async fn test_sequential_per_day_and_prefix() {
        let db = test_support::database().await;
        let mut conn = db.pool().acquire().await.unwrap();

        assert_eq!(next_code(&mut conn, "ORD", day()).await.unwrap(), "ORD-150324001");
        assert_eq!(next_code(&mut conn, "ORD", day()).await.unwrap(), "ORD-150324002");

        let tomorrow = day().succ_opt().unwrap();
        assert_eq!(next_code(&mut conn, "ORD", tomorrow).await.unwrap(), "ORD-160324001");
        assert_eq!(next_code(&mut conn, "WEB", day()).await.unwrap(), "WEB-150324001");
    }

    #[tokio::test]
    async fn test_rolled_back_code_is_reissued() {
        let db = test_support::database().await;

        {
            let mut tx = db.begin().await.unwrap();
            assert_eq!(next_code(&mut tx, "ORD", day()).await.unwrap(), "ORD-150324001");
        }

        let mut tx = db.begin().await.unwrap();
        assert_eq!(next_code(&mut tx, "ORD", day()).await.unwrap(), "ORD-150324001");
        tx.commit().await.unwrap();
    }

    async fn insert_raw_order(conn: &mut SqliteConnection, code: &str) {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_code, payment_method, subtotal_cents, total_cents,
                customer_name, customer_phone, customer_email, shipping_address,
                created_at, updated_at
            ) VALUES (?1, ?2, 'cod', 0, 0, 'n', 'p', 'e', 'a', ?3, ?3)
            "#,
        )
        .bind(super::super::generate_id())
        .bind(code)
        .bind(chrono::Utc::now())
        .execute(conn)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_counter_seeded_past_existing_codes() {
        let db = test_support::database().await;
        let mut conn = db.pool().acquire().await.unwrap();
        for code in ["ORD-150324999", "ORD-1503241000", "ORD-140324777"] {
            insert_raw_order(&mut conn, code).await;
        }

        assert_eq!(next_code(&mut conn, "ORD", day()).await.unwrap(), "ORD-1503241001");
    }

    #[tokio::test]
    async fn test_existing_counter_skips_codes_written_around_it() {
        let db = test_support::database().await;
        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(next_code(&mut conn, "ORD", day()).await.unwrap(), "ORD-150324001");

        insert_raw_order(&mut conn, "ORD-150324002").await;
        insert_raw_order(&mut conn, "ORD-150324005").await;
        assert_eq!(next_code(&mut conn, "ORD", day()).await.unwrap(), "ORD-150324006");

        // Other days and prefixes do not pull the counter along.
        insert_raw_order(&mut conn, "ORD-160324050").await;
        insert_raw_order(&mut conn, "WEB-150324050").await;
        assert_eq!(next_code(&mut conn, "ORD", day()).await.unwrap(), "ORD-150324007");
    }
}
