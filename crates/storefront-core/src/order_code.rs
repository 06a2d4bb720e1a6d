//! # Order Codes
//!
//! Formatting and parsing of human-readable order codes.
//!
//! ## Format
//! ```text
//!   ORD-150324007
//!   ─┬─ ───┬── ─┬─
//!    │     │    └── sequence within the day, zero-padded to 3 digits
//!    │     │        (grows to 4+ digits after 999: ORD-1503241000)
//!    │     └─────── day key DDMMYY in the store's local time
//!    └───────────── store prefix (A-Z, 0-9)
//! ```
//!
//! Sequences are issued by the counter table in storefront-db; this module
//! only knows the string format.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::error::ValidationError;

/// Width the sequence is padded to.
pub const SEQUENCE_WIDTH: usize = 3;

/// `DDMMYY` key of a calendar day.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%d%m%y").to_string()
}

/// The part of a code shared by every order of the day, e.g. `ORD-150324`.
pub fn code_prefix(prefix: &str, date: NaiveDate) -> String {
    format!("{}-{}", prefix, day_key(date))
}

/// Builds a full order code.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use storefront_core::order_code::format_code;
///
/// let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
/// assert_eq!(format_code("ORD", day, 7), "ORD-150324007");
/// assert_eq!(format_code("ORD", day, 1000), "ORD-1503241000");
/// ```
pub fn format_code(prefix: &str, date: NaiveDate, sequence: i64) -> String {
    format!(
        "{}{:0width$}",
        code_prefix(prefix, date),
        sequence,
        width = SEQUENCE_WIDTH
    )
}

/// Extracts the sequence number from a code issued under `day_prefix`.
///
/// Returns `None` for codes of another day or with a malformed suffix.
pub fn parse_sequence(code: &str, day_prefix: &str) -> Option<i64> {
    let suffix = code.strip_prefix(day_prefix)?;
    if suffix.len() < SEQUENCE_WIDTH || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// The calendar day of `now` at a fixed UTC offset.
pub fn local_date(now: DateTime<Utc>, utc_offset_minutes: i32) -> Result<NaiveDate, ValidationError> {
    let offset = utc_offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or(ValidationError::OutOfRange {
            field: "utc_offset_minutes".to_string(),
            min: -1439,
            max: 1439,
        })?;
    Ok(now.with_timezone(&offset).date_naive())
}
