//! Canonical value conversions for the legacy schema.
//!
//! Money columns hold two-decimal strings, rate columns four-decimal
//! strings. Equality lookups (idempotency) compare these canonical
//! strings; tolerance lookups cast to REAL in SQL, which is safe at the
//! cent tolerances the engine uses.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{DbError, DbResult};

/// Canonical two-decimal money string.
pub fn money(d: Decimal) -> String {
    format!("{:.2}", d)
}

/// Canonical four-decimal rate string.
pub fn rate(d: Decimal) -> String {
    format!("{:.4}", d)
}

/// Parse a stored money/rate string back into a decimal.
pub fn parse_decimal(column: &str, value: &str) -> DbResult<Decimal> {
    Decimal::from_str(value).map_err(|_| DbError::BadDecimal {
        column: column.to_string(),
        value: value.to_string(),
    })
}

/// f64 view of a decimal for REAL-cast tolerance comparisons in SQL.
pub fn approx(d: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    d.to_f64().unwrap_or(0.0)
}
