//! Read-only reference queries used by the processors.

use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use tracing::warn;

use crate::error::DbResult;
use crate::value::parse_decimal;

/// VAT and excise portions of a sale invoice, (0, 0) when the invoice
/// is not on file (the caller warns and books zero tax lines).
pub fn invoice_vat_and_excise(
    conn: &Connection,
    series: &str,
    number: i64,
) -> DbResult<(Decimal, Decimal)> {
    let row = conn
        .query_row(
            "SELECT IFNULL(vat, '0.00'), IFNULL(excise, '0.00')
             FROM ARInvoice WHERE series = ?1 AND number = ?2",
            params![series, number],
            |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
        )
        .optional()?;

    match row {
        Some((vat, excise)) => Ok((
            parse_decimal("vat", &vat)?,
            parse_decimal("excise", &excise)?,
        )),
        None => {
            warn!(series, number, "invoice not found for tax breakdown");
            Ok((Decimal::ZERO, Decimal::ZERO))
        }
    }
}

/// Column names of the per-month credit totals on `LedgerBalance`.
const MONTH_CREDIT_COLUMNS: [&str; 12] = [
    "jan_credits",
    "feb_credits",
    "mar_credits",
    "apr_credits",
    "may_credits",
    "jun_credits",
    "jul_credits",
    "aug_credits",
    "sep_credits",
    "oct_credits",
    "nov_credits",
    "dec_credits",
];

/// Accumulated credits of one account for one month of a period year.
/// Used by the social-security processor's M-2 retention rule.
pub fn monthly_ledger_credits(
    conn: &Connection,
    account: &str,
    sub_account: &str,
    year: i32,
    month: u32,
) -> DbResult<Option<Decimal>> {
    if !(1..=12).contains(&month) {
        return Ok(None);
    }
    let column = MONTH_CREDIT_COLUMNS[(month - 1) as usize];
    let sql = format!(
        "SELECT {column} FROM LedgerBalance
         WHERE account = ?1 AND sub_account = ?2 AND period_year = ?3"
    );
    let value: Option<String> = conn
        .query_row(&sql, params![account, sub_account, year], |r| r.get(0))
        .optional()?;
    match value {
        Some(v) => Ok(Some(parse_decimal(column, &v)?)),
        None => Ok(None),
    }
}

/// True when the accounting period is open for writes.
pub fn period_is_open(
    conn: &Connection,
    bank: &str,
    account: &str,
    year: i32,
    month: u32,
) -> DbResult<bool> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM MovPeriod
             WHERE bank = ?1 AND account = ?2 AND year = ?3 AND month = ?4",
            params![bank, account, year, month],
            |r| r.get(0),
        )
        .optional()?;
    match status.as_deref() {
        Some("OPEN") => Ok(true),
        Some(other) => {
            warn!(bank, account, year, month, status = other, "period not open");
            Ok(false)
        }
        None => {
            warn!(bank, account, year, month, "period row missing");
            Ok(false)
        }
    }
}
