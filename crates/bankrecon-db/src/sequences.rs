//! Monotonic sequence minting (folio, ledger number, payment and
//! collection numbers).
//!
//! All of these read MAX+1 and MUST be called inside the plan's write
//! transaction: the transaction serialises concurrent minting, so two
//! jobs never observe and commit the same next value.

use rusqlite::{params, Connection};
use tracing::debug;

use bankrecon_core::{Folio, LedgerNumber};

use crate::error::DbResult;

/// Next folio for the movement table (globally unique).
pub fn next_folio(conn: &Connection) -> DbResult<Folio> {
    let folio: i64 = conn.query_row(
        "SELECT IFNULL(MAX(folio), 0) + 1 FROM MovHeader",
        [],
        |r| r.get(0),
    )?;
    debug!(folio, "next folio");
    Ok(folio)
}

/// Next ledger number within one accounting source.
pub fn next_ledger_number(conn: &Connection, source: &str) -> DbResult<LedgerNumber> {
    let number: i64 = conn.query_row(
        "SELECT IFNULL(MAX(ledger_number), 0) + 1 FROM LedgerEntry WHERE source = ?1",
        params![source],
        |r| r.get(0),
    )?;
    debug!(number, source, "next ledger number");
    Ok(number)
}

/// Next AP invoice number within a series.
pub fn next_ap_invoice_number(conn: &Connection, series: &str) -> DbResult<i64> {
    let number: i64 = conn.query_row(
        "SELECT IFNULL(MAX(number), 0) + 1 FROM APInvoice WHERE series = ?1",
        params![series],
        |r| r.get(0),
    )?;
    Ok(number)
}

/// Next AP payment number (global).
pub fn next_ap_payment_number(conn: &Connection) -> DbResult<i64> {
    let number: i64 = conn.query_row(
        "SELECT IFNULL(MAX(payment), 0) + 1 FROM APPayment",
        [],
        |r| r.get(0),
    )?;
    Ok(number)
}

/// Next AR collection number (global).
pub fn next_collection_number(conn: &Connection) -> DbResult<i64> {
    let number: i64 = conn.query_row(
        "SELECT IFNULL(MAX(collection), 0) + 1 FROM ARCollection",
        [],
        |r| r.get(0),
    )?;
    Ok(number)
}

/// Next AR collection-group number (global).
pub fn next_collection_group(conn: &Connection) -> DbResult<i64> {
    let number: i64 = conn.query_row(
        "SELECT IFNULL(MAX(collection_group), 0) + 1 FROM ARCollection",
        [],
        |r| r.get(0),
    )?;
    Ok(number)
}
