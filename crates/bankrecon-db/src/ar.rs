//! Accounts-receivable side: invoice lookups and collection creation
//! (the "create full collection" path of the customer-collection
//! processor).

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use tracing::debug;

use bankrecon_config::CompanyConstants;
use bankrecon_core::CollectionRow;

use crate::error::DbResult;
use crate::sequences::{next_collection_group, next_collection_number};
use crate::value::{approx, money};

/// An AR invoice as read for collection matching.
#[derive(Debug, Clone)]
pub struct ARInvoiceInfo {
    pub series: String,
    pub number: i64,
    pub customer: String,
    pub customer_name: String,
    pub total: Decimal,
    pub balance: Decimal,
    pub subtotal: Decimal,
    pub vat: Decimal,
    pub excise: Decimal,
    pub status: String,
    pub salesperson: String,
    pub date: NaiveDate,
}

fn invoice_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<ARInvoiceInfo> {
    let date: String = r.get(11)?;
    Ok(ARInvoiceInfo {
        series: r.get(0)?,
        number: r.get(1)?,
        customer: r.get(2)?,
        customer_name: r.get(3)?,
        total: r.get::<_, String>(4)?.parse().unwrap_or_default(),
        balance: r.get::<_, String>(5)?.parse().unwrap_or_default(),
        subtotal: r.get::<_, String>(6)?.parse().unwrap_or_default(),
        vat: r.get::<_, String>(7)?.parse().unwrap_or_default(),
        excise: r.get::<_, String>(8)?.parse().unwrap_or_default(),
        status: r.get(9)?,
        salesperson: r.get(10)?,
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap_or_default(),
    })
}

const INVOICE_COLUMNS: &str = "series, number, customer, customer_name, total, balance, \
                               subtotal, vat, excise, status, salesperson, date";

/// Fetch one invoice by series and number. No balance filter so the
/// caller can report an already-settled invoice distinctly.
pub fn find_ar_invoice(
    conn: &Connection,
    series: &str,
    number: i64,
) -> DbResult<Option<ARInvoiceInfo>> {
    let sql = format!("SELECT {INVOICE_COLUMNS} FROM ARInvoice WHERE series = ?1 AND number = ?2");
    Ok(conn
        .query_row(&sql, params![series, number], invoice_from_row)
        .optional()?)
}

/// Amount fallback when the invoice number cannot be parsed from the
/// statement description: a pending invoice with a matching total,
/// closest to the statement date within the window.
pub fn find_ar_invoice_by_amount(
    conn: &Connection,
    series: &str,
    amount: Decimal,
    amount_tolerance: Decimal,
    date: NaiveDate,
    window_days: i64,
) -> DbResult<Option<ARInvoiceInfo>> {
    let sql = format!(
        "SELECT {INVOICE_COLUMNS} FROM ARInvoice
         WHERE series = ?1
           AND CAST(balance AS REAL) > 0
           AND ABS(CAST(total AS REAL) - ?2) <= ?3
           AND date BETWEEN DATE(?4, '-' || ?5 || ' days') AND DATE(?4, '+' || ?5 || ' days')
         ORDER BY ABS(JULIANDAY(date) - JULIANDAY(?4)) ASC
         LIMIT 1"
    );
    Ok(conn
        .query_row(
            &sql,
            params![
                series,
                approx(amount),
                approx(amount_tolerance),
                date.format("%Y-%m-%d").to_string(),
                window_days,
            ],
            invoice_from_row,
        )
        .optional()?)
}

/// Insert a collection row. Mints the collection and group numbers;
/// must run inside the plan transaction. Returns (collection, group).
pub fn insert_collection(
    conn: &Connection,
    row: &CollectionRow,
    constants: &CompanyConstants,
) -> DbResult<(i64, i64)> {
    let collection = next_collection_number(conn)?;
    let group = next_collection_group(conn)?;

    // When the loader produced no rate split, everything books at zero
    // rate, matching the legacy capture screen.
    let mut subtotal_zero = row.subtotal_zero;
    if subtotal_zero == Decimal::ZERO && row.subtotal_sixteen == Decimal::ZERO {
        subtotal_zero = row.amount;
    }

    conn.execute(
        "INSERT INTO ARCollection (
            series, number, collection, collection_group, customer, customer_name,
            date, amount, money_kind, method, bank, account, reference, status,
            salesperson, invoice_date, fx, created_by, kind, deposit_bank, branch,
            installment, previous_balance, pending_balance,
            vat, excise, subtotal_zero, subtotal_sixteen
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6,
                  ?7, ?8, ?9, 'Transfer', ?10, ?11, '', 'Collected',
                  ?12, ?13, '1.0000', ?14, 'COLLECTION', ?10, ?15,
                  1, ?8, '0.00',
                  ?16, ?17, ?18, ?19)",
        params![
            row.series,
            row.invoice_number,
            collection,
            group,
            row.customer,
            row.customer_name,
            row.collection_date.format("%Y-%m-%d").to_string(),
            money(row.amount),
            constants.currency,
            row.bank,
            row.account,
            row.salesperson,
            row.invoice_date.format("%Y-%m-%d").to_string(),
            constants.operator,
            constants.branch,
            money(row.vat),
            money(row.excise),
            money(subtotal_zero),
            money(row.subtotal_sixteen),
        ],
    )?;

    debug!(
        collection,
        group,
        invoice = format!("{}-{}", row.series, row.invoice_number),
        amount = %money(row.amount),
        "collection inserted"
    );
    Ok((collection, group))
}

/// Reduce an invoice's outstanding balance after a collection; fully
/// collected invoices flip status.
pub fn apply_collection(
    conn: &Connection,
    series: &str,
    number: i64,
    amount: Decimal,
) -> DbResult<()> {
    conn.execute(
        "UPDATE ARInvoice
         SET balance = printf('%.2f', CAST(balance AS REAL) - ?1),
             status = CASE
                 WHEN CAST(balance AS REAL) - ?1 <= 0.005 THEN 'Collected'
                 ELSE status
             END
         WHERE series = ?2 AND number = ?3",
        params![approx(amount), series, number],
    )?;
    Ok(())
}
