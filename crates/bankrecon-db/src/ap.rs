//! Accounts-payable side: self-generated purchase invoices (bank fees),
//! payments and payment links (expense-account settlements).

use chrono::{Local, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use tracing::debug;

use bankrecon_config::CompanyConstants;
use bankrecon_core::{APInvoiceMatch, APInvoiceRow, Folio, MovementRow};

use crate::error::DbResult;
use crate::sequences::{next_ap_invoice_number, next_ap_payment_number};
use crate::value::{approx, money, parse_decimal};

/// Series used for self-generated purchase invoices.
pub const AP_SERIES: &str = "F";

/// Insert a fabricated purchase invoice (header + one detail line).
/// Returns the number assigned within the series.
pub fn insert_ap_invoice(
    conn: &Connection,
    invoice: &APInvoiceRow,
    constants: &CompanyConstants,
) -> DbResult<i64> {
    let number = next_ap_invoice_number(conn, AP_SERIES)?;

    conn.execute(
        "INSERT INTO APInvoice (
            series, number, supplier, supplier_name, date,
            subtotal, vat, total, balance,
            invoice_ref, status, buyer,
            item_count, line_count, fx, money_kind, payment_method,
            branch, tax_id, receipt_kind, reference
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, '0.00',
                  ?9, 'Unpaid', ?10, 1, 1, '1.0000', ?11, 'PUE',
                  ?12, ?13, 'BANK FEES', 'CREDIT')",
        params![
            AP_SERIES,
            number,
            invoice.supplier,
            invoice.supplier_name,
            invoice.date.format("%Y-%m-%d").to_string(),
            money(invoice.subtotal),
            money(invoice.vat),
            money(invoice.total),
            invoice.reference,
            constants.operator,
            constants.currency,
            constants.branch,
            invoice.supplier_tax_id,
        ],
    )?;

    conn.execute(
        "INSERT INTO APInvoiceLine (
            series, number, position, product, product_name, supplier,
            quantity, unit_cost, taxed_cost, vat_rate, unit
        ) VALUES (?1, ?2, 1, ?3, ?4, ?5, '1.0000', ?6, ?7, '16.0000', 'PCE')",
        params![
            AP_SERIES,
            number,
            invoice.product,
            invoice.product_name,
            invoice.supplier,
            money(invoice.subtotal),
            money(invoice.total),
        ],
    )?;

    debug!(series = AP_SERIES, number, total = %money(invoice.total), "AP invoice inserted");
    Ok(number)
}

/// Register a payment against an AP invoice. Returns the payment number.
#[allow(clippy::too_many_arguments)]
pub fn insert_ap_payment(
    conn: &Connection,
    ap: &APInvoiceMatch,
    amount: Decimal,
    date: NaiveDate,
    movement: &MovementRow,
    folio: Folio,
    method: &str,
    constants: &CompanyConstants,
) -> DbResult<i64> {
    let payment = next_ap_payment_number(conn)?;
    let reference = format!("{}F: {}", movement.account, folio);

    conn.execute(
        "INSERT INTO APPayment (
            series, number, payment, supplier, supplier_name, date, amount,
            money_kind, method, bank, reference, status, buyer,
            invoice_date, fx, created_by, kind, invoice_ref,
            payment_request, receipt_kind, supplier_kind, payment_method
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7,
                  ?8, ?9, ?10, ?11, 'Paid', ?12,
                  ?13, '1.0000', ?12, 'PAYMENT', ?14,
                  1, ?15, ?16, ?17)",
        params![
            ap.series,
            ap.number,
            payment,
            ap.supplier,
            ap.supplier_name,
            date.format("%Y-%m-%d").to_string(),
            money(amount),
            constants.currency,
            method,
            movement.bank,
            reference,
            constants.operator,
            date.format("%Y-%m-%d").to_string(),
            ap.invoice_ref,
            ap.receipt_kind,
            ap.supplier_kind,
            ap.payment_method,
        ],
    )?;

    debug!(payment, number = ap.number, amount = %money(amount), "AP payment inserted");
    Ok(payment)
}

/// Link a movement to the AP invoice it settles.
#[allow(clippy::too_many_arguments)]
pub fn insert_ap_payment_link(
    conn: &Connection,
    ap: &APInvoiceMatch,
    payment: i64,
    amount: Decimal,
    movement: &MovementRow,
    folio: Folio,
    constants: &CompanyConstants,
) -> DbResult<()> {
    conn.execute(
        "INSERT INTO APPaymentLink (
            bank, account, year, month, folio,
            series, number, payment, invoice_date, settled,
            invoice_total, paid, invoice_ref, vat, vat_rate, branch,
            paid_base, paid_vat, payment_method, receipt_kind, tax_id, supplier
        ) VALUES (?1, ?2, ?3, ?4, ?5,
                  ?6, ?7, ?8, ?9, 1,
                  ?10, ?11, ?12, ?13, '16.00', ?14,
                  ?15, ?16, ?17, ?18, ?19, ?20)",
        params![
            movement.bank,
            movement.account,
            movement.year,
            movement.month,
            folio,
            ap.series,
            ap.number,
            payment,
            Local::now().naive_local().format("%Y-%m-%d").to_string(),
            money(amount),
            money(amount),
            ap.invoice_ref,
            money(ap.vat),
            constants.branch,
            money(ap.total - ap.vat),
            money(ap.vat),
            ap.payment_method,
            ap.receipt_kind,
            ap.tax_id,
            ap.supplier,
        ],
    )?;
    Ok(())
}

/// Apply a payment to the invoice balance; fully-paid invoices flip
/// status.
pub fn settle_ap_invoice(
    conn: &Connection,
    series: &str,
    number: i64,
    amount: Decimal,
) -> DbResult<()> {
    conn.execute(
        "UPDATE APInvoice
         SET balance = printf('%.2f', CAST(balance AS REAL) - ?1),
             status = CASE
                 WHEN CAST(balance AS REAL) - ?1 <= 0.005 THEN 'Paid'
                 ELSE status
             END
         WHERE series = ?2 AND number = ?3",
        params![approx(amount), series, number],
    )?;
    debug!(series, number, amount = %money(amount), "AP invoice settled");
    Ok(())
}

/// Find a pending AP invoice whose total is within `tolerance` of the
/// bank amount, preferring the closest total and the most recent date.
pub fn find_unpaid_ap_invoice(
    conn: &Connection,
    amount: Decimal,
    tolerance: Decimal,
) -> DbResult<Option<APInvoiceMatch>> {
    struct RawMatch {
        series: String,
        number: i64,
        total: String,
        balance: String,
        vat: String,
        supplier: String,
        supplier_name: String,
        supplier_kind: String,
        tax_id: String,
        invoice_ref: String,
        receipt_kind: String,
        payment_method: String,
    }

    let raw = conn
        .query_row(
            "SELECT series, number, total, balance, vat,
                    supplier, supplier_name, supplier_kind, tax_id,
                    invoice_ref, receipt_kind, payment_method
             FROM APInvoice
             WHERE CAST(balance AS REAL) > 0
               AND status NOT IN ('Paid', 'Cancelled')
               AND ABS(CAST(total AS REAL) - ?1) <= ?2
             ORDER BY ABS(CAST(total AS REAL) - ?1) ASC, date DESC
             LIMIT 1",
            params![approx(amount), approx(tolerance)],
            |r| {
                Ok(RawMatch {
                    series: r.get(0)?,
                    number: r.get(1)?,
                    total: r.get(2)?,
                    balance: r.get(3)?,
                    vat: r.get(4)?,
                    supplier: r.get(5)?,
                    supplier_name: r.get(6)?,
                    supplier_kind: r.get(7)?,
                    tax_id: r.get(8)?,
                    invoice_ref: r.get(9)?,
                    receipt_kind: r.get(10)?,
                    payment_method: r.get(11)?,
                })
            },
        )
        .optional()?;

    match raw {
        Some(raw) => Ok(Some(APInvoiceMatch {
            total: parse_decimal("total", &raw.total)?,
            balance: parse_decimal("balance", &raw.balance)?,
            vat: parse_decimal("vat", &raw.vat)?,
            series: raw.series,
            number: raw.number,
            supplier: raw.supplier,
            supplier_name: raw.supplier_name,
            supplier_kind: raw.supplier_kind,
            tax_id: raw.tax_id,
            invoice_ref: raw.invoice_ref,
            receipt_kind: raw.receipt_kind,
            payment_method: raw.payment_method,
        })),
        None => Ok(None),
    }
}

/// Idempotency probe: an already-paid invoice with the same total.
pub fn find_paid_ap_invoice(
    conn: &Connection,
    amount: Decimal,
    tolerance: Decimal,
) -> DbResult<Option<(String, i64, Decimal, String)>> {
    let row = conn
        .query_row(
            "SELECT series, number, total, supplier_name
             FROM APInvoice
             WHERE status = 'Paid'
               AND ABS(CAST(total AS REAL) - ?1) <= ?2
             ORDER BY ABS(CAST(total AS REAL) - ?1) ASC
             LIMIT 1",
            params![approx(amount), approx(tolerance)],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;
    match row {
        Some((series, number, total, name)) => {
            let total = parse_decimal("total", &total)?;
            Ok(Some((series, number, total, name)))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use rust_decimal_macros::dec;

    fn seed_invoice(db: &Database, number: i64, total: Decimal, vat: Decimal, balance: Decimal) {
        db.conn()
            .execute(
                "INSERT INTO APInvoice (
                    series, number, supplier, supplier_name, date,
                    subtotal, vat, total, balance, invoice_ref, status, buyer, branch
                ) VALUES ('F', ?1, '000123', 'ACME SUPPLIES', '2026-02-01',
                          ?2, ?3, ?4, ?5, 'A-1', 'Unpaid', 'T', 5)",
                params![
                    number,
                    money(total - vat),
                    money(vat),
                    money(total),
                    money(balance)
                ],
            )
            .unwrap();
    }

    #[test]
    fn test_fee_invoice_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let constants = CompanyConstants::default();
        let invoice = APInvoiceRow {
            supplier: "001081".to_string(),
            supplier_name: "REGIONAL BANK".to_string(),
            reference: "05022026".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 2, 5).unwrap(),
            subtotal: dec!(30.00),
            vat: dec!(4.80),
            total: dec!(34.80),
            product: "001002002".to_string(),
            product_name: "TERMINAL FEE".to_string(),
            supplier_tax_id: "BRM940216EQ6".to_string(),
        };
        let number = insert_ap_invoice(db.conn(), &invoice, &constants).unwrap();
        assert_eq!(number, 1);

        let (total, lines): (String, i64) = db
            .conn()
            .query_row(
                "SELECT total, (SELECT COUNT(*) FROM APInvoiceLine WHERE number = ?1)
                 FROM APInvoice WHERE number = ?1",
                params![number],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(total, "34.80");
        assert_eq!(lines, 1);
    }

    #[test]
    fn test_find_unpaid_prefers_closest_total() {
        let db = Database::open_in_memory().unwrap();
        seed_invoice(&db, 1, dec!(1000.30), dec!(138.00), dec!(1000.30));
        seed_invoice(&db, 2, dec!(1000.05), dec!(138.00), dec!(1000.05));

        let hit = find_unpaid_ap_invoice(db.conn(), dec!(1000.00), dec!(0.50))
            .unwrap()
            .unwrap();
        assert_eq!(hit.number, 2);
        assert_eq!(hit.total, dec!(1000.05));
    }

    #[test]
    fn test_settle_flips_status_when_exhausted() {
        let db = Database::open_in_memory().unwrap();
        seed_invoice(&db, 1, dec!(500.00), dec!(68.97), dec!(500.00));
        settle_ap_invoice(db.conn(), "F", 1, dec!(500.00)).unwrap();

        let (balance, status): (String, String) = db
            .conn()
            .query_row(
                "SELECT balance, status FROM APInvoice WHERE number = 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(balance, "0.00");
        assert_eq!(status, "Paid");

        let paid = find_paid_ap_invoice(db.conn(), dec!(500.00), dec!(0.50))
            .unwrap()
            .unwrap();
        assert_eq!(paid.1, 1);
    }
}
