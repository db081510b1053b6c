//! Operations on the movement-to-invoice link table (`MovInvoices`).

use chrono::Local;
use rusqlite::{params, Connection};
use tracing::debug;

use bankrecon_config::CompanyConstants;
use bankrecon_core::{Folio, InvoiceLinkRow, MovementRow};

use crate::error::DbResult;
use crate::value::money;

/// Insert one invoice link under a movement's folio. The parent keys
/// come from the movement row.
pub fn insert_invoice_link(
    conn: &Connection,
    link: &InvoiceLinkRow,
    movement: &MovementRow,
    folio: Folio,
    constants: &CompanyConstants,
) -> DbResult<()> {
    conn.execute(
        "INSERT INTO MovInvoices (
            bank, account, year, month, folio, day, branch,
            series, number, applied, invoice_date, kind,
            invoice_total, invoice_balance, created_at, after_deposit
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, 0)",
        params![
            movement.bank,
            movement.account,
            movement.year,
            movement.month,
            folio,
            movement.day,
            constants.branch,
            link.series,
            link.number,
            money(link.applied),
            link.invoice_date.format("%Y-%m-%d").to_string(),
            link.kind.as_str(),
            money(link.invoice_total),
            money(link.invoice_balance),
            Local::now().naive_local().format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    debug!(
        folio,
        invoice = format!("{}-{}", link.series, link.number),
        kind = link.kind.as_str(),
        applied = %money(link.applied),
        "invoice link inserted"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use bankrecon_core::InvoiceLinkKind;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insert_link() {
        let db = Database::open_in_memory().unwrap();
        let constants = CompanyConstants::default();
        let movement = MovementRow {
            bank: "BANREGIO".to_string(),
            account: "038900320016".to_string(),
            year: 2026,
            month: 2,
            day: 3,
            ..MovementRow::default()
        };
        let link = InvoiceLinkRow {
            series: "FD".to_string(),
            number: "20204".to_string(),
            applied: dec!(215370.52),
            invoice_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            kind: InvoiceLinkKind::Global,
            invoice_total: dec!(725897.52),
            invoice_balance: dec!(0),
        };
        insert_invoice_link(db.conn(), &link, &movement, 10, &constants).unwrap();

        let (folio, kind, applied): (i64, String, String) = db
            .conn()
            .query_row(
                "SELECT folio, kind, applied FROM MovInvoices WHERE number = '20204'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!(folio, 10);
        assert_eq!(kind, "GLOBAL");
        assert_eq!(applied, "215370.52");
    }
}
