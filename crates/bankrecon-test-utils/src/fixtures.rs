//! Fixture builders: statement lines, treasury closes, payroll data and
//! seeded databases.

use chrono::NaiveDate;
use rusqlite::params;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use bankrecon_core::{BankMovement, DailyClose, Payroll, PayrollItem, SaleInvoice};
use bankrecon_db::Database;

pub const CASH_ACCOUNT: &str = "055003730017";
pub const CARD_ACCOUNT: &str = "038900320016";
pub const EXPENSE_ACCOUNT: &str = "055003730157";

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
}

/// A credit (inflow) statement line.
pub fn credit_line(
    when: NaiveDate,
    description: &str,
    amount: Decimal,
    account: &str,
) -> BankMovement {
    BankMovement {
        date: when,
        description: description.to_string(),
        debit: None,
        credit: Some(amount),
        account: account.to_string(),
        sheet: account.to_string(),
        kind: None,
    }
}

/// A debit (outflow) statement line.
pub fn debit_line(
    when: NaiveDate,
    description: &str,
    amount: Decimal,
    account: &str,
) -> BankMovement {
    BankMovement {
        date: when,
        description: description.to_string(),
        debit: Some(amount),
        credit: None,
        account: account.to_string(),
        sheet: account.to_string(),
        kind: None,
    }
}

/// A daily close with a global invoice and card/cash totals.
pub fn close(
    close_date: NaiveDate,
    global_number: &str,
    global_amount: Decimal,
    total_cash: Decimal,
    total_card: Decimal,
) -> DailyClose {
    DailyClose {
        close_date,
        sheet: close_date.format("%d").to_string(),
        invoices: vec![],
        global_invoice_number: Some(global_number.to_string()),
        global_invoice_amount: Some(global_amount),
        total_sales: Some(total_cash + total_card),
        total_cash: Some(total_cash),
        total_card: Some(total_card),
        total_other: None,
        treasury_folio: None,
    }
}

/// Add individual invoices to a close.
pub fn with_invoices(mut close: DailyClose, invoices: &[(&str, Decimal)]) -> DailyClose {
    close.invoices = invoices
        .iter()
        .map(|(number, amount)| SaleInvoice {
            series: "FD".to_string(),
            number: number.to_string(),
            amount: *amount,
        })
        .collect();
    close
}

/// A small payroll with standard buckets rebuilt.
pub fn payroll(dispersion: Decimal, checks: Decimal, vacations: Decimal) -> Payroll {
    let mut p = Payroll {
        number: 3,
        dispersion_total: dispersion,
        checks_total: checks,
        vacations_total: vacations,
        severance_total: Decimal::ZERO,
        perceptions: vec![PayrollItem {
            concept: "Salaries".to_string(),
            account: "6200".to_string(),
            sub_account: "010000".to_string(),
            amount: dispersion + checks + vacations + dec!(10000),
        }],
        deductions: vec![PayrollItem {
            concept: "Income tax".to_string(),
            account: "2140".to_string(),
            sub_account: "020000".to_string(),
            amount: dec!(10000),
        }],
        buckets: vec![],
    };
    p.rebuild_buckets();
    p
}

/// Fresh in-memory database with the schema applied.
pub fn memory_db() -> Database {
    Database::open_in_memory().expect("in-memory database opens")
}

/// Seed a sale invoice (series D) with a VAT/excise breakdown so the
/// sale processors can look it up.
pub fn seed_sale_invoice(db: &Database, number: i64, total: Decimal, vat: Decimal, excise: Decimal) {
    db.conn()
        .execute(
            "INSERT INTO ARInvoice (series, number, customer, total, balance, subtotal,
             vat, excise, status, date)
             VALUES ('D', ?1, 'GLOBAL', ?2, '0.00', ?3, ?4, ?5, 'Issued', '2026-02-01')",
            params![
                number,
                format!("{:.2}", total),
                format!("{:.2}", total - vat - excise),
                format!("{:.2}", vat),
                format!("{:.2}", excise)
            ],
        )
        .expect("sale invoice seeds");
}

/// Seed a ledger-balance row with credits for one month.
pub fn seed_ledger_credits(
    db: &Database,
    account: &str,
    sub_account: &str,
    period_year: i32,
    month_column: &str,
    credits: Decimal,
) {
    let sql = format!(
        "INSERT INTO LedgerBalance (account, sub_account, period_year, {month_column})
         VALUES (?1, ?2, ?3, ?4)"
    );
    db.conn()
        .execute(
            &sql,
            params![account, sub_account, period_year, format!("{:.2}", credits)],
        )
        .expect("ledger balance seeds");
}

/// Mark an accounting period open.
pub fn seed_open_period(db: &Database, bank: &str, account: &str, year: i32, month: u32) {
    db.conn()
        .execute(
            "INSERT OR REPLACE INTO MovPeriod (bank, account, year, month, status)
             VALUES (?1, ?2, ?3, ?4, 'OPEN')",
            params![bank, account, year, month],
        )
        .expect("period seeds");
}
