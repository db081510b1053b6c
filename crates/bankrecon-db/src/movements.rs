//! Operations on the movement table (`MovHeader`).

use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use tracing::debug;

use bankrecon_config::CompanyConstants;
use bankrecon_core::{Folio, MovementRow};

use crate::error::DbResult;
use crate::value::{approx, money, rate};

/// Insert a movement row under an already-minted folio.
pub fn insert_movement(
    conn: &Connection,
    row: &MovementRow,
    folio: Folio,
    constants: &CompanyConstants,
) -> DbResult<()> {
    let now = Local::now().naive_local();
    let (cp_code, cp_name, cp_kind, cp_tax) = match &row.counterparty {
        Some(cp) => (
            Some(cp.code.as_str()),
            Some(cp.name.as_str()),
            Some(cp.kind.as_str()),
            Some(cp.tax_id.as_str()),
        ),
        None => (None, None, None, None),
    };

    conn.execute(
        "INSERT INTO MovHeader (
            folio, bank, account, year, month, day, kind,
            inflow, outflow, description, class, payment_method, sub_kind,
            reconciled, fx, fx_dof, money_kind,
            co, source, office, account_office,
            ledger_kind, ledger_number,
            created_by, branch, balance,
            created_at, created_hour,
            invoice_ref, reference, check_number,
            counterparty, counterparty_name, counterparty_kind, counterparty_tax
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7,
            ?8, ?9, ?10, ?11, ?12, ?13,
            ?14, ?15, ?16, ?17,
            ?18, ?19, ?20, ?21,
            ?22, 0,
            ?23, ?24, '0.00',
            ?25, ?26,
            ?27, ?28, ?29,
            ?30, ?31, ?32, ?33
        )",
        params![
            folio,
            row.bank,
            row.account,
            row.year,
            row.month,
            row.day,
            row.kind.code(),
            money(row.inflow),
            money(row.outflow),
            row.description,
            row.class,
            row.payment_method,
            row.expense_kind,
            row.reconciled as i64,
            rate(row.fx_rate),
            row.fx_rate_dof.map(rate),
            constants.currency,
            constants.company,
            constants.source,
            constants.office,
            constants.account_office,
            row.ledger_kind.as_str(),
            constants.operator,
            constants.branch,
            now.format("%Y-%m-%d").to_string(),
            now.format("%H:%M:%S").to_string(),
            row.invoice_ref,
            row.reference,
            row.check_number,
            cp_code,
            cp_name,
            cp_kind,
            cp_tax,
        ],
    )?;

    debug!(
        folio,
        kind = row.kind.code(),
        amount = %money(row.amount()),
        "movement inserted"
    );
    Ok(())
}

/// Point a movement at its ledger entry (written after the lines).
pub fn set_ledger_number(conn: &Connection, folio: Folio, ledger_number: i64) -> DbResult<()> {
    conn.execute(
        "UPDATE MovHeader SET ledger_number = ?1 WHERE folio = ?2",
        params![ledger_number, folio],
    )?;
    Ok(())
}

/// Mark an existing movement reconciled.
pub fn mark_reconciled(conn: &Connection, folio: Folio) -> DbResult<()> {
    conn.execute(
        "UPDATE MovHeader SET reconciled = 1 WHERE folio = ?1 AND reconciled = 0",
        params![folio],
    )?;
    debug!(folio, "movement reconciled");
    Ok(())
}

/// Natural-key existence check: same bank/account/date, same description,
/// amount on either side.
pub fn movement_exists(
    conn: &Connection,
    bank: &str,
    account: &str,
    year: i32,
    month: u32,
    day: u32,
    description: &str,
    amount: Decimal,
) -> DbResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM MovHeader
         WHERE bank = ?1 AND account = ?2
           AND year = ?3 AND month = ?4 AND day = ?5
           AND description = ?6
           AND (inflow = ?7 OR outflow = ?7)",
        params![bank, account, year, month, day, description, money(amount)],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

/// Idempotency lookup on the movement natural key: bank + account +
/// date + description + amount on the correct side. Unreconciled rows
/// come first (candidates for reconciliation instead of insertion).
#[allow(clippy::too_many_arguments)]
pub fn find_existing_movement(
    conn: &Connection,
    bank: &str,
    account: &str,
    year: i32,
    month: u32,
    day: u32,
    description: &str,
    amount: Decimal,
    is_inflow: bool,
) -> DbResult<Option<(Folio, bool)>> {
    let side = if is_inflow { "inflow" } else { "outflow" };
    let sql = format!(
        "SELECT folio, reconciled FROM MovHeader
         WHERE bank = ?1 AND account = ?2
           AND year = ?3 AND month = ?4 AND day = ?5
           AND description = ?6
           AND {side} = ?7
         ORDER BY reconciled ASC, created_at ASC, folio ASC
         LIMIT 1"
    );
    let row = conn
        .query_row(
            &sql,
            params![bank, account, year, month, day, description, money(amount)],
            |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)? != 0)),
        )
        .optional()?;
    Ok(row)
}

/// Reconciliation lookup for rows captured by other modules: matching
/// account, movement kind, direction, amount within tolerance, date
/// within a +/- day window. Used by the supplier-payment and collection
/// processors.
#[allow(clippy::too_many_arguments)]
pub fn find_unreconciled(
    conn: &Connection,
    account: &str,
    kind_code: i64,
    is_inflow: bool,
    amount: Decimal,
    amount_tolerance: Decimal,
    date: chrono::NaiveDate,
    window_days: i64,
    description_contains: Option<&str>,
) -> DbResult<Option<(Folio, String)>> {
    let side = if is_inflow { "inflow" } else { "outflow" };
    let description_filter = match description_contains {
        Some(_) => "AND description LIKE '%' || ?7 || '%'",
        None => "AND ?7 IS NULL",
    };
    let sql = format!(
        "SELECT folio, description FROM MovHeader
         WHERE account = ?1
           AND kind = ?2
           AND reconciled = 0
           AND DATE(year || '-' || printf('%02d', month) || '-' || printf('%02d', day))
               BETWEEN DATE(?3, '-' || ?4 || ' days') AND DATE(?3, '+' || ?4 || ' days')
           AND ABS(CAST({side} AS REAL) - ?5) <= ?6
           {description_filter}
         ORDER BY ABS(CAST({side} AS REAL) - ?5) ASC
         LIMIT 1"
    );
    let row = conn
        .query_row(
            &sql,
            params![
                account,
                kind_code,
                date.format("%Y-%m-%d").to_string(),
                window_days,
                approx(amount),
                approx(amount_tolerance),
                description_contains,
            ],
            |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)),
        )
        .optional()?;
    Ok(row)
}
