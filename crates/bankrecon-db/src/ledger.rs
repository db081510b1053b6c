//! Operations on the ledger table (`LedgerEntry`).

use chrono::{Local, NaiveDate};
use rusqlite::{params, Connection};
use tracing::debug;

use bankrecon_config::{CompanyConstants, LedgerAccounts};
use bankrecon_core::{Folio, LedgerKind, LedgerLine, LedgerNumber};

use crate::error::DbResult;
use crate::value::{money, rate};

/// Insert all lines of one balanced ledger entry under an
/// already-minted ledger number. The `{folio}` placeholder in
/// narratives is resolved here, once the folio is known.
#[allow(clippy::too_many_arguments)]
pub fn insert_ledger_entry(
    conn: &Connection,
    ledger_number: LedgerNumber,
    lines: &[LedgerLine],
    source_folio: Folio,
    doc_date: NaiveDate,
    ledger_kind: LedgerKind,
    constants: &CompanyConstants,
) -> DbResult<()> {
    let now = Local::now().naive_local();
    let folio_text = source_folio.to_string();

    for line in lines {
        let narrative = line.narrative.replace("{folio}", &folio_text);
        let name = LedgerAccounts::display_name(&line.account, &line.sub_account);
        conn.execute(
            "INSERT INTO LedgerEntry (
                co, source, ledger_number, position, office, account_office,
                account, sub_account, name, side, debit, credit,
                narrative, source_folio, ledger_kind, doc_type,
                doc_date, entry_date, entry_hour, created_by, branch, fx, money_kind
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                      ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
            params![
                constants.company,
                constants.source,
                ledger_number,
                line.position,
                constants.office,
                constants.account_office,
                line.account,
                line.sub_account,
                name,
                line.side.code(),
                money(line.debit),
                money(line.credit),
                truncate_narrative(&narrative),
                source_folio,
                ledger_kind.as_str(),
                line.doc_type,
                doc_date.format("%Y-%m-%d").to_string(),
                now.format("%Y-%m-%d").to_string(),
                now.format("%H:%M:%S").to_string(),
                constants.operator,
                constants.branch,
                rate(constants.fx_rate),
                constants.currency,
            ],
        )?;
    }

    debug!(
        ledger_number,
        lines = lines.len(),
        source_folio,
        kind = ledger_kind.as_str(),
        "ledger entry inserted"
    );
    Ok(())
}

/// The narrative column is varchar(60) in the legacy schema.
fn truncate_narrative(narrative: &str) -> String {
    narrative.chars().take(60).collect()
}
