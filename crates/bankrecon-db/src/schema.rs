//! Schema DDL for the legacy ERP tables the engine touches.
//!
//! Column names follow the abstract schema; the movement table's primary
//! key is `folio`, but idempotency lookups use the natural key
//! (bank, account, year, month, day, description, amount-on-side).

use rusqlite::Connection;

use crate::error::DbResult;

const SCHEMA: &str = "
PRAGMA journal_mode=WAL;

CREATE TABLE IF NOT EXISTS MovHeader (
    folio             INTEGER PRIMARY KEY,
    bank              TEXT NOT NULL,
    account           TEXT NOT NULL,
    year              INTEGER NOT NULL,
    month             INTEGER NOT NULL,
    day               INTEGER NOT NULL,
    kind              INTEGER NOT NULL,
    inflow            TEXT NOT NULL DEFAULT '0.00',
    outflow           TEXT NOT NULL DEFAULT '0.00',
    description       TEXT NOT NULL,
    class             TEXT NOT NULL DEFAULT '',
    payment_method    TEXT,
    sub_kind          TEXT NOT NULL DEFAULT 'NA',
    reconciled        INTEGER NOT NULL DEFAULT 0,
    fx                TEXT NOT NULL DEFAULT '1.0000',
    fx_dof            TEXT,
    money_kind        TEXT NOT NULL DEFAULT 'MXN',
    co                TEXT NOT NULL,
    source            TEXT NOT NULL,
    office            TEXT NOT NULL,
    account_office    TEXT NOT NULL,
    ledger_kind       TEXT NOT NULL,
    ledger_number     INTEGER NOT NULL DEFAULT 0,
    created_by        TEXT NOT NULL,
    branch            INTEGER NOT NULL,
    balance           TEXT NOT NULL DEFAULT '0.00',
    created_at        TEXT NOT NULL,
    created_hour      TEXT NOT NULL,
    invoice_ref       TEXT,
    reference         TEXT,
    check_number      TEXT,
    counterparty      TEXT,
    counterparty_name TEXT,
    counterparty_kind TEXT,
    counterparty_tax  TEXT
);

CREATE INDEX IF NOT EXISTS idx_movheader_natural
    ON MovHeader (bank, account, year, month, day);

CREATE TABLE IF NOT EXISTS MovInvoices (
    bank           TEXT NOT NULL,
    account        TEXT NOT NULL,
    year           INTEGER NOT NULL,
    month          INTEGER NOT NULL,
    folio          INTEGER NOT NULL,
    day            INTEGER NOT NULL,
    branch         INTEGER NOT NULL,
    series         TEXT NOT NULL,
    number         TEXT NOT NULL,
    applied        TEXT NOT NULL,
    invoice_date   TEXT NOT NULL,
    kind           TEXT NOT NULL,
    invoice_total  TEXT NOT NULL DEFAULT '0.00',
    invoice_balance TEXT NOT NULL DEFAULT '0.00',
    created_at     TEXT NOT NULL,
    after_deposit  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS LedgerEntry (
    co             TEXT NOT NULL,
    source         TEXT NOT NULL,
    ledger_number  INTEGER NOT NULL,
    position       INTEGER NOT NULL,
    office         TEXT NOT NULL,
    account_office TEXT NOT NULL,
    account        TEXT NOT NULL,
    sub_account    TEXT NOT NULL,
    name           TEXT NOT NULL DEFAULT '',
    side           INTEGER NOT NULL,
    debit          TEXT NOT NULL DEFAULT '0.00',
    credit         TEXT NOT NULL DEFAULT '0.00',
    narrative      TEXT NOT NULL,
    source_folio   INTEGER NOT NULL,
    ledger_kind    TEXT NOT NULL,
    doc_type       TEXT NOT NULL DEFAULT 'CHECKS',
    doc_date       TEXT NOT NULL,
    entry_date     TEXT NOT NULL,
    entry_hour     TEXT NOT NULL,
    created_by     TEXT NOT NULL,
    branch         INTEGER NOT NULL,
    fx             TEXT NOT NULL DEFAULT '1.0000',
    money_kind     TEXT NOT NULL DEFAULT 'MXN'
);

CREATE INDEX IF NOT EXISTS idx_ledger_source
    ON LedgerEntry (source, ledger_number);

CREATE TABLE IF NOT EXISTS APInvoice (
    series         TEXT NOT NULL,
    number         INTEGER NOT NULL,
    supplier       TEXT NOT NULL,
    supplier_name  TEXT NOT NULL,
    date           TEXT NOT NULL,
    subtotal       TEXT NOT NULL,
    vat            TEXT NOT NULL,
    total          TEXT NOT NULL,
    balance        TEXT NOT NULL,
    invoice_ref    TEXT NOT NULL,
    status         TEXT NOT NULL,
    buyer          TEXT NOT NULL,
    item_count     INTEGER NOT NULL DEFAULT 1,
    line_count     INTEGER NOT NULL DEFAULT 1,
    fx             TEXT NOT NULL DEFAULT '1.0000',
    money_kind     TEXT NOT NULL DEFAULT 'MXN',
    payment_method TEXT NOT NULL DEFAULT 'PUE',
    branch         INTEGER NOT NULL,
    tax_id         TEXT NOT NULL DEFAULT '',
    receipt_kind   TEXT NOT NULL DEFAULT '',
    supplier_kind  TEXT NOT NULL DEFAULT 'NA',
    reference      TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (series, number)
);

CREATE TABLE IF NOT EXISTS APInvoiceLine (
    series       TEXT NOT NULL,
    number       INTEGER NOT NULL,
    position     INTEGER NOT NULL,
    product      TEXT NOT NULL,
    product_name TEXT NOT NULL,
    supplier     TEXT NOT NULL,
    quantity     TEXT NOT NULL DEFAULT '1.0000',
    unit_cost    TEXT NOT NULL,
    taxed_cost   TEXT NOT NULL,
    vat_rate     TEXT NOT NULL,
    unit         TEXT NOT NULL DEFAULT 'PCE'
);

CREATE TABLE IF NOT EXISTS APPayment (
    series         TEXT NOT NULL,
    number         INTEGER NOT NULL,
    payment        INTEGER NOT NULL,
    supplier       TEXT NOT NULL,
    supplier_name  TEXT NOT NULL,
    date           TEXT NOT NULL,
    amount         TEXT NOT NULL,
    money_kind     TEXT NOT NULL DEFAULT 'MXN',
    method         TEXT NOT NULL,
    bank           TEXT NOT NULL,
    reference      TEXT NOT NULL,
    status         TEXT NOT NULL,
    buyer          TEXT NOT NULL,
    invoice_date   TEXT NOT NULL,
    fx             TEXT NOT NULL DEFAULT '1.0000',
    created_by     TEXT NOT NULL,
    kind           TEXT NOT NULL DEFAULT 'PAYMENT',
    invoice_ref    TEXT NOT NULL,
    payment_request INTEGER NOT NULL DEFAULT 1,
    receipt_kind   TEXT NOT NULL DEFAULT '',
    supplier_kind  TEXT NOT NULL DEFAULT 'NA',
    payment_method TEXT NOT NULL DEFAULT 'PUE'
);

CREATE TABLE IF NOT EXISTS APPaymentLink (
    bank           TEXT NOT NULL,
    account        TEXT NOT NULL,
    year           INTEGER NOT NULL,
    month          INTEGER NOT NULL,
    folio          INTEGER NOT NULL,
    series         TEXT NOT NULL,
    number         INTEGER NOT NULL,
    payment        INTEGER NOT NULL,
    invoice_date   TEXT NOT NULL,
    settled        INTEGER NOT NULL DEFAULT 1,
    invoice_total  TEXT NOT NULL,
    paid           TEXT NOT NULL,
    invoice_ref    TEXT NOT NULL,
    vat            TEXT NOT NULL DEFAULT '0.00',
    vat_rate       TEXT NOT NULL DEFAULT '16.00',
    branch         INTEGER NOT NULL,
    paid_base      TEXT NOT NULL DEFAULT '0.00',
    paid_vat       TEXT NOT NULL DEFAULT '0.00',
    payment_method TEXT NOT NULL DEFAULT 'PUE',
    receipt_kind   TEXT NOT NULL DEFAULT '',
    tax_id         TEXT NOT NULL DEFAULT '',
    supplier       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ARInvoice (
    series        TEXT NOT NULL,
    number        INTEGER NOT NULL,
    customer      TEXT NOT NULL,
    customer_name TEXT NOT NULL DEFAULT '',
    total         TEXT NOT NULL,
    balance       TEXT NOT NULL,
    subtotal      TEXT NOT NULL,
    vat           TEXT NOT NULL DEFAULT '0.00',
    excise        TEXT NOT NULL DEFAULT '0.00',
    status        TEXT NOT NULL,
    salesperson   TEXT NOT NULL DEFAULT '',
    date          TEXT NOT NULL,
    PRIMARY KEY (series, number)
);

CREATE TABLE IF NOT EXISTS ARCollection (
    series           TEXT NOT NULL,
    number           INTEGER NOT NULL,
    collection       INTEGER NOT NULL,
    collection_group INTEGER NOT NULL,
    customer         TEXT NOT NULL,
    customer_name    TEXT NOT NULL DEFAULT '',
    date             TEXT NOT NULL,
    amount           TEXT NOT NULL,
    money_kind       TEXT NOT NULL DEFAULT 'MXN',
    method           TEXT NOT NULL,
    bank             TEXT NOT NULL,
    account          TEXT NOT NULL,
    reference        TEXT NOT NULL DEFAULT '',
    status           TEXT NOT NULL,
    salesperson      TEXT NOT NULL DEFAULT '',
    invoice_date     TEXT NOT NULL,
    fx               TEXT NOT NULL DEFAULT '1.0000',
    created_by       TEXT NOT NULL,
    kind             TEXT NOT NULL DEFAULT 'COLLECTION',
    deposit_bank     TEXT NOT NULL,
    branch           INTEGER NOT NULL,
    installment      INTEGER NOT NULL DEFAULT 1,
    previous_balance TEXT NOT NULL DEFAULT '0.00',
    pending_balance  TEXT NOT NULL DEFAULT '0.00',
    vat              TEXT NOT NULL DEFAULT '0.00',
    excise           TEXT NOT NULL DEFAULT '0.00',
    subtotal_zero    TEXT NOT NULL DEFAULT '0.00',
    subtotal_sixteen TEXT NOT NULL DEFAULT '0.00'
);

CREATE TABLE IF NOT EXISTS LedgerBalance (
    account     TEXT NOT NULL,
    sub_account TEXT NOT NULL,
    period_year INTEGER NOT NULL,
    jan_debits TEXT NOT NULL DEFAULT '0.00', jan_credits TEXT NOT NULL DEFAULT '0.00',
    feb_debits TEXT NOT NULL DEFAULT '0.00', feb_credits TEXT NOT NULL DEFAULT '0.00',
    mar_debits TEXT NOT NULL DEFAULT '0.00', mar_credits TEXT NOT NULL DEFAULT '0.00',
    apr_debits TEXT NOT NULL DEFAULT '0.00', apr_credits TEXT NOT NULL DEFAULT '0.00',
    may_debits TEXT NOT NULL DEFAULT '0.00', may_credits TEXT NOT NULL DEFAULT '0.00',
    jun_debits TEXT NOT NULL DEFAULT '0.00', jun_credits TEXT NOT NULL DEFAULT '0.00',
    jul_debits TEXT NOT NULL DEFAULT '0.00', jul_credits TEXT NOT NULL DEFAULT '0.00',
    aug_debits TEXT NOT NULL DEFAULT '0.00', aug_credits TEXT NOT NULL DEFAULT '0.00',
    sep_debits TEXT NOT NULL DEFAULT '0.00', sep_credits TEXT NOT NULL DEFAULT '0.00',
    oct_debits TEXT NOT NULL DEFAULT '0.00', oct_credits TEXT NOT NULL DEFAULT '0.00',
    nov_debits TEXT NOT NULL DEFAULT '0.00', nov_credits TEXT NOT NULL DEFAULT '0.00',
    dec_debits TEXT NOT NULL DEFAULT '0.00', dec_credits TEXT NOT NULL DEFAULT '0.00',
    PRIMARY KEY (account, sub_account, period_year)
);

CREATE TABLE IF NOT EXISTS MovPeriod (
    bank    TEXT NOT NULL,
    account TEXT NOT NULL,
    year    INTEGER NOT NULL,
    month   INTEGER NOT NULL,
    status  TEXT NOT NULL,
    PRIMARY KEY (bank, account, year, month)
);
";

/// Apply the schema (idempotent).
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_applies_twice() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM MovHeader", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
