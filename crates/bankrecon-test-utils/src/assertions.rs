//! Assertions shared by the test suites.

use rust_decimal::Decimal;

use bankrecon_core::ExecutionPlan;
use bankrecon_db::Database;

/// Assert every movement slice of the plan balances to the cent.
pub fn assert_plan_balanced(plan: &ExecutionPlan) {
    let problems = plan.unbalanced_slices();
    assert!(
        problems.is_empty(),
        "plan '{}' has unbalanced entries: {:?}",
        plan.description,
        problems
    );
}

/// Assert a committed ledger entry balances in the database.
pub fn assert_entry_balanced(db: &Database, ledger_number: i64) {
    let (debits, credits): (f64, f64) = db
        .conn()
        .query_row(
            "SELECT SUM(CAST(debit AS REAL)), SUM(CAST(credit AS REAL))
             FROM LedgerEntry WHERE ledger_number = ?1",
            [ledger_number],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .expect("entry exists");
    assert!(
        (debits - credits).abs() < 0.005,
        "entry {ledger_number} unbalanced: {debits} vs {credits}"
    );
}

/// Count rows in a table.
pub fn row_count(db: &Database, table: &str) -> i64 {
    db.conn()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        .expect("count query")
}

/// Sum of applied invoice-link amounts under one folio.
pub fn applied_sum(db: &Database, folio: i64) -> Decimal {
    let text: String = db
        .conn()
        .query_row(
            "SELECT printf('%.2f', IFNULL(SUM(CAST(applied AS REAL)), 0))
             FROM MovInvoices WHERE folio = ?1",
            [folio],
            |r| r.get(0),
        )
        .expect("applied sum query");
    text.parse().unwrap_or_default()
}
