//! Supplier-payment reconciliation.
//!
//! These payments already exist in the movement table, captured by the
//! purchasing module. The processor only reconciles: it finds an
//! unreconciled invoiced-expense row with matching account, amount and
//! a +/-2 day window, and marks it reconciled. It never inserts.

use chrono::NaiveDate;

use bankrecon_config::Tolerances;
use bankrecon_core::{BankMovement, ExecutionPlan, Reconciliation};
use bankrecon_db::{movements as mov_gw, Database};

pub const PLAN_KIND: &str = "SUPPLIER_RECONCILE";
/// Movement kind the purchasing module captures payments under.
const CAPTURED_KIND: i64 = 3;

/// Build the reconciliation plan for one day's supplier-payment lines.
/// `date` is the statement date of the lines (the dispatcher passes
/// yesterday's lines under the delayed-effect rule).
pub fn build_plan(
    movements: &[BankMovement],
    date: NaiveDate,
    db: Option<&Database>,
    tolerances: &Tolerances,
) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new(PLAN_KIND, format!("Supplier reconciliation {date}"), date);

    if movements.is_empty() {
        plan.warn("No supplier payments for this day");
        return plan;
    }
    let Some(db) = db else {
        plan.warn("No database connection: cannot look up captured payments");
        return plan;
    };

    for movement in movements {
        let hit = mov_gw::find_unreconciled(
            db.conn(),
            &movement.account,
            CAPTURED_KIND,
            movement.is_credit(),
            movement.amount(),
            tolerances.exact,
            date,
            tolerances.supplier_window_days,
            None,
        );
        match hit {
            Ok(Some((folio, description))) => {
                plan.reconciliations.push(Reconciliation {
                    folio,
                    note: format!(
                        "Folio {folio}: {:.2} | {:.50}",
                        movement.amount(),
                        description
                    ),
                });
                plan.validate_note(format!(
                    "Match: wire {:.2} -> folio {folio} ({:.40})",
                    movement.amount(),
                    description
                ));
            }
            Ok(None) => {
                plan.warn(format!(
                    "No match for wire {:.2} on {date} ({:.50})",
                    movement.amount(),
                    movement.description
                ));
            }
            Err(e) => {
                plan.warn(format!("Lookup failed: {e}"));
            }
        }
    }

    plan.validate_note(format!(
        "Payments: {} on the statement, {} reconciled",
        movements.len(),
        plan.reconciliations.len()
    ));

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankrecon_config::CompanyConstants;
    use bankrecon_core::{LedgerKind, MovementKind, MovementRow, ProcessKind};
    use rust_decimal_macros::dec;

    fn statement_line(amount: rust_decimal::Decimal) -> BankMovement {
        BankMovement {
            date: NaiveDate::from_ymd_opt(2026, 2, 6).unwrap(),
            description: "ACME99 SUPPLIES OUTGOING WIRE 7162".to_string(),
            debit: Some(amount),
            credit: None,
            account: "055003730017".to_string(),
            sheet: "CASH".to_string(),
            kind: Some(ProcessKind::SupplierPayment),
        }
    }

    fn captured_payment(db: &Database, folio: i64, amount: rust_decimal::Decimal, day: u32) {
        let row = MovementRow {
            bank: "BANREGIO".to_string(),
            account: "055003730017".to_string(),
            year: 2026,
            month: 2,
            day,
            kind: MovementKind::InvoicedExpense,
            outflow: amount,
            description: "SUPPLIER PAYMENT CAPTURED MANUALLY".to_string(),
            class: "SUPPLIER PAYMENTS".to_string(),
            reconciled: false,
            ledger_kind: LedgerKind::Expense,
            ..MovementRow::default()
        };
        mov_gw::insert_movement(db.conn(), &row, folio, &CompanyConstants::default()).unwrap();
    }

    #[test]
    fn test_match_within_window() {
        let db = Database::open_in_memory().unwrap();
        captured_payment(&db, 301, dec!(8421.77), 5);
        let tolerances = Tolerances::default();
        let date = NaiveDate::from_ymd_opt(2026, 2, 6).unwrap();

        let plan = build_plan(&[statement_line(dec!(8421.77))], date, Some(&db), &tolerances);

        assert_eq!(plan.reconciliations.len(), 1);
        assert_eq!(plan.reconciliations[0].folio, 301);
        assert_eq!(plan.update_count(), 1);
        assert_eq!(plan.insert_count(), 0);
    }

    #[test]
    fn test_no_match_warns() {
        let db = Database::open_in_memory().unwrap();
        let tolerances = Tolerances::default();
        let date = NaiveDate::from_ymd_opt(2026, 2, 6).unwrap();

        let plan = build_plan(&[statement_line(dec!(999.00))], date, Some(&db), &tolerances);
        assert!(plan.reconciliations.is_empty());
        assert!(plan.warnings.iter().any(|w| w.contains("No match")));
    }
}
