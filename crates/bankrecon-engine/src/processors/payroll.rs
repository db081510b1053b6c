//! Payroll processor.
//!
//! Phase 1 (the statement's "PAYROLL DISPERSION" line): one manual
//! expense for the dispersion with the full payroll entry, which
//! provisions payroll payables for the secondary payments.
//!
//! Phase 2 (later "CHECK CASHED" lines): each is matched against the
//! payroll's unmatched secondary buckets within a cent tolerance and
//! cancels part of the provision with a two-line entry. No match means
//! the check is not ours.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use bankrecon_config::{AccountRegistry, LedgerAccounts};
use bankrecon_core::{
    BankMovement, ExecutionPlan, LedgerKind, LedgerLine, MovementKind, MovementRow, Payroll,
    PayrollBucketKind,
};

pub const PLAN_KIND: &str = "PAYROLL";
pub const CHECK_PLAN_KIND: &str = "PAYROLL_CHECK";
/// Cent tolerance when matching a cashed check to a bucket.
pub const MATCH_TOLERANCE: Decimal = rust_decimal_macros::dec!(0.50);

const MONTHS: [&str; 12] = [
    "JANUARY",
    "FEBRUARY",
    "MARCH",
    "APRIL",
    "MAY",
    "JUNE",
    "JULY",
    "AUGUST",
    "SEPTEMBER",
    "OCTOBER",
    "NOVEMBER",
    "DECEMBER",
];

/// Payroll narrative in the production pattern:
/// "PAYROLL W{nn}- {start:02}/{end:02} {MONTH}", where the covered week
/// ends three days before the payment date.
fn payroll_description(number: u32, date: NaiveDate) -> String {
    let end = (date.day() as i64 - 3).max(1) as u32;
    let start = end.saturating_sub(6).max(1);
    let month = MONTHS[(date.month() - 1) as usize];
    format!("PAYROLL W{number:02}- {start:02}/{end:02} {month}")
}

/// Build the dispersion plan.
pub fn build_plan(
    movements: &[BankMovement],
    date: NaiveDate,
    payroll: Option<&Payroll>,
    registry: &AccountRegistry,
) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new(PLAN_KIND, format!("Payroll {date}"), date);

    if movements.is_empty() {
        plan.warn("No payroll movements for this day");
        return plan;
    }
    let Some(payroll) = payroll else {
        plan.warn("No payroll workbook data; perceptions/deductions unavailable");
        return plan;
    };
    if payroll.dispersion_total <= Decimal::ZERO {
        plan.warn("Payroll has no dispersion amount");
        return plan;
    }

    let cash = registry.cash();
    let description = payroll_description(payroll.number, date);
    let (year, month, day) = MovementRow::date_fields(date);

    plan.movements.push(MovementRow {
        bank: cash.bank.clone(),
        account: cash.number.clone(),
        year,
        month,
        day,
        kind: MovementKind::ManualExpense,
        outflow: payroll.dispersion_total,
        description: description.clone(),
        class: "PAYROLL".to_string(),
        expense_kind: "TRANSFER".to_string(),
        ledger_kind: LedgerKind::Expense,
        ..MovementRow::default()
    });

    let lines = dispersion_entry(payroll, &description, cash.ledger_pair());
    plan.invoices_per_movement.push(0);
    plan.lines_per_movement.push(lines.len());
    plan.ledger_lines.extend(lines);

    // Cross-check the workbook total against the statement line.
    let bank_amount = movements[0].amount();
    let diff = (payroll.dispersion_total - bank_amount).abs();
    if diff > rust_decimal_macros::dec!(1.00) {
        plan.warn(format!(
            "Bank vs workbook difference: bank={bank_amount:.2}, workbook={:.2} (diff={diff:.2}). \
             Booked with the workbook amount.",
            payroll.dispersion_total
        ));
    }

    plan.validate_note(format!("Net payroll total: {:.2}", payroll.net_total()));
    if payroll.perceptions.is_empty() {
        plan.warn("No perception detail; the entry carries a generic salaries line");
    } else {
        plan.validate_note(format!(
            "Perceptions: {} concepts ({:.2})",
            payroll.perceptions.len(),
            payroll.perception_total()
        ));
    }
    if payroll.secondary_total() > Decimal::ZERO {
        plan.validate_note(format!(
            "Payables provision: {:.2} (pending check-cashed lines)",
            payroll.secondary_total()
        ));
    }

    plan
}

/// The dispersion entry: perception debits, deduction credits, a bank
/// credit for the dispersion and a payables credit provisioning the
/// secondaries. When the workbook's perceptions fall short of the
/// balancing total, a generic salaries debit closes the gap.
fn dispersion_entry(
    payroll: &Payroll,
    description: &str,
    bank_account: (&str, &str),
) -> Vec<LedgerLine> {
    let mut lines = Vec::new();
    let mut position = 1u32;

    let expected_perceptions =
        payroll.deduction_total() + payroll.dispersion_total + payroll.secondary_total();

    if payroll.perceptions.is_empty() {
        lines.push(LedgerLine::debit(
            position,
            LedgerAccounts::SALARIES_GENERIC,
            expected_perceptions,
            description,
        ));
        position += 1;
    } else {
        for perception in &payroll.perceptions {
            if perception.amount <= Decimal::ZERO {
                continue;
            }
            lines.push(LedgerLine::debit(
                position,
                (perception.account.as_str(), perception.sub_account.as_str()),
                perception.amount,
                description,
            ));
            position += 1;
        }
        let missing = expected_perceptions - payroll.perception_total();
        if missing > rust_decimal_macros::dec!(0.01) {
            lines.push(LedgerLine::debit(
                position,
                LedgerAccounts::SALARIES_GENERIC,
                missing,
                description,
            ));
            position += 1;
        }
    }

    for deduction in &payroll.deductions {
        if deduction.amount <= Decimal::ZERO {
            continue;
        }
        lines.push(LedgerLine::credit(
            position,
            (deduction.account.as_str(), deduction.sub_account.as_str()),
            deduction.amount,
            description,
        ));
        position += 1;
    }

    lines.push(LedgerLine::credit(
        position,
        bank_account,
        payroll.dispersion_total,
        description,
    ));
    position += 1;

    if payroll.secondary_total() > Decimal::ZERO {
        lines.push(LedgerLine::credit(
            position,
            LedgerAccounts::CREDITORS_PAYROLL,
            payroll.secondary_total(),
            description,
        ));
    }

    lines
}

/// Build a check-cashed plan, or None when no unmatched bucket fits the
/// bank amount (the check is not a payroll check).
pub fn build_check_plan(
    date: NaiveDate,
    payroll: &mut Payroll,
    bank_amount: Decimal,
    check_number: &str,
    registry: &AccountRegistry,
) -> Option<ExecutionPlan> {
    let bucket = payroll.match_secondary(bank_amount, MATCH_TOLERANCE)?;

    let cash = registry.cash();
    let description = payroll_description(payroll.number, date);
    let (year, month, day) = MovementRow::date_fields(date);

    let mut plan = ExecutionPlan::new(
        CHECK_PLAN_KIND,
        format!("Payroll check cashed {date} ({})", bucket.label()),
        date,
    );

    plan.movements.push(MovementRow {
        bank: cash.bank.clone(),
        account: cash.number.clone(),
        year,
        month,
        day,
        kind: MovementKind::ManualExpense,
        outflow: bank_amount,
        description: description.clone(),
        class: bucket.class().to_string(),
        expense_kind: "CHECK".to_string(),
        ledger_kind: LedgerKind::Expense,
        check_number: (!check_number.is_empty()).then(|| check_number.to_string()),
        ..MovementRow::default()
    });

    plan.ledger_lines.extend([
        LedgerLine::debit(1, LedgerAccounts::CREDITORS_PAYROLL, bank_amount, description.as_str()),
        LedgerLine::credit(2, cash.ledger_pair(), bank_amount, description.as_str()),
    ]);
    plan.invoices_per_movement.push(0);
    plan.lines_per_movement.push(2);

    plan.validate_note(format!(
        "Matched {} bucket against bank {bank_amount:.2} (check #{check_number})",
        bucket.label()
    ));

    Some(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankrecon_core::{PayrollItem, ProcessKind};
    use rust_decimal_macros::dec;

    fn payroll() -> Payroll {
        let mut p = Payroll {
            number: 8,
            dispersion_total: dec!(180000.00),
            checks_total: dec!(12500.00),
            vacations_total: dec!(3200.00),
            severance_total: Decimal::ZERO,
            perceptions: vec![
                PayrollItem {
                    concept: "Salaries".to_string(),
                    account: "6200".to_string(),
                    sub_account: "010000".to_string(),
                    amount: dec!(150000.00),
                },
                PayrollItem {
                    concept: "Seventh day".to_string(),
                    account: "6200".to_string(),
                    sub_account: "020000".to_string(),
                    amount: dec!(25000.00),
                },
                PayrollItem {
                    concept: "Sunday premium".to_string(),
                    account: "6200".to_string(),
                    sub_account: "030000".to_string(),
                    amount: dec!(30000.00),
                },
            ],
            deductions: vec![
                PayrollItem {
                    concept: "Income tax".to_string(),
                    account: "2140".to_string(),
                    sub_account: "020000".to_string(),
                    amount: dec!(12000.00),
                },
                PayrollItem {
                    concept: "Social security".to_string(),
                    account: "2140".to_string(),
                    sub_account: "010000".to_string(),
                    amount: dec!(6000.00),
                },
            ],
            buckets: vec![],
        };
        p.rebuild_buckets();
        p
    }

    fn dispersion_line() -> BankMovement {
        BankMovement {
            date: NaiveDate::from_ymd_opt(2026, 2, 23).unwrap(),
            description: "PAYROLL DISPERSION W08".to_string(),
            debit: Some(dec!(180000.00)),
            credit: None,
            account: "055003730017".to_string(),
            sheet: "CASH".to_string(),
            kind: Some(ProcessKind::Payroll),
        }
    }

    #[test]
    fn test_description_pattern() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 23).unwrap();
        assert_eq!(payroll_description(8, date), "PAYROLL W08- 14/20 FEBRUARY");
    }

    #[test]
    fn test_dispersion_entry_balances_with_gap_line() {
        let registry = AccountRegistry::default();
        let date = NaiveDate::from_ymd_opt(2026, 2, 23).unwrap();
        let p = payroll();

        let plan = build_plan(&[dispersion_line()], date, Some(&p), &registry);

        assert_eq!(plan.movements.len(), 1);
        assert_eq!(plan.movements[0].outflow, dec!(180000.00));

        // Perceptions (3) + gap line + deductions (2) + bank + payables.
        // Expected perceptions: 18000 + 180000 + 15700 = 213700;
        // workbook carries 205000 so an 8700 salaries debit closes it.
        assert_eq!(plan.ledger_lines.len(), 8);
        let gap = &plan.ledger_lines[3];
        assert_eq!(gap.debit, dec!(8700.00));
        assert_eq!(
            (gap.account.as_str(), gap.sub_account.as_str()),
            ("6200", "010000")
        );

        let payables = plan.ledger_lines.last().unwrap();
        assert_eq!(payables.credit, dec!(15700.00));
        assert_eq!(
            (payables.account.as_str(), payables.sub_account.as_str()),
            ("2120", "040000")
        );

        assert!(plan.unbalanced_slices().is_empty());
    }

    #[test]
    fn test_no_perceptions_generic_line() {
        let registry = AccountRegistry::default();
        let date = NaiveDate::from_ymd_opt(2026, 2, 23).unwrap();
        let mut p = payroll();
        p.perceptions.clear();

        let plan = build_plan(&[dispersion_line()], date, Some(&p), &registry);
        // Generic salaries + 2 deductions + bank + payables.
        assert_eq!(plan.ledger_lines.len(), 5);
        assert_eq!(plan.ledger_lines[0].debit, dec!(213700.00));
        assert!(plan.unbalanced_slices().is_empty());
        assert!(plan.warnings.iter().any(|w| w.contains("generic salaries")));
    }

    #[test]
    fn test_missing_workbook_warns() {
        let registry = AccountRegistry::default();
        let date = NaiveDate::from_ymd_opt(2026, 2, 23).unwrap();
        let plan = build_plan(&[dispersion_line()], date, None, &registry);
        assert!(plan.movements.is_empty());
        assert!(!plan.warnings.is_empty());
    }

    #[test]
    fn test_check_plan_matches_and_consumes_bucket() {
        let registry = AccountRegistry::default();
        let date = NaiveDate::from_ymd_opt(2026, 2, 25).unwrap();
        let mut p = payroll();

        let plan = build_check_plan(date, &mut p, dec!(12500.30), "1234", &registry)
            .expect("checks bucket matches within tolerance");
        assert_eq!(plan.movements[0].outflow, dec!(12500.30));
        assert_eq!(plan.movements[0].class, "PAYROLL");
        assert_eq!(plan.movements[0].check_number.as_deref(), Some("1234"));
        assert_eq!(plan.lines_per_movement, vec![2]);
        assert!(plan.unbalanced_slices().is_empty());

        // Bucket consumed: the same amount no longer matches.
        assert!(build_check_plan(date, &mut p, dec!(12500.30), "1235", &registry).is_none());
        // An unrelated amount never matches.
        assert!(build_check_plan(date, &mut p, dec!(999.99), "1236", &registry).is_none());
    }
}
