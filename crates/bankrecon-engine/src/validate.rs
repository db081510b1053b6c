//! Cross-source consistency checks. These produce warning strings, not
//! failures: a discrepancy is surfaced but never stops processing.

use rust_decimal::Decimal;

use bankrecon_core::{BankMovement, DailyClose, ExecutionPlan};

/// Compare the day's card-deposit sum against the treasury card total.
pub fn validate_card_sales(
    movements: &[BankMovement],
    close: Option<&DailyClose>,
    tolerance: Decimal,
) -> Vec<String> {
    validate_against_total(
        movements,
        close,
        tolerance,
        "card",
        |c| c.total_card,
    )
}

/// Compare the day's cash-deposit sum against the treasury cash total.
pub fn validate_cash_sales(
    movements: &[BankMovement],
    close: Option<&DailyClose>,
    tolerance: Decimal,
) -> Vec<String> {
    validate_against_total(
        movements,
        close,
        tolerance,
        "cash",
        |c| c.total_cash,
    )
}

fn validate_against_total(
    movements: &[BankMovement],
    close: Option<&DailyClose>,
    tolerance: Decimal,
    label: &str,
    total_of: impl Fn(&DailyClose) -> Option<Decimal>,
) -> Vec<String> {
    let mut problems = Vec::new();
    if movements.is_empty() {
        return problems;
    }

    let statement_sum: Decimal = movements.iter().map(|m| m.amount()).sum();

    let Some(close) = close else {
        problems.push(format!(
            "No treasury data to validate against; statement sum: {statement_sum:.2}"
        ));
        return problems;
    };
    let Some(total) = total_of(close) else {
        problems.push(format!("Treasury close has no {label} total for the day"));
        return problems;
    };

    let difference = (statement_sum - total).abs();
    if difference > tolerance {
        problems.push(format!(
            "{} DISCREPANCY: statement={statement_sum:.2}, treasury={total:.2}, \
             difference={difference:.2} (tolerance={tolerance:.2})",
            label.to_uppercase()
        ));
    }
    problems
}

/// Per-slice balance check, promoted from warning to hard stop by the
/// executor in commit mode.
pub fn validate_balanced(plan: &ExecutionPlan) -> Vec<String> {
    plan.unbalanced_slices()
}
