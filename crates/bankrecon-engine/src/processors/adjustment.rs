//! Bank-adjustment builder.
//!
//! Card deposits that no treasury close accounts for are booked as
//! income pending an audit: one general-income movement with class
//! `BANK_ADJUSTMENT` and a two-line entry (Dr bank, Cr customer
//! creditors).

use chrono::NaiveDate;

use bankrecon_config::{AccountRegistry, LedgerAccounts};
use bankrecon_core::{
    BankMovement, ExecutionPlan, LedgerKind, LedgerLine, MovementKind, MovementRow,
};

pub const PLAN_KIND: &str = "BANK_ADJUSTMENT";
pub const CLASS: &str = "BANK_ADJUSTMENT";
const DESCRIPTION: &str = "INCOME ADJUSTMENT PENDING INVOICE";

/// Book one unassigned deposit as a bank adjustment.
pub fn build_plan(
    movement: &BankMovement,
    date: NaiveDate,
    registry: &AccountRegistry,
) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new(
        PLAN_KIND,
        format!("Bank adjustment for leftover deposit {date}"),
        date,
    );

    let Some(account) = registry.by_number(&movement.account) else {
        plan.warn(format!("Account {} not recognised", movement.account));
        return plan;
    };

    let amount = movement.amount();
    let (year, month, day) = MovementRow::date_fields(date);

    plan.movements.push(MovementRow {
        bank: account.bank.clone(),
        account: account.number.clone(),
        year,
        month,
        day,
        kind: MovementKind::GeneralIncome,
        inflow: amount,
        description: DESCRIPTION.to_string(),
        class: CLASS.to_string(),
        payment_method: Some("CreditCard".to_string()),
        ledger_kind: LedgerKind::Income,
        ..MovementRow::default()
    });

    plan.ledger_lines.extend([
        LedgerLine::debit(1, account.ledger_pair(), amount, DESCRIPTION),
        LedgerLine::credit(2, LedgerAccounts::CREDITORS_CUSTOMERS, amount, DESCRIPTION),
    ]);
    plan.invoices_per_movement.push(0);
    plan.lines_per_movement.push(2);

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankrecon_core::ProcessKind;
    use rust_decimal_macros::dec;

    #[test]
    fn test_adjustment_shape() {
        let registry = AccountRegistry::default();
        let date = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
        let movement = BankMovement {
            date,
            description: "DEBIT CARD SALES DEPOSIT".to_string(),
            debit: None,
            credit: Some(dec!(12345.67)),
            account: "038900320016".to_string(),
            sheet: "CARD".to_string(),
            kind: Some(ProcessKind::CardDebitSale),
        };

        let plan = build_plan(&movement, date, &registry);
        assert_eq!(plan.movements.len(), 1);
        assert_eq!(plan.movements[0].class, "BANK_ADJUSTMENT");
        assert_eq!(plan.lines_per_movement, vec![2]);
        assert_eq!(plan.invoices_per_movement, vec![0]);
        let creditors = &plan.ledger_lines[1];
        assert_eq!(
            (creditors.account.as_str(), creditors.sub_account.as_str()),
            ("2120", "070000")
        );
        assert!(plan.unbalanced_slices().is_empty());
    }
}
