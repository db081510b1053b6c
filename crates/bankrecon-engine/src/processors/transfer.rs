//! Internal-transfer processor.
//!
//! A transfer-out line produces TWO movement rows sharing one ledger
//! entry: the out-leg (manual expense on the source account) carries
//! exactly two TRANSFER-tagged lines (Dr destination bank, Cr source
//! bank); the in-leg (general income on the destination account)
//! carries none. `lines_per_movement = [2, 0]` is the shape the
//! executor depends on to avoid double-booking.

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use bankrecon_config::{AccountRegistry, BankAccount, CompanyConstants};
use bankrecon_core::{
    BankMovement, ExecutionPlan, LedgerKind, LedgerLine, MovementKind, MovementRow,
    DOC_TYPE_TRANSFER,
};

use crate::classify::Classifier;

pub const PLAN_KIND: &str = "TRANSFER";
pub const CLASS: &str = "OWN ACCOUNTS TRANSFER";
pub const REFERENCE: &str = "AUTO TRANSFER";

/// Build the plan for one day's transfer-out lines.
pub fn build_plan(
    movements: &[BankMovement],
    date: NaiveDate,
    classifier: &Classifier,
    registry: &AccountRegistry,
    constants: &CompanyConstants,
) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new(PLAN_KIND, format!("Transfers {date}"), date);

    if movements.is_empty() {
        plan.warn("No transfers for this day");
        return plan;
    }

    for movement in movements {
        let Some(raw_destination) = classifier.transfer_destination(&movement.description) else {
            plan.warn(format!(
                "Could not extract destination account from: {:.80}",
                movement.description
            ));
            continue;
        };
        let destination = registry.resolve(&raw_destination);

        let Some(source_account) = registry.by_number(&movement.account) else {
            plan.warn(format!("Source account {} not recognised", movement.account));
            continue;
        };
        let Some(destination_account) = registry.by_number(&destination) else {
            plan.warn(format!("Destination account {destination} not recognised"));
            continue;
        };

        push_transfer_legs(
            &mut plan,
            date,
            movement.amount(),
            source_account,
            destination_account,
            constants,
        );
    }

    let total: rust_decimal::Decimal = movements.iter().map(|m| m.amount()).sum();
    plan.validate_note(format!(
        "Transfer total for the day: {total:.2} ({} transfers)",
        movements.len()
    ));

    plan
}

/// Transfer between a bank account and the petty-cash pseudo-account.
/// `from_petty_cash` selects which side is the source: true moves petty
/// cash into the bank account (card leftovers), false drains the bank
/// account into petty cash.
pub fn build_petty_cash_plan(
    movement: &BankMovement,
    date: NaiveDate,
    from_petty_cash: bool,
    registry: &AccountRegistry,
    constants: &CompanyConstants,
) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new(PLAN_KIND, format!("Petty-cash transfer {date}"), date);

    let Some(bank_account) = registry.by_number(&movement.account) else {
        plan.warn(format!("Account {} not recognised", movement.account));
        return plan;
    };
    let petty = registry.petty_cash();

    let (source, destination) = if from_petty_cash {
        (petty, bank_account)
    } else {
        (bank_account, petty)
    };

    push_transfer_legs(&mut plan, date, movement.amount(), source, destination, constants);
    // Only the statement-visible leg reconciles; the petty-cash leg
    // never appears on a statement.
    if let [out_leg, in_leg] = &mut plan.movements[..] {
        out_leg.reconciled = !from_petty_cash;
        in_leg.reconciled = from_petty_cash;
    }

    plan
}

fn push_transfer_legs(
    plan: &mut ExecutionPlan,
    date: NaiveDate,
    amount: rust_decimal::Decimal,
    source: &BankAccount,
    destination: &BankAccount,
    constants: &CompanyConstants,
) {
    let (year, month, day) = MovementRow::date_fields(date);

    let out_description = format!(
        "TRANSFER TO BANK: {} ACCOUNT: {} CURRENCY: {}",
        destination.bank, destination.number, constants.currency
    );
    let in_description = format!(
        "TRANSFER FROM BANK: {} ACCOUNT: {} CURRENCY: {}",
        source.bank, source.number, constants.currency
    );

    plan.movements.push(MovementRow {
        bank: source.bank.clone(),
        account: source.number.clone(),
        year,
        month,
        day,
        kind: MovementKind::ManualExpense,
        outflow: amount,
        description: out_description,
        class: CLASS.to_string(),
        expense_kind: "INTERBANK".to_string(),
        ledger_kind: LedgerKind::Journal,
        fx_rate_dof: Some(dec!(20.0000)),
        reference: Some(REFERENCE.to_string()),
        ..MovementRow::default()
    });
    plan.movements.push(MovementRow {
        bank: destination.bank.clone(),
        account: destination.number.clone(),
        year,
        month,
        day,
        kind: MovementKind::GeneralIncome,
        inflow: amount,
        description: in_description,
        class: CLASS.to_string(),
        expense_kind: "INTERBANK".to_string(),
        ledger_kind: LedgerKind::Journal,
        reference: Some(REFERENCE.to_string()),
        ..MovementRow::default()
    });

    // Short account forms keep the narrative inside varchar(60).
    let source_short: String = source.number.chars().take(6).collect();
    let destination_short: String = destination.number.chars().take(6).collect();
    let debit_narrative = format!(
        "TRANSFER from {}-{} to {}-{}",
        source.bank, source_short, destination.bank, destination_short
    );
    let credit_narrative = format!("TRANSFER from bank: {}", source.bank);

    plan.ledger_lines.extend([
        LedgerLine::debit(1, destination.ledger_pair(), amount, debit_narrative)
            .with_doc_type(DOC_TYPE_TRANSFER),
        LedgerLine::credit(2, source.ledger_pair(), amount, credit_narrative)
            .with_doc_type(DOC_TYPE_TRANSFER),
    ]);

    // The whole entry rides on the out-leg.
    plan.invoices_per_movement.extend([0, 0]);
    plan.lines_per_movement.extend([2, 0]);
}
