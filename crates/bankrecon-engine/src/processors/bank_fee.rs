//! Bank-fee processor.
//!
//! All four fee kinds of one day collapse, per bank account, into a
//! single invoiced-expense movement plus a fabricated purchase invoice
//! for the bank provider. The VAT is recomputed as 16 % of the
//! aggregated base, never summed from the bank's per-line VAT rows:
//! that is how the general ledger books it, and it avoids cent-level
//! drift between the two.
//!
//! Four ledger lines per group: Dr suppliers (total), Cr VAT pending
//! payment (VAT), Dr VAT paid (VAT), Cr bank account (total).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use bankrecon_config::{AccountRegistry, FeeProvider, LedgerAccounts};
use bankrecon_core::{
    APInvoiceRow, BankMovement, Counterparty, ExecutionPlan, LedgerKind, LedgerLine, MovementKind,
    MovementRow,
};

pub const PLAN_KIND: &str = "BANK_FEES";
pub const CLASS: &str = "BANK FEES";

/// Build the plan for one day's fee lines (bases and VAT lines mixed).
pub fn build_plan(
    movements: &[BankMovement],
    date: NaiveDate,
    registry: &AccountRegistry,
    provider: &FeeProvider,
) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new(PLAN_KIND, format!("Bank fees {date}"), date);

    if movements.is_empty() {
        plan.warn("No bank fees for this day");
        return plan;
    }

    let mut by_account: BTreeMap<&str, Vec<&BankMovement>> = BTreeMap::new();
    for movement in movements {
        by_account.entry(&movement.account).or_default().push(movement);
    }

    for (account_number, fees) in by_account {
        let (subtotal, vat) = aggregate(&fees, provider.vat_rate);
        let total = subtotal + vat;
        if total <= Decimal::ZERO {
            continue;
        }

        let Some(account) = registry.by_number(account_number) else {
            plan.warn(format!("Account {account_number} not recognised for fees"));
            continue;
        };

        let description = format!("BANK FEES {}", date.format("%d/%m/%Y"));
        let invoice_ref = date.format("%d%m%Y").to_string();
        let (year, month, day) = MovementRow::date_fields(date);

        plan.movements.push(MovementRow {
            bank: account.bank.clone(),
            account: account.number.clone(),
            year,
            month,
            day,
            kind: MovementKind::InvoicedExpense,
            outflow: total,
            description: description.clone(),
            class: CLASS.to_string(),
            expense_kind: "TRANSFER".to_string(),
            ledger_kind: LedgerKind::Expense,
            counterparty: Some(Counterparty {
                code: provider.supplier.clone(),
                name: provider.supplier_name.clone(),
                kind: "NA".to_string(),
                tax_id: provider.supplier_tax_id.clone(),
            }),
            ..MovementRow::default()
        });

        plan.ap_invoices.push(APInvoiceRow {
            supplier: provider.supplier.clone(),
            supplier_name: provider.supplier_name.clone(),
            reference: invoice_ref,
            date,
            subtotal,
            vat,
            total,
            product: provider.product.clone(),
            product_name: provider.product_name.clone(),
            supplier_tax_id: provider.supplier_tax_id.clone(),
        });

        plan.ledger_lines
            .extend(fee_entry_lines(total, vat, account.ledger_pair(), provider));
        plan.invoices_per_movement.push(0);
        plan.lines_per_movement.push(4);
    }

    let total_fees: Decimal = movements.iter().map(|m| m.amount()).sum();
    let bases = movements
        .iter()
        .filter(|m| m.kind_or_unknown().is_fee_base())
        .count();
    let vats = movements.len() - bases;
    plan.validate_note(format!(
        "Fee total for the day: {total_fees:.2} ({bases} base + {vats} VAT lines)"
    ));

    plan
}

/// Sum the base lines and recompute VAT over the aggregate.
fn aggregate(fees: &[&BankMovement], vat_rate: Decimal) -> (Decimal, Decimal) {
    let subtotal: Decimal = fees
        .iter()
        .filter(|m| m.kind_or_unknown().is_fee_base())
        .map(|m| m.amount())
        .sum();
    let subtotal = subtotal.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let vat = (subtotal * vat_rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    (subtotal, vat)
}

fn fee_entry_lines(
    total: Decimal,
    vat: Decimal,
    bank_account: (&str, &str),
    provider: &FeeProvider,
) -> Vec<LedgerLine> {
    let prefix = format!(
        "Sup:{} Name:{:.10}",
        provider.supplier, provider.supplier_name
    );
    vec![
        LedgerLine::debit(
            1,
            LedgerAccounts::SUPPLIERS_GLOBAL,
            total,
            format!("{prefix} Payment total: {{folio}}"),
        ),
        LedgerLine::credit(
            2,
            LedgerAccounts::VAT_PENDING_PAYMENT,
            vat,
            format!("{prefix} VAT pending"),
        ),
        LedgerLine::debit(3, LedgerAccounts::VAT_PAID, vat, format!("{prefix} VAT paid")),
        LedgerLine::credit(4, bank_account, total, "Bank fees payment: {folio}"),
    ]
}
