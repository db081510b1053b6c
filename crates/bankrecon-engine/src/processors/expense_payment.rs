//! Expense-account payment processor.
//!
//! Card payments drawn from the expense account do NOT pre-exist in the
//! movement table. Each statement debit is matched against pending AP
//! invoices by total (±$0.50); on a hit the plan carries the movement,
//! a 2- or 4-line entry (the VAT reclassification pair only when the
//! invoice has VAT), and the invoice match the executor uses to write
//! the AP payment, its link, and the balance/status update. Amounts
//! that only match an already-paid invoice are reported as settled.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use bankrecon_config::{AccountRegistry, LedgerAccounts, Tolerances};
use bankrecon_core::{
    AlreadySettled, BankMovement, Counterparty, ExecutionPlan, LedgerKind, LedgerLine,
    MovementKind, MovementRow,
};
use bankrecon_db::{ap, Database};

pub const PLAN_KIND: &str = "EXPENSE_PAYMENT";
pub const CLASS: &str = "SUPPLIER PAYMENTS";
const DESCRIPTION: &str = "PURCHASE INVOICE PAYMENT";

/// Build the plan for one day's expense-account debits. `date` is the
/// statement date of the lines (yesterday under the delayed-effect
/// rule).
pub fn build_plan(
    movements: &[BankMovement],
    date: NaiveDate,
    db: Option<&Database>,
    registry: &AccountRegistry,
    tolerances: &Tolerances,
) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new(PLAN_KIND, format!("Expense-account payments {date}"), date);

    if movements.is_empty() {
        plan.warn("No expense-account payments for this day");
        return plan;
    }
    let Some(db) = db else {
        plan.warn("No database connection: cannot look up purchase invoices");
        return plan;
    };

    let expense = registry.expense();
    let (year, month, day) = MovementRow::date_fields(date);

    for movement in movements {
        let amount = movement.amount();

        let invoice = match ap::find_unpaid_ap_invoice(db.conn(), amount, tolerances.fuzzy) {
            Ok(Some(invoice)) => invoice,
            Ok(None) => {
                // Idempotency: the invoice may already be settled.
                match ap::find_paid_ap_invoice(db.conn(), amount, tolerances.fuzzy) {
                    Ok(Some((series, number, total, name))) => {
                        plan.already_settled.push(AlreadySettled {
                            folio: 0,
                            note: format!("Already paid: {series}-{number} {total:.2} ({name:.30})"),
                        });
                        plan.validate_note(format!(
                            "Already paid: {amount:.2} -> {series}-{number}"
                        ));
                    }
                    Ok(None) => {
                        plan.warn(format!(
                            "No purchase invoice for debit {amount:.2} on {date} ({:.50})",
                            movement.description
                        ));
                    }
                    Err(e) => plan.warn(format!("Paid-invoice lookup failed: {e}")),
                }
                continue;
            }
            Err(e) => {
                plan.warn(format!("Invoice lookup failed: {e}"));
                continue;
            }
        };

        plan.movements.push(MovementRow {
            bank: expense.bank.clone(),
            account: expense.number.clone(),
            year,
            month,
            day,
            kind: MovementKind::InvoicedExpense,
            outflow: amount,
            description: DESCRIPTION.to_string(),
            class: CLASS.to_string(),
            expense_kind: "CARD".to_string(),
            ledger_kind: LedgerKind::Expense,
            counterparty: Some(Counterparty {
                code: invoice.supplier.clone(),
                name: invoice.supplier_name.clone(),
                kind: invoice.supplier_kind.clone(),
                tax_id: invoice.tax_id.clone(),
            }),
            ..MovementRow::default()
        });

        let lines = payment_entry(amount, invoice.vat, &invoice.supplier, &invoice.supplier_name, expense.ledger_pair());
        plan.invoices_per_movement.push(0);
        plan.lines_per_movement.push(lines.len());
        plan.ledger_lines.extend(lines);

        plan.validate_note(format!(
            "Match: {amount:.2} -> {}-{} ({} {:.30})",
            invoice.series, invoice.number, invoice.supplier, invoice.supplier_name
        ));
        plan.ap_payments.push(invoice);
    }

    plan.validate_note(format!(
        "Expense debits: {}, with invoice: {}",
        movements.len(),
        plan.movements.len()
    ));

    plan
}

/// Suppliers debit and bank credit always; the VAT reclassification
/// pair only when the invoice carries VAT.
fn payment_entry(
    amount: Decimal,
    vat: Decimal,
    supplier: &str,
    supplier_name: &str,
    bank_account: (&str, &str),
) -> Vec<LedgerLine> {
    let prefix = format!("Sup:{supplier} Name:{supplier_name:.10}");
    let mut lines = vec![LedgerLine::debit(
        1,
        LedgerAccounts::SUPPLIERS_GLOBAL,
        amount,
        format!("{prefix} Payment total: {{folio}}"),
    )];
    let mut position = 2;

    if vat > Decimal::ZERO {
        lines.push(LedgerLine::credit(
            position,
            LedgerAccounts::VAT_PENDING_PAYMENT,
            vat,
            format!("{prefix} VAT pending"),
        ));
        position += 1;
        lines.push(LedgerLine::debit(
            position,
            LedgerAccounts::VAT_PAID,
            vat,
            format!("{prefix} VAT paid"),
        ));
        position += 1;
    }

    lines.push(LedgerLine::credit(
        position,
        bank_account,
        amount,
        "Bank payment: {folio}",
    ));
    lines
}
