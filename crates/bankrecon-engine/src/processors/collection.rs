//! Customer-collection processor, two phases in one builder.
//!
//! Phase B (the collection already exists): an unreconciled
//! general-income row with class DEPOSITS and a CLIENT concept matching
//! the amount inside the window is marked reconciled.
//!
//! Phase A (it does not): the full collection is created: one income
//! movement, one AR collection row, the invoice balance update, and a
//! six-line entry. The invoice is found by the number parsed from the
//! statement description, falling back to an amount match against
//! pending invoices.

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

use bankrecon_config::{AccountRegistry, LedgerAccounts, Tolerances};
use bankrecon_core::{
    BankMovement, CollectionRow, ExecutionPlan, LedgerKind, LedgerLine, MovementKind, MovementRow,
    Reconciliation,
};
use bankrecon_db::{ar, movements as mov_gw, Database};

pub const PLAN_KIND: &str = "CUSTOMER_COLLECTION";
pub const CLASS: &str = "DEPOSITS";
/// Series customer invoices are issued under.
pub const INVOICE_SERIES: &str = "FC";
/// Movement kind of collections captured by the commercial module.
const CAPTURED_KIND: i64 = 1;
/// Days of slack for the amount-fallback invoice search.
const INVOICE_WINDOW_DAYS: i64 = 5;

/// Invoice number embedded in collection descriptions
/// ("... INV: FC-8551 ...").
fn invoice_number_pattern() -> Regex {
    Regex::new(r"(?i)INV:?\s*FC-?(\d+)").expect("invoice pattern compiles")
}

/// Build the plan for one day's customer-collection lines.
pub fn build_plan(
    movements: &[BankMovement],
    date: NaiveDate,
    db: Option<&Database>,
    registry: &AccountRegistry,
    tolerances: &Tolerances,
) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new(PLAN_KIND, format!("Customer collections {date}"), date);

    if movements.is_empty() {
        plan.warn("No customer collections for this day");
        return plan;
    }
    let Some(db) = db else {
        plan.warn("No database connection: cannot look up collections");
        return plan;
    };
    let pattern = invoice_number_pattern();

    for movement in movements {
        let amount = movement.amount();

        // Phase B: the commercial module already captured it.
        let existing = mov_gw::find_unreconciled(
            db.conn(),
            &movement.account,
            CAPTURED_KIND,
            true,
            amount,
            tolerances.exact,
            date,
            tolerances.supplier_window_days,
            Some("CLIENT"),
        );
        match existing {
            Ok(Some((folio, description))) => {
                plan.reconciliations.push(Reconciliation {
                    folio,
                    note: format!("Folio {folio}: {amount:.2} | {description:.50}"),
                });
                plan.validate_note(format!(
                    "Match: collection {amount:.2} -> folio {folio} ({description:.40})"
                ));
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                plan.warn(format!("Collection lookup failed: {e}"));
                continue;
            }
        }

        // Phase A: create the collection in full.
        let invoice = match find_invoice(db, movement, date, &pattern, tolerances, &mut plan) {
            Some(invoice) => invoice,
            None => {
                plan.warn(format!(
                    "No invoice for collection {amount:.2} ({:.50})",
                    movement.description
                ));
                continue;
            }
        };
        if invoice.balance <= Decimal::ZERO {
            plan.validate_note(format!(
                "Invoice {}-{} already settled; nothing to create",
                invoice.series, invoice.number
            ));
            continue;
        }

        push_collection(&mut plan, movement, date, &invoice, registry);
    }

    plan
}

fn find_invoice(
    db: &Database,
    movement: &BankMovement,
    date: NaiveDate,
    pattern: &Regex,
    tolerances: &Tolerances,
    plan: &mut ExecutionPlan,
) -> Option<ar::ARInvoiceInfo> {
    if let Some(captures) = pattern.captures(&movement.description) {
        if let Ok(number) = captures[1].parse::<i64>() {
            match ar::find_ar_invoice(db.conn(), INVOICE_SERIES, number) {
                Ok(Some(invoice)) => return Some(invoice),
                Ok(None) => {
                    plan.warn(format!("Invoice {INVOICE_SERIES}-{number} not on file"));
                }
                Err(e) => plan.warn(format!("Invoice lookup failed: {e}")),
            }
        }
    }
    // Amount fallback against pending invoices near the date.
    ar::find_ar_invoice_by_amount(
        db.conn(),
        INVOICE_SERIES,
        movement.amount(),
        tolerances.exact,
        date,
        INVOICE_WINDOW_DAYS,
    )
    .ok()
    .flatten()
}

fn push_collection(
    plan: &mut ExecutionPlan,
    movement: &BankMovement,
    date: NaiveDate,
    invoice: &ar::ARInvoiceInfo,
    registry: &AccountRegistry,
) {
    let amount = movement.amount();
    let account = registry
        .by_number(&movement.account)
        .unwrap_or_else(|| registry.cash());
    let (year, month, day) = MovementRow::date_fields(date);
    let description = format!(
        "CLIENT: {}-{:.20} INV: {}-{}",
        invoice.customer, invoice.customer_name, invoice.series, invoice.number
    );

    plan.movements.push(MovementRow {
        bank: account.bank.clone(),
        account: account.number.clone(),
        year,
        month,
        day,
        kind: MovementKind::GeneralIncome,
        inflow: amount,
        description: description.clone(),
        class: CLASS.to_string(),
        ledger_kind: LedgerKind::Income,
        invoice_ref: Some(format!("{}-{}", invoice.series, invoice.number)),
        ..MovementRow::default()
    });

    plan.collections.push(CollectionRow {
        series: invoice.series.clone(),
        invoice_number: invoice.number,
        customer: invoice.customer.clone(),
        customer_name: invoice.customer_name.clone(),
        amount,
        vat: invoice.vat,
        excise: invoice.excise,
        subtotal_zero: Decimal::ZERO,
        subtotal_sixteen: if invoice.vat > Decimal::ZERO {
            invoice.subtotal
        } else {
            Decimal::ZERO
        },
        invoice_date: invoice.date,
        collection_date: date,
        bank: account.bank.clone(),
        account: account.number.clone(),
        salesperson: invoice.salesperson.clone(),
    });

    plan.ledger_lines
        .extend(collection_entry(amount, invoice, account.ledger_pair()));
    plan.invoices_per_movement.push(0);
    plan.lines_per_movement.push(6);

    plan.validate_note(format!(
        "Collection created: {}-{} {amount:.2}",
        invoice.series, invoice.number
    ));
}

/// Six lines mirroring the sale template: bank debit, customers credit,
/// and the VAT/excise reclassification pairs (zero legs kept so the
/// entry shape stays fixed).
fn collection_entry(
    amount: Decimal,
    invoice: &ar::ARInvoiceInfo,
    bank_account: (&str, &str),
) -> Vec<LedgerLine> {
    let label = format!("Inv: {}-{}", invoice.series, invoice.number);
    vec![
        LedgerLine::debit(1, bank_account, amount, format!("Bank collection {label} FolioI: {{folio}}")),
        LedgerLine::credit(2, LedgerAccounts::CUSTOMERS_GLOBAL, amount, format!("Class:{CLASS} Col.{label}")),
        LedgerLine::credit(3, LedgerAccounts::VAT_COLLECTED, invoice.vat, format!("Class:{CLASS} Vat.{label}")),
        LedgerLine::debit(4, LedgerAccounts::VAT_PENDING_COLLECTION, invoice.vat, format!("Class:{CLASS} Vat.{label}")),
        LedgerLine::credit(5, LedgerAccounts::EXCISE_COLLECTED, invoice.excise, format!("Class:{CLASS} Exc.{label}")),
        LedgerLine::debit(6, LedgerAccounts::EXCISE_PENDING_COLLECTION, invoice.excise, format!("Class:{CLASS} Exc.{label}")),
    ]
}
