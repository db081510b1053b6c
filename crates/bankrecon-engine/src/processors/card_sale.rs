//! Card-sale processor.
//!
//! Each card deposit becomes one sale-income movement on the card
//! account, linked to the daily close's GLOBAL invoice only (card sales
//! never link individual invoices), with the fixed six-line ledger
//! template:
//!
//! 1. Dr card bank account (deposit)
//! 2. Cr customers-global (deposit)
//! 3. Cr VAT collected (VAT of the global invoice)
//! 4. Dr VAT pending collection (same)
//! 5. Cr excise collected (excise of the global invoice)
//! 6. Dr excise pending collection (same)
//!
//! The movement narrative uses the close date, not the deposit date:
//! the deposit settles the prior sales day.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use bankrecon_config::{AccountRegistry, LedgerAccounts};
use bankrecon_core::{
    DailyClose, ExecutionPlan, InvoiceLinkKind, InvoiceLinkRow, LedgerKind, LedgerLine,
    MovementKind, MovementRow, ProcessKind,
};
use bankrecon_db::{queries, Database};

pub const PLAN_KIND: &str = "CARD_SALE";
pub const CLASS: &str = "DAILY_SALE";
/// Series on invoice links.
pub const LINK_SERIES: &str = "FD";
/// Series the invoice table stores the same documents under.
pub const INVOICE_SERIES: &str = "D";

/// VAT and excise of an invoice, zero (with a warning on the plan) when
/// the database is unavailable or the number does not parse.
pub(crate) fn invoice_tax_breakdown(
    db: Option<&Database>,
    number: &str,
    plan: &mut ExecutionPlan,
) -> (Decimal, Decimal) {
    let Some(db) = db else {
        plan.warn("No database connection: VAT/excise booked as zero");
        return (Decimal::ZERO, Decimal::ZERO);
    };
    let Ok(number) = number.parse::<i64>() else {
        plan.warn(format!("Invoice number '{number}' is not numeric"));
        return (Decimal::ZERO, Decimal::ZERO);
    };
    match queries::invoice_vat_and_excise(db.conn(), INVOICE_SERIES, number) {
        Ok(pair) => pair,
        Err(e) => {
            plan.warn(format!("Tax breakdown lookup failed: {e}"));
            (Decimal::ZERO, Decimal::ZERO)
        }
    }
}

/// Build the plan for one day's card deposits against one daily close.
pub fn build_plan(
    movements: &[bankrecon_core::BankMovement],
    date: NaiveDate,
    close: Option<&DailyClose>,
    db: Option<&Database>,
    registry: &AccountRegistry,
) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new(PLAN_KIND, format!("Card sales {date}"), date);

    if movements.is_empty() {
        plan.warn("No card deposits for this day");
        return plan;
    }

    let Some(close) = close else {
        plan.warn("No treasury close for the sales day; cannot determine the global invoice");
        return plan;
    };
    let Some(global_number) = close.global_invoice_number.clone() else {
        plan.warn("Treasury close has no global invoice");
        return plan;
    };
    let global_amount = close.global_invoice_amount.unwrap_or(Decimal::ZERO);

    let (vat, excise) = invoice_tax_breakdown(db, &global_number, &mut plan);

    let card = registry.card();
    let (year, month, day) = MovementRow::date_fields(date);
    let description = format!("DAILY SALE {}", close.close_date.format("%d/%m/%Y"));

    for movement in movements {
        let amount = movement.amount();
        let payment_method = match movement.kind_or_unknown() {
            ProcessKind::CardCreditSale => "CreditCard",
            _ => "DebitCard",
        };

        plan.movements.push(MovementRow {
            bank: card.bank.clone(),
            account: card.number.clone(),
            year,
            month,
            day,
            kind: MovementKind::SaleIncome,
            inflow: amount,
            description: description.clone(),
            class: CLASS.to_string(),
            payment_method: Some(payment_method.to_string()),
            ledger_kind: LedgerKind::Income,
            invoice_ref: Some(format!("D-{global_number}")),
            ..MovementRow::default()
        });

        plan.invoice_links.push(InvoiceLinkRow {
            series: LINK_SERIES.to_string(),
            number: global_number.clone(),
            applied: amount,
            invoice_date: close.close_date,
            kind: InvoiceLinkKind::Global,
            invoice_total: global_amount,
            invoice_balance: Decimal::ZERO,
        });

        plan.ledger_lines
            .extend(sale_entry_lines(amount, vat, excise, &global_number, card.ledger_pair()));

        plan.invoices_per_movement.push(1);
        plan.lines_per_movement.push(6);
    }

    let deposit_sum: Decimal = movements.iter().map(|m| m.amount()).sum();
    plan.validate_note(format!("Card deposit sum for the day: {deposit_sum:.2}"));
    if let Some(total_card) = close.total_card {
        plan.validate_note(format!("Treasury card total: {total_card:.2}"));
    }

    plan
}

/// The fixed six-line template for one card deposit.
fn sale_entry_lines(
    amount: Decimal,
    vat: Decimal,
    excise: Decimal,
    global_number: &str,
    bank_account: (&str, &str),
) -> Vec<LedgerLine> {
    let bank_narrative =
        format!("Bank deposit GlobalInv: FD-{global_number} FolioI: {{folio}}");
    let customers_narrative = format!("Class:{CLASS} Col.GlobalInv: FD-{global_number}");
    let vat_narrative = format!("Class:{CLASS} Vat.GlobalInv: FD-{global_number}");
    let excise_narrative = format!("Class:{CLASS} Exc.GlobalInv: FD-{global_number}");

    vec![
        LedgerLine::debit(1, bank_account, amount, bank_narrative),
        LedgerLine::credit(2, LedgerAccounts::CUSTOMERS_GLOBAL, amount, customers_narrative),
        LedgerLine::credit(3, LedgerAccounts::VAT_COLLECTED, vat, vat_narrative.clone()),
        LedgerLine::debit(4, LedgerAccounts::VAT_PENDING_COLLECTION, vat, vat_narrative),
        LedgerLine::credit(5, LedgerAccounts::EXCISE_COLLECTED, excise, excise_narrative.clone()),
        LedgerLine::debit(6, LedgerAccounts::EXCISE_PENDING_COLLECTION, excise, excise_narrative),
    ]
}
