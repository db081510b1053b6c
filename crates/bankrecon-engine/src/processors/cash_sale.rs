//! Cash-sale processor.
//!
//! Each cash deposit becomes one sale-income movement on the cash
//! account carrying ALL of the close's invoices: the individual
//! invoices first, then the global invoice applied to the remainder
//! `deposit - sum(individuals)`. The ledger entry is variable: one bank
//! debit plus a 1-5 line block per linked invoice (customers credit,
//! VAT pair when nonzero, excise pair when nonzero).

use chrono::NaiveDate;
use rust_decimal::Decimal;

use bankrecon_config::{AccountRegistry, LedgerAccounts};
use bankrecon_core::{
    BankMovement, DailyClose, ExecutionPlan, InvoiceLinkKind, InvoiceLinkRow, LedgerKind,
    LedgerLine, MovementKind, MovementRow,
};
use bankrecon_db::Database;

use super::card_sale::{invoice_tax_breakdown, CLASS, LINK_SERIES};

pub const PLAN_KIND: &str = "CASH_SALE";

/// Build the plan for one day's cash deposits against one daily close.
pub fn build_plan(
    movements: &[BankMovement],
    date: NaiveDate,
    close: Option<&DailyClose>,
    db: Option<&Database>,
    registry: &AccountRegistry,
) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new(PLAN_KIND, format!("Cash sales {date}"), date);

    if movements.is_empty() {
        plan.warn("No cash deposits for this day");
        return plan;
    }
    let Some(close) = close else {
        plan.warn("No treasury close for the sales day; cannot determine invoices");
        return plan;
    };
    let Some(global_number) = close.global_invoice_number.clone() else {
        plan.warn("Treasury close has no global invoice");
        return plan;
    };
    let global_amount = close.global_invoice_amount.unwrap_or(Decimal::ZERO);

    let cash = registry.cash();
    let (year, month, day) = MovementRow::date_fields(date);
    let description = format!("DAILY SALE {}", close.close_date.format("%d/%m/%Y"));

    for movement in movements {
        let deposit = movement.amount();
        let individual_sum = close.individual_total();
        let mut global_applied = deposit - individual_sum;
        if global_applied < Decimal::ZERO {
            plan.warn(format!(
                "Individual invoices ({individual_sum:.2}) exceed the deposit ({deposit:.2})"
            ));
            global_applied = Decimal::ZERO;
        }

        plan.movements.push(MovementRow {
            bank: cash.bank.clone(),
            account: cash.number.clone(),
            year,
            month,
            day,
            kind: MovementKind::SaleIncome,
            inflow: deposit,
            description: description.clone(),
            class: CLASS.to_string(),
            payment_method: Some("Cash".to_string()),
            ledger_kind: LedgerKind::Income,
            invoice_ref: Some(format!("D-{global_number}")),
            ..MovementRow::default()
        });

        // Individual invoices first, global last.
        for invoice in &close.invoices {
            plan.invoice_links.push(InvoiceLinkRow {
                series: LINK_SERIES.to_string(),
                number: invoice.number.clone(),
                applied: invoice.amount,
                invoice_date: close.close_date,
                kind: InvoiceLinkKind::Individual,
                invoice_total: invoice.amount,
                invoice_balance: Decimal::ZERO,
            });
        }
        plan.invoice_links.push(InvoiceLinkRow {
            series: LINK_SERIES.to_string(),
            number: global_number.clone(),
            applied: global_applied,
            invoice_date: close.close_date,
            kind: InvoiceLinkKind::Global,
            invoice_total: global_amount,
            invoice_balance: Decimal::ZERO,
        });

        let lines = entry_lines(
            deposit,
            close,
            global_applied,
            &global_number,
            cash.ledger_pair(),
            db,
            &mut plan,
        );
        let line_count = lines.len();
        plan.ledger_lines.extend(lines);

        plan.invoices_per_movement.push(close.invoices.len() + 1);
        plan.lines_per_movement.push(line_count);
    }

    let deposit_sum: Decimal = movements.iter().map(|m| m.amount()).sum();
    plan.validate_note(format!("Cash deposit sum: {deposit_sum:.2}"));
    if let Some(total_cash) = close.total_cash {
        plan.validate_note(format!("Treasury cash total: {total_cash:.2}"));
    }
    plan.validate_note(format!(
        "Invoices: {} individual + 1 global",
        close.invoices.len()
    ));

    plan
}

/// Bank debit plus a block per invoice (individual then global).
fn entry_lines(
    deposit: Decimal,
    close: &DailyClose,
    global_applied: Decimal,
    global_number: &str,
    bank_account: (&str, &str),
    db: Option<&Database>,
    plan: &mut ExecutionPlan,
) -> Vec<LedgerLine> {
    let mut lines = Vec::new();
    let mut position = 1u32;

    lines.push(LedgerLine::debit(
        position,
        bank_account,
        deposit,
        format!("Bank deposit GlobalInv: FD-{global_number} FolioI: {{folio}}"),
    ));
    position += 1;

    for invoice in &close.invoices {
        let (vat, excise) = invoice_tax_breakdown(db, &invoice.number, plan);
        let block = invoice_block(
            position,
            invoice.amount,
            vat,
            excise,
            &invoice.number,
            InvoiceLinkKind::Individual,
        );
        position += block.len() as u32;
        lines.extend(block);
    }

    let (vat, excise) = invoice_tax_breakdown(db, global_number, plan);
    lines.extend(invoice_block(
        position,
        global_applied,
        vat,
        excise,
        global_number,
        InvoiceLinkKind::Global,
    ));

    lines
}

/// 1-5 lines for one linked invoice: customers credit, then the VAT and
/// excise reclassification pairs when nonzero.
fn invoice_block(
    start: u32,
    applied: Decimal,
    vat: Decimal,
    excise: Decimal,
    number: &str,
    kind: InvoiceLinkKind,
) -> Vec<LedgerLine> {
    let label = match kind {
        InvoiceLinkKind::Global => "GlobalInv",
        InvoiceLinkKind::Individual => "Inv",
    };
    let base = format!("Class:{CLASS} {label}: FD-{number}");
    let mut lines = Vec::new();
    let mut position = start;

    lines.push(LedgerLine::credit(
        position,
        LedgerAccounts::CUSTOMERS_GLOBAL,
        applied,
        format!("{base} Col."),
    ));
    position += 1;

    if vat > Decimal::ZERO {
        lines.push(LedgerLine::credit(
            position,
            LedgerAccounts::VAT_COLLECTED,
            vat,
            format!("{base} Vat."),
        ));
        position += 1;
        lines.push(LedgerLine::debit(
            position,
            LedgerAccounts::VAT_PENDING_COLLECTION,
            vat,
            format!("{base} Vat."),
        ));
        position += 1;
    }

    if excise > Decimal::ZERO {
        lines.push(LedgerLine::credit(
            position,
            LedgerAccounts::EXCISE_COLLECTED,
            excise,
            format!("{base} Exc."),
        ));
        position += 1;
        lines.push(LedgerLine::debit(
            position,
            LedgerAccounts::EXCISE_PENDING_COLLECTION,
            excise,
            format!("{base} Exc."),
        ));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankrecon_core::{ProcessKind, SaleInvoice};
    use rust_decimal_macros::dec;

    fn cash_deposit(amount: Decimal) -> BankMovement {
        BankMovement {
            date: NaiveDate::from_ymd_opt(2026, 2, 6).unwrap(),
            description: "CASH DEPOSIT".to_string(),
            debit: None,
            credit: Some(amount),
            account: "055003730017".to_string(),
            sheet: "CASH".to_string(),
            kind: Some(ProcessKind::CashSale),
        }
    }

    fn close_with_individuals() -> DailyClose {
        DailyClose {
            close_date: NaiveDate::from_ymd_opt(2026, 2, 5).unwrap(),
            sheet: "05".to_string(),
            invoices: vec![
                SaleInvoice {
                    series: "FD".to_string(),
                    number: "20190".to_string(),
                    amount: dec!(1200.00),
                },
                SaleInvoice {
                    series: "FD".to_string(),
                    number: "20191".to_string(),
                    amount: dec!(800.00),
                },
            ],
            global_invoice_number: Some("20195".to_string()),
            global_invoice_amount: Some(dec!(50000.00)),
            total_sales: None,
            total_cash: Some(dec!(42000.00)),
            total_card: None,
            total_other: None,
            treasury_folio: None,
        }
    }

    #[test]
    fn test_links_individuals_then_global_remainder() {
        let registry = AccountRegistry::default();
        let date = NaiveDate::from_ymd_opt(2026, 2, 6).unwrap();
        let deposits = [cash_deposit(dec!(42000.00))];
        let plan = build_plan(&deposits, date, Some(&close_with_individuals()), None, &registry);

        assert_eq!(plan.movements.len(), 1);
        assert_eq!(plan.invoice_links.len(), 3);
        assert_eq!(plan.invoices_per_movement, vec![3]);

        assert_eq!(plan.invoice_links[0].kind, InvoiceLinkKind::Individual);
        assert_eq!(plan.invoice_links[1].kind, InvoiceLinkKind::Individual);
        let global = &plan.invoice_links[2];
        assert_eq!(global.kind, InvoiceLinkKind::Global);
        assert_eq!(global.applied, dec!(40000.00));

        // Applied amounts sum to the movement amount.
        let applied: Decimal = plan.invoice_links.iter().map(|l| l.applied).sum();
        assert_eq!(applied, plan.movements[0].inflow);

        // Without a database: 1 bank line + 3 customer credits.
        assert_eq!(plan.lines_per_movement, vec![4]);
        assert!(plan.unbalanced_slices().is_empty());
        assert_eq!(plan.movements[0].payment_method.as_deref(), Some("Cash"));
    }

    #[test]
    fn test_negative_remainder_caps_at_zero_with_warning() {
        let registry = AccountRegistry::default();
        let date = NaiveDate::from_ymd_opt(2026, 2, 6).unwrap();
        let deposits = [cash_deposit(dec!(1500.00))];
        let plan = build_plan(&deposits, date, Some(&close_with_individuals()), None, &registry);

        let global = plan.invoice_links.last().unwrap();
        assert_eq!(global.applied, dec!(0));
        assert!(plan
            .warnings
            .iter()
            .any(|w| w.contains("exceed the deposit")));
    }

    #[test]
    fn test_empty_movements_single_warning() {
        let registry = AccountRegistry::default();
        let date = NaiveDate::from_ymd_opt(2026, 2, 6).unwrap();
        let plan = build_plan(&[], date, Some(&close_with_individuals()), None, &registry);
        assert!(plan.is_empty());
        assert_eq!(plan.warnings.len(), 1);
    }
}
