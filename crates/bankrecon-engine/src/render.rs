//! Human-readable plan rendering for dry-run output.

use std::fmt::Write as _;

use bankrecon_core::ExecutionPlan;

const SHOWN_LINES: usize = 8;
const SHOWN_INVOICES: usize = 15;

/// Render a plan the way the CLI prints it in dry-run mode.
pub fn render_plan(plan: &ExecutionPlan) -> String {
    let mut out = String::new();
    let rule = "─".repeat(60);

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "PLAN: {}", plan.description);
    let _ = writeln!(out, "Date: {}", plan.date);
    let _ = writeln!(
        out,
        "Inserts: {} | Updates: {}",
        plan.insert_count(),
        plan.update_count()
    );
    let _ = writeln!(out, "{rule}");

    if !plan.warnings.is_empty() {
        let _ = writeln!(out, "\n  WARNINGS:");
        for warning in &plan.warnings {
            let _ = writeln!(out, "    ! {warning}");
        }
    }
    if !plan.validations.is_empty() {
        let _ = writeln!(out, "\n  VALIDATIONS:");
        for validation in &plan.validations {
            let _ = writeln!(out, "    + {validation}");
        }
    }

    if !plan.movements.is_empty() {
        let _ = writeln!(out, "\n  MovHeader ({} movements):", plan.movements.len());
        for (i, movement) in plan.movements.iter().enumerate() {
            let sign = if movement.is_inflow() { '+' } else { '-' };
            let _ = writeln!(
                out,
                "    {}. kind={} | {} | {}{:.2} | '{}'",
                i + 1,
                movement.kind.code(),
                movement.payment_method.as_deref().unwrap_or("-"),
                sign,
                movement.amount(),
                movement.description
            );
        }
    }

    if !plan.invoice_links.is_empty() {
        let _ = writeln!(out, "\n  MovInvoices ({} links):", plan.invoice_links.len());
        for (i, link) in plan.invoice_links.iter().take(SHOWN_INVOICES).enumerate() {
            let _ = writeln!(
                out,
                "    {}. {}-{} ({}) | applied={:.2} | total={:.2}",
                i + 1,
                link.series,
                link.number,
                link.kind.as_str(),
                link.applied,
                link.invoice_total
            );
        }
        if plan.invoice_links.len() > SHOWN_INVOICES {
            let _ = writeln!(
                out,
                "    ... and {} more",
                plan.invoice_links.len() - SHOWN_INVOICES
            );
        }
    }

    if !plan.ap_invoices.is_empty() {
        let _ = writeln!(out, "\n  APInvoice ({}):", plan.ap_invoices.len());
        for (i, invoice) in plan.ap_invoices.iter().enumerate() {
            let _ = writeln!(
                out,
                "    {}. supplier={} | ref={} | {:.2} + VAT {:.2} = {:.2}",
                i + 1,
                invoice.supplier,
                invoice.reference,
                invoice.subtotal,
                invoice.vat,
                invoice.total
            );
        }
    }

    if !plan.reconciliations.is_empty() {
        let _ = writeln!(out, "\n  RECONCILIATIONS ({}):", plan.reconciliations.len());
        for reconciliation in &plan.reconciliations {
            let _ = writeln!(
                out,
                "    UPDATE MovHeader SET reconciled=1 WHERE folio={}",
                reconciliation.folio
            );
            let _ = writeln!(out, "      {}", reconciliation.note);
        }
    }

    if !plan.ledger_lines.is_empty() {
        let _ = writeln!(out, "\n  LedgerEntry ({} lines):", plan.ledger_lines.len());
        for line in plan.ledger_lines.iter().take(SHOWN_LINES) {
            let side = match line.side {
                bankrecon_core::EntrySide::Debit => "DR",
                bankrecon_core::EntrySide::Credit => "CR",
            };
            let tag = if line.doc_type == "CHECKS" {
                String::new()
            } else {
                format!(" [{}]", line.doc_type)
            };
            let _ = writeln!(
                out,
                "    Pos {}: {side} {:>12.2} -> {}/{}{tag} | {:.50}",
                line.position,
                line.amount(),
                line.account,
                line.sub_account,
                line.narrative
            );
        }
        if plan.ledger_lines.len() > SHOWN_LINES {
            let _ = writeln!(
                out,
                "    ... and {} more lines",
                plan.ledger_lines.len() - SHOWN_LINES
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankrecon_core::{LedgerLine, MovementRow};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_render_mentions_sections() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        let mut plan = ExecutionPlan::new("TEST", "render test", date);
        plan.movements.push(MovementRow {
            inflow: dec!(100),
            description: "DAILY SALE".to_string(),
            ..MovementRow::default()
        });
        plan.lines_per_movement.push(2);
        plan.invoices_per_movement.push(0);
        plan.ledger_lines.extend([
            LedgerLine::debit(1, ("1120", "040000"), dec!(100), "a"),
            LedgerLine::credit(2, ("1210", "010000"), dec!(100), "b"),
        ]);
        plan.warn("something soft");

        let text = render_plan(&plan);
        assert!(text.contains("PLAN: render test"));
        assert!(text.contains("MovHeader (1 movements)"));
        assert!(text.contains("LedgerEntry (2 lines)"));
        assert!(text.contains("WARNINGS"));
        assert!(text.contains("+100.00"));
    }
}
