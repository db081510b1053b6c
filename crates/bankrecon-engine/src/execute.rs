//! Plan executor.
//!
//! One database transaction per plan. Inside it, per movement: resolve
//! idempotency (existing reconciled row → skip; existing unreconciled →
//! mark reconciled and collect its folio), otherwise mint a folio and
//! write in strict dependency order: movement header, invoice links,
//! AP invoice, ledger lines, then the movement's ledger pointer.
//! Violating that order would expose foreign-key windows to concurrent
//! readers. Any error rolls the whole plan back.

use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::{info, info_span, warn};

use bankrecon_config::CompanyConstants;
use bankrecon_core::{ExecutionOutcome, ExecutionPlan, Folio};
use bankrecon_db::{ap, ar, ledger, links, movements, sequences, Database, DbResult};

/// Executes plans against one long-lived database handle.
pub struct Executor<'a> {
    db: &'a mut Database,
    constants: &'a CompanyConstants,
}

impl<'a> Executor<'a> {
    pub fn new(db: &'a mut Database, constants: &'a CompanyConstants) -> Self {
        Self { db, constants }
    }

    /// Execute a full plan (inserts plus trailing reconciliations).
    pub fn run_plan(&mut self, plan: &ExecutionPlan) -> ExecutionOutcome {
        self.run(plan, false)
    }

    /// Execute an expense-payment plan: a full plan whose movements
    /// additionally write the AP payment, its link, and the invoice
    /// balance/status update.
    pub fn run_expense_payment(&mut self, plan: &ExecutionPlan) -> ExecutionOutcome {
        self.run(plan, true)
    }

    /// Execute a pure-reconciliation plan (updates only, batched).
    pub fn run_reconciliations(&mut self, plan: &ExecutionPlan) -> ExecutionOutcome {
        let span = info_span!("reconcile", kind = %plan.kind, count = plan.reconciliations.len());
        let _guard = span.enter();

        let result = (|| -> DbResult<()> {
            let tx = self.db.transaction()?;
            for reconciliation in &plan.reconciliations {
                movements::mark_reconciled(&tx, reconciliation.folio)?;
            }
            tx.commit()?;
            Ok(())
        })();

        match result {
            Ok(()) => ExecutionOutcome {
                success: true,
                kind: plan.kind.clone(),
                description: plan.description.clone(),
                folios: plan.reconciliations.iter().map(|r| r.folio).collect(),
                ..ExecutionOutcome::default()
            },
            Err(e) => {
                warn!(error = %e, "reconciliation batch rolled back");
                ExecutionOutcome::failure(&plan.kind, &plan.description, e.to_string())
            }
        }
    }

    fn run(&mut self, plan: &ExecutionPlan, with_ap_payment: bool) -> ExecutionOutcome {
        let span = info_span!("execute", kind = %plan.kind, movements = plan.movements.len());
        let _guard = span.enter();

        // A plan that does not balance must never commit.
        let unbalanced = plan.unbalanced_slices();
        if !unbalanced.is_empty() {
            return ExecutionOutcome::failure(
                &plan.kind,
                &plan.description,
                format!("unbalanced ledger entry: {}", unbalanced.join("; ")),
            );
        }

        let mut outcome = ExecutionOutcome {
            success: true,
            kind: plan.kind.clone(),
            description: plan.description.clone(),
            ..ExecutionOutcome::default()
        };

        let constants = self.constants;
        let result = (|| -> DbResult<()> {
            let tx = self.db.transaction()?;
            let mut invoice_cursor = 0usize;
            let mut line_cursor = 0usize;
            let mut ap_cursor = 0usize;

            for (i, movement) in plan.movements.iter().enumerate() {
                let n_invoices = plan.invoices_for(i);
                let n_lines = plan.lines_for(i);

                match movements::find_existing_movement(
                    &tx,
                    &movement.bank,
                    &movement.account,
                    movement.year,
                    movement.month,
                    movement.day,
                    &movement.description,
                    movement.amount(),
                    movement.is_inflow(),
                )? {
                    Some((folio, true)) => {
                        info!(folio, "movement already registered and reconciled; skipped");
                        outcome.skipped_existing += 1;
                        invoice_cursor += n_invoices;
                        line_cursor += n_lines;
                        if ap_cursor < plan.ap_invoices.len() {
                            ap_cursor += 1;
                        }
                        continue;
                    }
                    Some((folio, false)) => {
                        movements::mark_reconciled(&tx, folio)?;
                        info!(folio, "existing movement reconciled instead of inserted");
                        outcome.reconciled_existing += 1;
                        outcome.folios.push(folio);
                        invoice_cursor += n_invoices;
                        line_cursor += n_lines;
                        if ap_cursor < plan.ap_invoices.len() {
                            ap_cursor += 1;
                        }
                        continue;
                    }
                    None => {}
                }

                let folio = sequences::next_folio(&tx)?;
                movements::insert_movement(&tx, movement, folio, constants)?;

                for _ in 0..n_invoices {
                    if let Some(link) = plan.invoice_links.get(invoice_cursor) {
                        links::insert_invoice_link(&tx, link, movement, folio, constants)?;
                        invoice_cursor += 1;
                    }
                }

                if let Some(invoice) = plan.ap_invoices.get(ap_cursor) {
                    ap::insert_ap_invoice(&tx, invoice, constants)?;
                    ap_cursor += 1;
                }

                if with_ap_payment {
                    if let Some(ap_match) = plan.ap_payments.get(i) {
                        Self::settle_invoice(&tx, ap_match, movement, folio, constants)?;
                    }
                }

                if let Some(collection) = plan.collections.get(i) {
                    ar::insert_collection(&tx, collection, constants)?;
                    ar::apply_collection(
                        &tx,
                        &collection.series,
                        collection.invoice_number,
                        collection.amount,
                    )?;
                }

                if n_lines > 0 {
                    let slice_start = line_cursor.min(plan.ledger_lines.len());
                    let slice_end = (line_cursor + n_lines).min(plan.ledger_lines.len());
                    let lines = &plan.ledger_lines[slice_start..slice_end];
                    line_cursor += n_lines;
                    if !lines.is_empty() {
                        let ledger_number = sequences::next_ledger_number(&tx, &constants.source)?;
                        let doc_date = movement_date(movement, plan.date);
                        ledger::insert_ledger_entry(
                            &tx,
                            ledger_number,
                            lines,
                            folio,
                            doc_date,
                            movement.ledger_kind,
                            constants,
                        )?;
                        movements::set_ledger_number(&tx, folio, ledger_number)?;
                        outcome.ledger_number = Some(ledger_number);
                    }
                }

                outcome.folios.push(folio);
                info!(
                    movement = i + 1,
                    total = plan.movements.len(),
                    folio,
                    amount = %format!("{:.2}", movement.amount()),
                    "movement written"
                );
            }

            for reconciliation in &plan.reconciliations {
                movements::mark_reconciled(&tx, reconciliation.folio)?;
            }

            tx.commit()?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                if outcome.skipped_existing > 0 {
                    info!(
                        skipped = outcome.skipped_existing,
                        "movements already existed and were skipped"
                    );
                }
                outcome
            }
            Err(e) => {
                warn!(error = %e, "plan rolled back");
                ExecutionOutcome::failure(&plan.kind, &plan.description, e.to_string())
            }
        }
    }

    /// AP payment + link + invoice balance update for one settled
    /// movement.
    fn settle_invoice(
        tx: &Connection,
        ap_match: &bankrecon_core::APInvoiceMatch,
        movement: &bankrecon_core::MovementRow,
        folio: Folio,
        constants: &CompanyConstants,
    ) -> DbResult<()> {
        let amount = movement.amount();
        let date = movement_date(movement, NaiveDate::MIN);
        let payment =
            ap::insert_ap_payment(tx, ap_match, amount, date, movement, folio, "CARD", constants)?;
        ap::insert_ap_payment_link(tx, ap_match, payment, amount, movement, folio, constants)?;
        ap::settle_ap_invoice(tx, &ap_match.series, ap_match.number, amount)?;
        Ok(())
    }
}

fn movement_date(movement: &bankrecon_core::MovementRow, fallback: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(movement.year, movement.month, movement.day).unwrap_or(fallback)
}
