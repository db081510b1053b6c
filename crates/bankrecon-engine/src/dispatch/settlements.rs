//! Delayed-effect settlements: supplier-payment reconciliation,
//! expense-account payments and customer collections.
//!
//! Supplier and expense payments on day D are held and settled while
//! dispatching D+1 (users wait a day to guard against reversals), so
//! each handler first marks today's lines pending, then picks up
//! yesterday's lines from the statement map.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use tracing::info;

use bankrecon_core::{Action, BankMovement, LineResult, ProcessKind};

use super::{adjust_idempotency_note, Job, RunOptions};
use crate::processors::{collection, expense_payment, supplier_payment};

const PENDING_NOTE: &str = "Pending: settles on the next day's dispatch";

fn yesterday_lines(
    date: NaiveDate,
    by_date: &BTreeMap<NaiveDate, Vec<usize>>,
    movements: &[BankMovement],
    kind: ProcessKind,
) -> Vec<usize> {
    let yesterday = date - Duration::days(1);
    by_date
        .get(&yesterday)
        .map(|indices| {
            indices
                .iter()
                .copied()
                .filter(|&i| movements[i].kind_or_unknown() == kind)
                .collect()
        })
        .unwrap_or_default()
}

impl Job {
    pub(crate) fn handle_supplier_payments(
        &mut self,
        date: NaiveDate,
        today: &[usize],
        movements: &[BankMovement],
        by_date: &BTreeMap<NaiveDate, Vec<usize>>,
        options: &RunOptions,
        results: &mut [LineResult],
    ) {
        for &i in today {
            results[i].action = Action::NotProcessed;
            results[i].note = PENDING_NOTE.to_string();
        }

        let held = yesterday_lines(date, by_date, movements, ProcessKind::SupplierPayment);
        if held.is_empty() {
            if !today.is_empty() {
                info!(
                    count = today.len(),
                    "supplier payments held for tomorrow's dispatch"
                );
            }
            return;
        }
        let yesterday = date - Duration::days(1);
        info!(count = held.len(), from = %yesterday, settled_on = %date, "supplier payments");

        let tolerances = self.settings().tolerances.clone();
        for &i in &held {
            let movement = movements[i].clone();
            let plan = supplier_payment::build_plan(
                std::slice::from_ref(&movement),
                yesterday,
                self.database(),
                &tolerances,
            );
            let line_has_match = plan.reconciliations.first().cloned();

            match line_has_match {
                Some(reconciliation) => {
                    if options.dry_run {
                        let line = &mut results[i];
                        line.action = Action::Reconcile;
                        line.folios = vec![reconciliation.folio];
                        line.note = format!(
                            "DRY-RUN | folio {} (settled on {date})",
                            reconciliation.folio
                        );
                        continue;
                    }
                    let outcome = self.execute_reconciliations(&plan);
                    let line = &mut results[i];
                    if outcome.success {
                        line.action = Action::Reconcile;
                        line.folios = vec![reconciliation.folio];
                        line.note = format!("Reconciled (settled on {date})");
                    } else {
                        line.action = Action::Error;
                        line.note = outcome.error.clone().unwrap_or_default();
                    }
                }
                None => {
                    let line = &mut results[i];
                    line.action = Action::NotProcessed;
                    line.note = plan
                        .warnings
                        .first()
                        .cloned()
                        .unwrap_or_else(|| "No match in the movement table".to_string());
                }
            }
        }
    }

    pub(crate) fn handle_expense_payments(
        &mut self,
        date: NaiveDate,
        today: &[usize],
        movements: &[BankMovement],
        by_date: &BTreeMap<NaiveDate, Vec<usize>>,
        options: &RunOptions,
        results: &mut [LineResult],
    ) {
        for &i in today {
            results[i].action = Action::NotProcessed;
            results[i].note = PENDING_NOTE.to_string();
        }

        let held = yesterday_lines(date, by_date, movements, ProcessKind::ExpenseAccountPayment);
        if held.is_empty() {
            if !today.is_empty() {
                info!(
                    count = today.len(),
                    "expense payments held for tomorrow's dispatch"
                );
            }
            return;
        }
        let yesterday = date - Duration::days(1);
        info!(count = held.len(), from = %yesterday, settled_on = %date, "expense payments");

        let tolerances = self.settings().tolerances.clone();
        for &i in &held {
            let movement = movements[i].clone();
            let plan = expense_payment::build_plan(
                std::slice::from_ref(&movement),
                yesterday,
                self.database(),
                self.registry(),
                &tolerances,
            );

            if !plan.movements.is_empty() {
                if options.dry_run {
                    let target = plan
                        .ap_payments
                        .first()
                        .map(|p| format!("{}-{}", p.series, p.number))
                        .unwrap_or_default();
                    let line = &mut results[i];
                    line.action = Action::Insert;
                    line.note = format!(
                        "DRY-RUN | pay -> {target} {:.2} (settled on {date})",
                        movement.amount()
                    );
                    continue;
                }
                let outcome = self.execute_expense_payment(&plan);
                let line = &mut results[i];
                if outcome.success {
                    line.action = Action::Insert;
                    line.folios = outcome.folios.clone();
                    adjust_idempotency_note(line, &outcome, plan.movements.len());
                } else {
                    line.action = Action::Error;
                    line.note = outcome.error.clone().unwrap_or_default();
                }
            } else if let Some(settled) = plan.already_settled.first() {
                let line = &mut results[i];
                line.action = Action::Skip;
                line.note = settled.note.clone();
            } else {
                let line = &mut results[i];
                line.action = Action::NotProcessed;
                line.note = plan
                    .warnings
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "No purchase invoice on file".to_string());
            }
        }
    }

    pub(crate) fn handle_collections(
        &mut self,
        date: NaiveDate,
        indices: &[usize],
        movements: &[BankMovement],
        options: &RunOptions,
        results: &mut [LineResult],
    ) {
        if indices.is_empty() {
            return;
        }
        info!(count = indices.len(), "customer collections");

        let tolerances = self.settings().tolerances.clone();
        for &i in indices {
            let movement = movements[i].clone();
            let plan = collection::build_plan(
                std::slice::from_ref(&movement),
                date,
                self.database(),
                self.registry(),
                &tolerances,
            );

            if let Some(reconciliation) = plan.reconciliations.first().cloned() {
                // Phase B: the captured collection just needs the flag.
                if options.dry_run {
                    let line = &mut results[i];
                    line.action = Action::Reconcile;
                    line.folios = vec![reconciliation.folio];
                    line.note = format!("DRY-RUN | folio {}", reconciliation.folio);
                    continue;
                }
                let outcome = self.execute_reconciliations(&plan);
                let line = &mut results[i];
                if outcome.success {
                    line.action = Action::Reconcile;
                    line.folios = vec![reconciliation.folio];
                    line.note = reconciliation.note.clone();
                } else {
                    line.action = Action::Error;
                    line.note = outcome.error.clone().unwrap_or_default();
                }
            } else if let Some(new_collection) = plan.collections.first() {
                // Phase A: create the full collection.
                let label = format!(
                    "{}-{} {:.2}",
                    new_collection.series, new_collection.invoice_number, new_collection.amount
                );
                if options.dry_run {
                    let line = &mut results[i];
                    line.action = Action::Insert;
                    line.note = format!("DRY-RUN | create collection {label}");
                    continue;
                }
                let outcome = self.execute_full(&plan);
                let line = &mut results[i];
                if outcome.success {
                    line.action = Action::Insert;
                    line.folios = outcome.folios.clone();
                    line.note = format!("Collection created: {label}");
                    adjust_idempotency_note(line, &outcome, plan.movements.len());
                } else {
                    line.action = Action::Error;
                    line.note = outcome.error.clone().unwrap_or_default();
                }
            } else {
                let line = &mut results[i];
                line.action = Action::NotProcessed;
                // The already-settled path records its explanation as a
                // validation note, not a warning.
                line.note = plan
                    .warnings
                    .first()
                    .cloned()
                    .or_else(|| plan.validations.first().cloned())
                    .unwrap_or_else(|| "No match in the receivables tables".to_string());
            }
        }
    }
}
