//! Per-family handlers: transfers, fees, payroll, checks and taxes.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use tracing::info;

use bankrecon_core::{Action, BankMovement, LineResult};

use super::{adjust_idempotency_note, Job, RunOptions, SideChannels};
use crate::processors::{bank_fee, payroll, taxes, transfer};

impl Job {
    pub(crate) fn handle_transfers(
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
        info!(count = indices.len(), "transfers");

        let day_movements: Vec<BankMovement> =
            indices.iter().map(|&i| movements[i].clone()).collect();
        let plan = transfer::build_plan(
            &day_movements,
            date,
            self.classifier(),
            self.registry(),
            &self.settings().company,
        );

        if plan.movements.is_empty() {
            for &i in indices {
                results[i].note = plan
                    .warnings
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "No movements generated".to_string());
            }
            return;
        }
        self.report_plan(&plan, options);

        if options.dry_run {
            for &i in indices {
                results[i].action = Action::Insert;
                results[i].note = "DRY-RUN".to_string();
            }
            return;
        }

        let outcome = self.execute_full(&plan);
        // Each transfer line owns two folios (out-leg then in-leg).
        for (n, &i) in indices.iter().enumerate() {
            let line = &mut results[i];
            if outcome.success {
                line.action = Action::Insert;
                let start = n * 2;
                line.folios = outcome
                    .folios
                    .get(start..(start + 2).min(outcome.folios.len()))
                    .unwrap_or_default()
                    .to_vec();
                adjust_idempotency_note(line, &outcome, plan.movements.len());
            } else {
                line.action = Action::Error;
                line.note = outcome.error.clone().unwrap_or_default();
            }
        }
    }

    pub(crate) fn handle_fees(
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
        info!(count = indices.len(), "bank fees");

        let day_movements: Vec<BankMovement> =
            indices.iter().map(|&i| movements[i].clone()).collect();
        let plan = bank_fee::build_plan(
            &day_movements,
            date,
            self.registry(),
            &self.settings().fee_provider,
        );

        if plan.movements.is_empty() {
            for &i in indices {
                results[i].note = "No movements generated".to_string();
            }
            return;
        }
        self.report_plan(&plan, options);

        if options.dry_run {
            for &i in indices {
                results[i].action = Action::Insert;
                results[i].note = "DRY-RUN".to_string();
            }
            return;
        }

        let outcome = self.execute_full(&plan);

        // One folio per bank-account group; every fee line of the group
        // shares it. Group order matches the plan's (sorted by account).
        let mut accounts: Vec<&str> = indices
            .iter()
            .map(|&i| movements[i].account.as_str())
            .collect();
        accounts.sort_unstable();
        accounts.dedup();

        for &i in indices {
            let line = &mut results[i];
            if outcome.success {
                line.action = Action::Insert;
                let group = accounts
                    .iter()
                    .position(|a| *a == movements[i].account.as_str());
                if let Some(folio) = group.and_then(|g| outcome.folios.get(g)) {
                    line.folios = vec![*folio];
                }
                adjust_idempotency_note(line, &outcome, plan.movements.len());
            } else {
                line.action = Action::Error;
                line.note = outcome.error.clone().unwrap_or_default();
            }
        }
    }

    pub(crate) fn handle_payroll(
        &mut self,
        date: NaiveDate,
        indices: &[usize],
        movements: &[BankMovement],
        side: &mut SideChannels,
        options: &RunOptions,
        results: &mut [LineResult],
    ) {
        if indices.is_empty() {
            return;
        }
        info!(count = indices.len(), "payroll");

        if side.payroll.is_none() {
            for &i in indices {
                results[i].action = Action::Error;
                results[i].note =
                    "No payroll workbook: the dispersion cannot be registered".to_string();
            }
            return;
        }

        let day_movements: Vec<BankMovement> =
            indices.iter().map(|&i| movements[i].clone()).collect();
        let plan = payroll::build_plan(&day_movements, date, side.payroll.as_ref(), self.registry());

        if plan.movements.is_empty() {
            for &i in indices {
                results[i].action = Action::Error;
                results[i].note = plan
                    .warnings
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "No movements generated".to_string());
            }
            return;
        }
        self.report_plan(&plan, options);

        if options.dry_run {
            for &i in indices {
                results[i].action = Action::Insert;
                results[i].note = "DRY-RUN | PAYROLL DISPERSION".to_string();
            }
            return;
        }

        let outcome = self.execute_full(&plan);
        for &i in indices {
            let line = &mut results[i];
            if outcome.success {
                line.action = Action::Insert;
                line.folios = outcome.folios.clone();
                line.note = "PAYROLL DISPERSION".to_string();
                adjust_idempotency_note(line, &outcome, plan.movements.len());
            } else {
                line.action = Action::Error;
                line.note = outcome.error.clone().unwrap_or_default();
            }
        }
    }

    pub(crate) fn handle_checks(
        &mut self,
        date: NaiveDate,
        indices: &[usize],
        movements: &[BankMovement],
        side: &mut SideChannels,
        options: &RunOptions,
        results: &mut [LineResult],
    ) {
        if indices.is_empty() {
            return;
        }
        info!(count = indices.len(), "checks cashed");

        for &i in indices {
            let movement = &movements[i];
            let check_number = self
                .classifier()
                .check_number(&movement.description)
                .unwrap_or_default();

            let Some(workbook) = side.payroll.as_mut() else {
                results[i].action = Action::Unknown;
                results[i].note =
                    "No payroll workbook: cannot classify the cashed check".to_string();
                continue;
            };

            let plan = payroll::build_check_plan(
                date,
                workbook,
                movement.amount(),
                &check_number,
                &self.registry,
            );
            let Some(plan) = plan else {
                results[i].action = Action::Unknown;
                results[i].note = format!(
                    "Check #{check_number} {:.2} not matched in the payroll workbook",
                    movement.amount()
                );
                continue;
            };

            if options.dry_run {
                results[i].action = Action::Insert;
                results[i].note = format!("DRY-RUN | {} (check #{check_number})", plan.description);
                continue;
            }

            let outcome = self.execute_full(&plan);
            let line = &mut results[i];
            if outcome.success {
                line.action = Action::Insert;
                line.folios = outcome.folios.clone();
                line.note = format!("{} (check #{check_number})", plan.description);
                adjust_idempotency_note(line, &outcome, plan.movements.len());
            } else {
                line.action = Action::Error;
                line.note = outcome.error.clone().unwrap_or_default();
            }
        }
    }

    pub(crate) fn handle_taxes(
        &mut self,
        date: NaiveDate,
        indices: &[usize],
        movements: &[BankMovement],
        side: &SideChannels,
        options: &RunOptions,
        results: &mut [LineResult],
    ) {
        if indices.is_empty() {
            return;
        }
        info!(count = indices.len(), "taxes");

        if side.federal.is_none() && side.state.is_none() && side.social_security.is_none() {
            for &i in indices {
                results[i].action = Action::NotProcessed;
                results[i].note = "No tax filings provided".to_string();
            }
            return;
        }

        let day_movements: Vec<BankMovement> =
            indices.iter().map(|&i| movements[i].clone()).collect();
        let plan = taxes::build_plan(
            &day_movements,
            date,
            side.federal.as_ref(),
            side.state.as_ref(),
            side.social_security.as_ref(),
            self.database(),
            self.registry(),
        );

        if plan.movements.is_empty() {
            for &i in indices {
                if results[i].action == Action::NotProcessed {
                    results[i].note = plan
                        .warnings
                        .first()
                        .cloned()
                        .unwrap_or_else(|| "No movements generated".to_string());
                }
            }
            return;
        }
        self.report_plan(&plan, options);

        if options.dry_run {
            for &i in indices {
                results[i].action = Action::Insert;
                results[i].note = "DRY-RUN".to_string();
            }
            return;
        }

        let outcome = self.execute_full(&plan);
        if !outcome.success {
            for &i in indices {
                results[i].action = Action::Error;
                results[i].note = outcome.error.clone().unwrap_or_default();
            }
            return;
        }

        // Map folios back to statement lines by amount: each plan
        // movement settles the line with the same amount; plan rows
        // without an individual match may be sub-movements of one line
        // (the VAT retentions inside the second-return total).
        let tolerance = dec!(0.01);
        let mut line_taken = vec![false; indices.len()];
        let mut row_taken = vec![false; plan.movements.len()];

        for (row, movement_row) in plan.movements.iter().enumerate() {
            let Some(folio) = outcome.folios.get(row) else { break };
            let amount = movement_row.amount();
            for (slot, &i) in indices.iter().enumerate() {
                if line_taken[slot] {
                    continue;
                }
                if (movements[i].amount() - amount).abs() <= tolerance {
                    let line = &mut results[i];
                    line.action = Action::Insert;
                    line.folios.push(*folio);
                    adjust_idempotency_note(line, &outcome, plan.movements.len());
                    line_taken[slot] = true;
                    row_taken[row] = true;
                    break;
                }
            }
        }

        let mut unmatched_folios = Vec::new();
        let mut unmatched_sum = rust_decimal::Decimal::ZERO;
        for (row, movement_row) in plan.movements.iter().enumerate() {
            if row_taken[row] {
                continue;
            }
            if let Some(folio) = outcome.folios.get(row) {
                unmatched_folios.push(*folio);
                unmatched_sum += movement_row.amount();
            }
        }
        if !unmatched_folios.is_empty() {
            for (slot, &i) in indices.iter().enumerate() {
                if line_taken[slot] {
                    continue;
                }
                if (movements[i].amount() - unmatched_sum).abs() <= tolerance {
                    let line = &mut results[i];
                    line.action = Action::Insert;
                    line.folios.extend(unmatched_folios.iter().copied());
                    adjust_idempotency_note(line, &outcome, plan.movements.len());
                    line_taken[slot] = true;
                    break;
                }
            }
        }

        for (slot, &i) in indices.iter().enumerate() {
            if !line_taken[slot] && results[i].action == Action::NotProcessed {
                results[i].note = "No amount match in the tax plan".to_string();
            }
        }
    }
}
