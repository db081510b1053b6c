//! Sale handlers: card deposits (single- and multi-close) and cash
//! deposits.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, warn};

use bankrecon_core::{Action, BankMovement, DailyClose, LineResult};

use super::{adjust_idempotency_note, month_edge, Job, RunOptions, SideChannels};
use crate::assign::{assign_exact, assign_sequential, candidate_closes, Deposit, EXACT_TOLERANCE};
use crate::processors::{adjustment, card_sale, cash_sale};
use crate::validate;

impl Job {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn handle_card_sales(
        &mut self,
        date: NaiveDate,
        indices: &[usize],
        movements: &[BankMovement],
        deposit_dates: &[NaiveDate],
        side: &SideChannels,
        options: &RunOptions,
        results: &mut [LineResult],
    ) {
        if indices.is_empty() {
            return;
        }
        info!(count = indices.len(), "card sales");

        let closes = candidate_closes(date, &side.closes, Some(deposit_dates));
        if closes.is_empty() {
            warn!(%date, "no treasury closes for the deposit day");
            for &i in indices {
                results[i].action = Action::NotProcessed;
                results[i].note = "No treasury close for this date".to_string();
            }
            return;
        }

        let deposits: Vec<Deposit> = indices
            .iter()
            .map(|&i| Deposit {
                origin: i,
                movement: movements[i].clone(),
            })
            .collect();

        if closes.len() == 1 {
            self.card_sales_single_close(date, &deposits, &closes[0], options, results);
        } else {
            self.card_sales_multi_close(date, &deposits, &closes, options, results);
        }
    }

    /// One close feeds the whole deposit day: one plan, folio per
    /// deposit in order.
    fn card_sales_single_close(
        &mut self,
        date: NaiveDate,
        deposits: &[Deposit],
        close: &DailyClose,
        options: &RunOptions,
        results: &mut [LineResult],
    ) {
        let day_movements: Vec<BankMovement> =
            deposits.iter().map(|d| d.movement.clone()).collect();

        for problem in validate::validate_card_sales(
            &day_movements,
            Some(close),
            self.settings().tolerances.validation,
        ) {
            warn!(validation = %problem, "card sales");
        }

        let plan = card_sale::build_plan(
            &day_movements,
            date,
            Some(close),
            self.database(),
            self.registry(),
        );
        self.report_plan(&plan, options);

        if options.dry_run {
            for deposit in deposits {
                let line = &mut results[deposit.origin];
                line.action = Action::Insert;
                line.append_note(format!(
                    "DRY-RUN | close {} ({:.2})",
                    close.close_date,
                    deposit.amount()
                ));
            }
            return;
        }

        let outcome = self.execute_full(&plan);
        for (n, deposit) in deposits.iter().enumerate() {
            let line = &mut results[deposit.origin];
            if outcome.success {
                line.action = Action::Insert;
                if let Some(folio) = outcome.folios.get(n) {
                    line.folios.push(*folio);
                }
                line.append_note(format!(
                    "Close {} {:.2}",
                    close.close_date,
                    deposit.amount()
                ));
                adjust_idempotency_note(line, &outcome, plan.movements.len());
            } else {
                line.action = Action::Error;
                line.note = outcome.error.clone().unwrap_or_default();
            }
        }
    }

    /// Several closes feed one deposit day (the weekend pattern).
    fn card_sales_multi_close(
        &mut self,
        date: NaiveDate,
        deposits: &[Deposit],
        closes: &[DailyClose],
        options: &RunOptions,
        results: &mut [LineResult],
    ) {
        let with_target: Vec<&DailyClose> =
            closes.iter().filter(|c| c.has_card_target()).collect();
        let targets: Vec<Decimal> = with_target
            .iter()
            .map(|c| c.total_card.unwrap_or(Decimal::ZERO))
            .collect();

        // Phase 1: exact subset per close, committed only on full match.
        if let Some(assignment) = assign_exact(deposits, &targets) {
            let mut assigned = vec![false; deposits.len()];
            for (close, subset) in with_target.iter().zip(assignment) {
                let slice: Vec<Deposit> = subset.iter().map(|&n| deposits[n].clone()).collect();
                for &n in &subset {
                    assigned[n] = true;
                }
                self.card_sales_single_close(date, &slice, close, options, results);
            }
            for (n, deposit) in deposits.iter().enumerate() {
                if !assigned[n] {
                    self.book_adjustment(date, deposit, options, results);
                }
            }
            return;
        }

        // Phase 2: sequential with split.
        warn!(%date, "no exact multi-close match; falling back to sequential split");
        let owned: Vec<DailyClose> = with_target.into_iter().cloned().collect();
        let split = assign_sequential(deposits, &owned, EXACT_TOLERANCE);

        if split.assignments.is_empty() {
            for deposit in deposits {
                let line = &mut results[deposit.origin];
                line.action = Action::NeedsReview;
                line.note = "Could not assign to any treasury close".to_string();
            }
            return;
        }

        let assigned_total: Decimal = split
            .assignments
            .iter()
            .flat_map(|(_, deps)| deps.iter())
            .map(|d| d.amount())
            .sum();
        info!(
            closes = split.assignments.len(),
            assigned = %format!("{assigned_total:.2}"),
            split_lines = split.split_origins,
            leftovers = split.leftovers.len(),
            "sequential assignment"
        );

        let mut touched = vec![false; results.len()];
        for (close, slice) in &split.assignments {
            self.card_sales_single_close(date, slice, close, options, results);
            for deposit in slice {
                touched[deposit.origin] = true;
            }
        }

        for leftover in &split.leftovers {
            self.book_adjustment(date, leftover, options, results);
            touched[leftover.origin] = true;
        }

        for deposit in deposits {
            if !touched[deposit.origin] {
                let line = &mut results[deposit.origin];
                line.action = Action::NeedsReview;
                line.note = "Not assigned in the sequential split".to_string();
            }
        }
    }

    /// A deposit no close accounts for becomes a bank adjustment.
    fn book_adjustment(
        &mut self,
        date: NaiveDate,
        deposit: &Deposit,
        options: &RunOptions,
        results: &mut [LineResult],
    ) {
        info!(amount = %format!("{:.2}", deposit.amount()), "leftover deposit booked as bank adjustment");
        let line_index = deposit.origin;

        if options.dry_run {
            let line = &mut results[line_index];
            line.action = Action::Insert;
            line.append_note(format!("DRY-RUN | BANK ADJUSTMENT ({:.2})", deposit.amount()));
            return;
        }

        let plan = adjustment::build_plan(&deposit.movement, date, self.registry());
        if !plan.warnings.is_empty() && plan.movements.is_empty() {
            let line = &mut results[line_index];
            line.action = Action::Error;
            line.note = plan.warnings[0].clone();
            return;
        }

        let outcome = self.execute_full(&plan);
        let line = &mut results[line_index];
        if outcome.success {
            if line.action != Action::Insert {
                line.action = Action::Insert;
            }
            line.folios.extend(outcome.folios.iter().copied());
            line.append_note(format!("BANK ADJUSTMENT {:.2}", deposit.amount()));
            adjust_idempotency_note(line, &outcome, plan.movements.len());
        } else {
            line.action = Action::Error;
            line.append_note(format!(
                "ERROR: {}",
                outcome.error.clone().unwrap_or_default()
            ));
        }
    }

    pub(crate) fn handle_cash_sales(
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

        // Cross-month deposit/sale alignment is a manual process.
        if month_edge(date) {
            info!(count = indices.len(), day = %date, "cash deposits skipped at month edge");
            for &i in indices {
                results[i].action = Action::Skip;
                results[i].note = format!("Month edge (day {}): manual process", date.format("%d"));
            }
            return;
        }

        info!(count = indices.len(), "cash sales");

        for &i in indices {
            let movement = movements[i].clone();
            let close = find_cash_close(
                movement.amount(),
                side,
                self.settings().tolerances.cash_close,
            );
            let Some(close) = close else {
                results[i].action = Action::NotProcessed;
                results[i].note = format!(
                    "No treasury close for deposit {:.2}",
                    movement.amount()
                );
                continue;
            };

            for problem in validate::validate_cash_sales(
                std::slice::from_ref(&movement),
                Some(&close),
                self.settings().tolerances.validation,
            ) {
                warn!(validation = %problem, "cash sales");
            }

            let plan = cash_sale::build_plan(
                std::slice::from_ref(&movement),
                date,
                Some(&close),
                self.database(),
                self.registry(),
            );
            self.report_plan(&plan, options);

            if options.dry_run {
                results[i].action = Action::Insert;
                results[i].note = format!("DRY-RUN | close {}", close.close_date);
                continue;
            }

            let outcome = self.execute_full(&plan);
            let line = &mut results[i];
            if outcome.success {
                line.action = Action::Insert;
                line.folios = outcome.folios.clone();
                adjust_idempotency_note(line, &outcome, plan.movements.len());
            } else {
                line.action = Action::Error;
                line.note = outcome.error.clone().unwrap_or_default();
            }
        }
    }
}

/// The close whose cash total sits closest to the deposit amount inside
/// the tolerance. Cash deposits can reach the bank days later, so the
/// match is by amount, not date.
fn find_cash_close(amount: Decimal, side: &SideChannels, tolerance: Decimal) -> Option<DailyClose> {
    let mut best: Option<(Decimal, &DailyClose)> = None;
    for close in side.closes.values() {
        let Some(total) = close.total_cash.filter(|t| *t > Decimal::ZERO) else {
            continue;
        };
        let difference = (amount - total).abs();
        if difference <= tolerance {
            match best {
                Some((best_diff, _)) if best_diff <= difference => {}
                _ => best = Some((difference, close)),
            }
        }
    }
    best.map(|(_, close)| close.clone())
}
