//! Day dispatcher and job driver.
//!
//! A job parses once, classifies once, then processes dates in
//! ascending order. Within a date the families run in a fixed order:
//! transfers, fees, card sales, cash sales, payroll, check-cashed,
//! expense-account payments, reconciliations, taxes. Payroll must
//! precede check-cashed (checks consume the provision); supplier and
//! expense payments settle with one day of delay. Every statement line
//! ends with exactly one terminal action.

mod families;
mod sales;
mod settlements;

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use tracing::{info, warn};

use bankrecon_config::{AccountRegistry, Settings};
use bankrecon_core::{
    Action, BankMovement, DailyClose, ExecutionOutcome, ExecutionPlan, FederalTax, JobSummary,
    LineResult, Payroll, ProcessKind, ReconError, ReconResult, SocialSecurityTax, StateTax,
};
use bankrecon_db::{queries, Database};

use crate::classify::{card_sale_dates, group_by_kind, Classifier};
use crate::execute::Executor;

/// Maximum size of an explicit [from, to] processing window.
const MAX_WINDOW_DAYS: i64 = 7;
/// Cash-sale deposits this close to a month edge are handled manually.
const MONTH_EDGE_DAYS: u32 = 4;

/// Parsed side-channel inputs for one job. The payroll's matched
/// buckets are the only mutable state and are reset per run.
#[derive(Default)]
pub struct SideChannels {
    pub closes: BTreeMap<NaiveDate, DailyClose>,
    pub payroll: Option<Payroll>,
    pub federal: Option<FederalTax>,
    pub state: Option<StateTax>,
    pub social_security: Option<SocialSecurityTax>,
}

/// Execution mode and period selection.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Report the plans without writing.
    pub dry_run: bool,
    /// Process a single date, or the start of a window.
    pub only_date: Option<NaiveDate>,
    /// Window end (inclusive); requires `only_date`.
    pub end_date: Option<NaiveDate>,
}

/// One reconciliation job over one parsed statement.
pub struct Job {
    settings: Settings,
    registry: AccountRegistry,
    classifier: Classifier,
    db: Option<Database>,
}

impl Job {
    pub fn new(settings: Settings, db: Option<Database>) -> Self {
        let registry = settings.registry();
        let classifier = Classifier::new(&registry);
        Self {
            settings,
            registry,
            classifier,
            db,
        }
    }

    pub fn summary(results: &[LineResult]) -> JobSummary {
        JobSummary::from_results(results)
    }

    /// Release the database handle (e.g. to start a follow-up job on
    /// the same connection).
    pub fn into_database(self) -> Option<Database> {
        self.db
    }

    /// Classify and process the whole statement, one day at a time.
    /// Returns one result per input line, in input order.
    pub fn process_statement(
        &mut self,
        mut movements: Vec<BankMovement>,
        side: &mut SideChannels,
        options: &RunOptions,
    ) -> ReconResult<Vec<LineResult>> {
        info!(lines = movements.len(), dry_run = options.dry_run, "job start");
        self.classifier.classify_all(&mut movements);

        if let Some(payroll) = side.payroll.as_mut() {
            payroll.reset_matches();
        }

        let mut results: Vec<LineResult> = movements
            .iter()
            .map(|m| LineResult::new(m.clone()))
            .collect();

        let mut by_date: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
        for (i, movement) in movements.iter().enumerate() {
            by_date.entry(movement.date).or_default().push(i);
        }

        let dates = self.select_dates(&by_date, options)?;
        if dates.is_empty() {
            warn!("no movements in the selected period");
            return Ok(results);
        }

        self.check_open_periods(&movements);
        let deposit_dates = card_sale_dates(&movements);

        for date in dates {
            let indices = by_date.get(&date).cloned().unwrap_or_default();
            info!(%date, lines = indices.len(), "processing day");
            self.process_day(
                date,
                &indices,
                &movements,
                &by_date,
                &deposit_dates,
                side,
                options,
                &mut results,
            );
        }

        let summary = JobSummary::from_results(&results);
        for (action, count) in &summary.counts {
            info!(?action, count, "job summary");
        }
        Ok(results)
    }

    /// The dates to process: every statement date, a single date, or an
    /// explicit window (every day in it, so the one-day-delay pickups
    /// still fire on days without their own movements).
    fn select_dates(
        &self,
        by_date: &BTreeMap<NaiveDate, Vec<usize>>,
        options: &RunOptions,
    ) -> ReconResult<Vec<NaiveDate>> {
        match (options.only_date, options.end_date) {
            (Some(start), Some(end)) => {
                if end < start {
                    return Err(ReconError::validation("window end precedes its start"));
                }
                if (end - start).num_days() + 1 > MAX_WINDOW_DAYS {
                    return Err(ReconError::validation(format!(
                        "window longer than {MAX_WINDOW_DAYS} days"
                    )));
                }
                if !by_date.keys().any(|d| *d >= start && *d <= end) {
                    return Ok(Vec::new());
                }
                let mut dates = Vec::new();
                let mut day = start;
                while day <= end {
                    dates.push(day);
                    day += Duration::days(1);
                }
                Ok(dates)
            }
            (Some(date), None) => {
                if by_date.contains_key(&date) {
                    Ok(vec![date])
                } else {
                    Ok(Vec::new())
                }
            }
            (None, _) => Ok(by_date.keys().copied().collect()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn process_day(
        &mut self,
        date: NaiveDate,
        indices: &[usize],
        movements: &[BankMovement],
        by_date: &BTreeMap<NaiveDate, Vec<usize>>,
        deposit_dates: &[NaiveDate],
        side: &mut SideChannels,
        options: &RunOptions,
        results: &mut [LineResult],
    ) {
        let groups = group_by_kind(movements, indices);
        let of = |kind: ProcessKind| groups.get(&kind).cloned().unwrap_or_default();

        // 1. Transfers.
        self.handle_transfers(date, &of(ProcessKind::InternalTransferOut), movements, options, results);

        // 2. Fees.
        let mut fee_indices = Vec::new();
        for kind in [
            ProcessKind::FeeWire,
            ProcessKind::FeeWireVat,
            ProcessKind::FeeCard,
            ProcessKind::FeeCardVat,
        ] {
            fee_indices.extend(of(kind));
        }
        self.handle_fees(date, &fee_indices, movements, options, results);

        // 3. Card sales (credit + debit share the processor).
        let mut card_indices = of(ProcessKind::CardCreditSale);
        card_indices.extend(of(ProcessKind::CardDebitSale));
        self.handle_card_sales(date, &card_indices, movements, deposit_dates, side, options, results);

        // 4. Cash sales.
        self.handle_cash_sales(date, &of(ProcessKind::CashSale), movements, side, options, results);

        // 5. Payroll dispersion, then the checks it provisions.
        self.handle_payroll(date, &of(ProcessKind::Payroll), movements, side, options, results);
        self.handle_checks(date, &of(ProcessKind::CheckCashed), movements, side, options, results);

        // 6. Expense-account payments (one-day delay).
        self.handle_expense_payments(date, &of(ProcessKind::ExpenseAccountPayment), movements, by_date, options, results);

        // 7. Reconciliations: supplier payments (one-day delay) and
        //    customer collections.
        self.handle_supplier_payments(date, &of(ProcessKind::SupplierPayment), movements, by_date, options, results);
        self.handle_collections(date, &of(ProcessKind::CustomerCollection), movements, options, results);

        // 8. Taxes.
        let mut tax_indices = Vec::new();
        for kind in [
            ProcessKind::TaxFederal,
            ProcessKind::TaxState,
            ProcessKind::TaxSocialSecurity,
        ] {
            tax_indices.extend(of(kind));
        }
        self.handle_taxes(date, &tax_indices, movements, side, options, results);

        // 9. Transfer-in legs are written by the out-leg's plan.
        for &i in &of(ProcessKind::InternalTransferIn) {
            results[i].action = Action::Skip;
            results[i].note = "Auto-generated by the out-leg".to_string();
        }
    }

    /// Warn when any touched accounting period is not open.
    fn check_open_periods(&self, movements: &[BankMovement]) {
        let Some(db) = self.db.as_ref() else { return };
        let mut seen = std::collections::BTreeSet::new();
        for movement in movements {
            let key = (movement.account.clone(), movement.date.year(), movement.date.month());
            if !seen.insert(key.clone()) {
                continue;
            }
            let Some(account) = self.registry.by_number(&movement.account) else {
                continue;
            };
            match queries::period_is_open(db.conn(), &account.bank, &account.number, key.1, key.2) {
                Ok(true) => {}
                Ok(false) => warn!(
                    account = %account.number,
                    year = key.1,
                    month = key.2,
                    "accounting period is not open"
                ),
                Err(e) => warn!(error = %e, "period check failed"),
            }
        }
    }

    // --- execution helpers (shared by the family handlers) ---------------

    pub(crate) fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    pub(crate) fn database(&self) -> Option<&Database> {
        self.db.as_ref()
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.settings
    }

    pub(crate) fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// In dry-run mode the plan is rendered instead of executed.
    pub(crate) fn report_plan(&self, plan: &ExecutionPlan, options: &RunOptions) {
        if options.dry_run {
            info!("\n{}", crate::render::render_plan(plan));
        }
    }

    pub(crate) fn execute_full(&mut self, plan: &ExecutionPlan) -> ExecutionOutcome {
        match self.db.as_mut() {
            Some(db) => Executor::new(db, &self.settings.company).run_plan(plan),
            None => no_database_outcome(plan),
        }
    }

    pub(crate) fn execute_reconciliations(&mut self, plan: &ExecutionPlan) -> ExecutionOutcome {
        match self.db.as_mut() {
            Some(db) => Executor::new(db, &self.settings.company).run_reconciliations(plan),
            None => no_database_outcome(plan),
        }
    }

    pub(crate) fn execute_expense_payment(&mut self, plan: &ExecutionPlan) -> ExecutionOutcome {
        match self.db.as_mut() {
            Some(db) => Executor::new(db, &self.settings.company).run_expense_payment(plan),
            None => no_database_outcome(plan),
        }
    }
}

fn no_database_outcome(plan: &ExecutionPlan) -> ExecutionOutcome {
    ExecutionOutcome::failure(&plan.kind, &plan.description, "no database connection")
}

/// Rewrite a line's action and note when the executor found the
/// movement(s) already present instead of inserting them.
pub(crate) fn adjust_idempotency_note(
    line: &mut LineResult,
    outcome: &ExecutionOutcome,
    plan_movements: usize,
) {
    let pre_existing = outcome.skipped_existing + outcome.reconciled_existing;
    if outcome.skipped_existing > 0 && outcome.folios.is_empty() {
        line.action = Action::Skip;
        line.note = "Already registered and reconciled".to_string();
        line.folios.clear();
    } else if outcome.reconciled_existing > 0
        && pre_existing == plan_movements
        && outcome.folios.len() == outcome.reconciled_existing
    {
        line.action = Action::Reconcile;
        let folios = outcome
            .folios
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        line.note = format!("Already registered, reconciled now (folio {folios})");
        line.folios = outcome.folios.clone();
    }
}

/// True inside the first or last [`MONTH_EDGE_DAYS`] days of the month.
pub(crate) fn month_edge(date: NaiveDate) -> bool {
    date.day() <= MONTH_EDGE_DAYS || date.day() > days_in_month(date) - MONTH_EDGE_DAYS
}

fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = (date.year(), date.month());
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.map(|d| (d - Duration::days(1)).day()).unwrap_or(31)
}
