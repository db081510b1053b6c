//! Multi-day card-deposit assignment.
//!
//! Card deposits settle next business day, so a Monday statement can
//! carry Friday, Saturday and Sunday sales at once. When several
//! treasury closes plausibly feed one deposit day, the assigner matches
//! deposits to closes in two phases: an exact subset-sum per close, and
//! a sequential consume-with-split fallback. Deposits the fallback
//! splits become *virtual* slices that keep pointing at their original
//! statement line, so every effect is attributed to one line.

use std::collections::VecDeque;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};

use bankrecon_core::{BankMovement, DailyClose};

/// Exact-sum tolerance for Phase 1.
pub const EXACT_TOLERANCE: Decimal = dec!(0.01);
/// Combination cap per subset size in Phase 1.
const MAX_COMBINATIONS: usize = 10_000;
/// Look-back for the first deposit date of a run.
const FIRST_DEPOSIT_LOOKBACK: i64 = 7;

/// A deposit, or a virtual slice of one. `origin` is the index of the
/// original statement line it belongs to.
#[derive(Debug, Clone)]
pub struct Deposit {
    pub origin: usize,
    pub movement: BankMovement,
}

impl Deposit {
    pub fn amount(&self) -> Decimal {
        self.movement.amount()
    }

    /// Clone with a different amount on the populated side.
    fn slice(&self, amount: Decimal) -> Self {
        let mut movement = self.movement.clone();
        if movement.credit.is_some() {
            movement.credit = Some(amount);
        } else {
            movement.debit = Some(amount);
        }
        Self {
            origin: self.origin,
            movement,
        }
    }
}

/// Candidate closes for a deposit date.
///
/// With the statement's deposit-date list available the window is
/// dynamic: from the previous deposit date up to the day before this
/// one (holidays widen the gap naturally), or seven days back for the
/// first deposit of the run. A deposit date that is not on the list
/// yields no candidates.
pub fn candidate_closes(
    deposit_date: NaiveDate,
    closes: &std::collections::BTreeMap<NaiveDate, DailyClose>,
    deposit_dates: Option<&[NaiveDate]>,
) -> Vec<DailyClose> {
    match deposit_dates {
        Some(dates) => {
            if !dates.contains(&deposit_date) {
                return Vec::new();
            }
            let start = match dates.iter().filter(|d| **d < deposit_date).max() {
                Some(previous) => *previous,
                None => deposit_date - Duration::days(FIRST_DEPOSIT_LOOKBACK),
            };
            let mut result = Vec::new();
            let mut day = start;
            while day < deposit_date {
                if let Some(close) = closes.get(&day) {
                    result.push(close.clone());
                }
                day += Duration::days(1);
            }
            result
        }
        None => fixed_window(deposit_date, closes),
    }
}

/// The older fixed rule for callers without the deposit-date list:
/// Monday collects Friday/Saturday/Sunday; other days take the closest
/// single prior close.
fn fixed_window(
    deposit_date: NaiveDate,
    closes: &std::collections::BTreeMap<NaiveDate, DailyClose>,
) -> Vec<DailyClose> {
    let mut result = Vec::new();
    if deposit_date.weekday() == Weekday::Mon {
        for delta in [3, 2, 1] {
            let candidate = deposit_date - Duration::days(delta);
            if let Some(close) = closes.get(&candidate) {
                result.push(close.clone());
            }
        }
    } else {
        for delta in [1, 2, 0, 3] {
            let candidate = deposit_date - Duration::days(delta);
            if let Some(close) = closes.get(&candidate) {
                result.push(close.clone());
                break;
            }
        }
    }
    result
}

/// Phase 1: find disjoint subsets of deposits whose sums hit each
/// close's card target exactly (within [`EXACT_TOLERANCE`]). Commits
/// only when EVERY target is matched; returns per-close index lists
/// into `deposits`.
pub fn assign_exact(deposits: &[Deposit], targets: &[Decimal]) -> Option<Vec<Vec<usize>>> {
    let mut available: Vec<usize> = (0..deposits.len()).collect();
    let mut assignment = Vec::with_capacity(targets.len());

    for &target in targets {
        let subset = subset_by_sum(deposits, &available, target, EXACT_TOLERANCE)?;
        available.retain(|i| !subset.contains(i));
        assignment.push(subset);
    }

    info!(
        closes = assignment.len(),
        leftover = available.len(),
        "exact assignment found"
    );
    Some(assignment)
}

/// Find a subset of the available deposits summing to `target`. Tries
/// the whole set first, then sizes n-1 down to 1, capping the
/// combinations examined per size.
fn subset_by_sum(
    deposits: &[Deposit],
    available: &[usize],
    target: Decimal,
    tolerance: Decimal,
) -> Option<Vec<usize>> {
    let total: Decimal = available.iter().map(|&i| deposits[i].amount()).sum();
    if (total - target).abs() <= tolerance {
        return Some(available.to_vec());
    }

    for size in (1..available.len()).rev() {
        if let Some(subset) = combination_by_sum(deposits, available, target, tolerance, size) {
            return Some(subset);
        }
    }
    None
}

/// Walk the k-combinations of `available` in lexicographic order until
/// one sums to the target or the cap is hit.
fn combination_by_sum(
    deposits: &[Deposit],
    available: &[usize],
    target: Decimal,
    tolerance: Decimal,
    size: usize,
) -> Option<Vec<usize>> {
    let n = available.len();
    if size == 0 || size > n {
        return None;
    }

    let mut cursor: Vec<usize> = (0..size).collect();
    let mut examined = 0usize;

    loop {
        examined += 1;
        if examined > MAX_COMBINATIONS {
            debug!(size, "combination cap reached");
            return None;
        }

        let sum: Decimal = cursor.iter().map(|&c| deposits[available[c]].amount()).sum();
        if (sum - target).abs() <= tolerance {
            return Some(cursor.iter().map(|&c| available[c]).collect());
        }

        // Advance to the next combination.
        let mut i = size;
        loop {
            if i == 0 {
                return None;
            }
            i -= 1;
            if cursor[i] != i + n - size {
                break;
            }
            if i == 0 {
                return None;
            }
        }
        cursor[i] += 1;
        for j in (i + 1)..size {
            cursor[j] = cursor[j - 1] + 1;
        }
    }
}

/// Result of the Phase-2 sequential assignment.
pub struct SplitAssignment {
    /// Per close, the (possibly sliced) deposits that fill its target.
    pub assignments: Vec<(DailyClose, Vec<Deposit>)>,
    /// Deposits (or slices) left after every close is satisfied.
    pub leftovers: Vec<Deposit>,
    /// Number of original statement lines that were split.
    pub split_origins: usize,
}

/// Phase 2: consume deposits in statement order; a deposit that would
/// overshoot a close's target is split, the remainder going back to the
/// head of the queue for the next close. Closes without a positive card
/// target are skipped.
pub fn assign_sequential(
    deposits: &[Deposit],
    closes: &[DailyClose],
    tolerance: Decimal,
) -> SplitAssignment {
    let mut queue: VecDeque<Deposit> = deposits.to_vec().into();
    let mut assignments = Vec::new();
    let mut split_origins = std::collections::BTreeSet::new();

    for close in closes {
        let Some(target) = close.total_card.filter(|t| *t > Decimal::ZERO) else {
            continue;
        };
        if queue.is_empty() {
            break;
        }

        let mut accumulated = Decimal::ZERO;
        let mut assigned = Vec::new();

        while accumulated + tolerance < target {
            let Some(deposit) = queue.pop_front() else {
                break;
            };
            let amount = deposit.amount();
            if accumulated + amount <= target + tolerance {
                accumulated += amount;
                assigned.push(deposit);
            } else {
                // Split: the fitting slice joins this close, the
                // remainder waits for the next one.
                let fitting = target - accumulated;
                let remainder = amount - fitting;
                split_origins.insert(deposit.origin);
                assigned.push(deposit.slice(fitting));
                queue.push_front(deposit.slice(remainder));
                accumulated = target;
            }
        }

        if !assigned.is_empty() {
            assignments.push((close.clone(), assigned));
        }
    }

    let leftovers: Vec<Deposit> = queue.into_iter().collect();
    info!(
        closes = assignments.len(),
        leftovers = leftovers.len(),
        split_origins = split_origins.len(),
        "sequential assignment"
    );
    SplitAssignment {
        assignments,
        leftovers,
        split_origins: split_origins.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankrecon_core::ProcessKind;
    use std::collections::BTreeMap;

    fn deposit(origin: usize, amount: Decimal) -> Deposit {
        Deposit {
            origin,
            movement: BankMovement {
                date: NaiveDate::from_ymd_opt(2026, 2, 9).unwrap(),
                description: "DEBIT CARD SALES DEPOSIT".to_string(),
                debit: None,
                credit: Some(amount),
                account: "038900320016".to_string(),
                sheet: "CARD".to_string(),
                kind: Some(ProcessKind::CardDebitSale),
            },
        }
    }

    fn close(day: u32, card_total: Decimal) -> DailyClose {
        DailyClose {
            close_date: NaiveDate::from_ymd_opt(2026, 2, day).unwrap(),
            sheet: day.to_string(),
            invoices: vec![],
            global_invoice_number: Some(format!("{}", 20200 + day)),
            global_invoice_amount: Some(card_total * dec!(2)),
            total_sales: None,
            total_cash: None,
            total_card: Some(card_total),
            total_other: None,
            treasury_folio: None,
        }
    }

    fn closes_map(days: std::ops::Range<u32>) -> BTreeMap<NaiveDate, DailyClose> {
        days.map(|d| {
            let c = close(d, dec!(100000));
            (c.close_date, c)
        })
        .collect()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
    }

    // --- dynamic window ---------------------------------------------------

    #[test]
    fn test_window_plain_weekday() {
        let dates = [date(2), date(3), date(4)];
        let closes = closes_map(1..15);
        let result = candidate_closes(date(3), &closes, Some(&dates));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].close_date, date(2));
    }

    #[test]
    fn test_window_monday_collects_weekend() {
        let dates = [date(6), date(9)];
        let closes = closes_map(1..15);
        let result = candidate_closes(date(9), &closes, Some(&dates));
        let found: Vec<NaiveDate> = result.iter().map(|c| c.close_date).collect();
        assert_eq!(found, vec![date(6), date(7), date(8)]);
    }

    #[test]
    fn test_window_widens_over_holiday() {
        // No deposit on Monday the 9th (holiday): Tuesday collects four
        // closes back to Friday.
        let dates = [date(6), date(10)];
        let closes = closes_map(1..15);
        let result = candidate_closes(date(10), &closes, Some(&dates));
        assert_eq!(result.len(), 4);
        assert_eq!(result[0].close_date, date(6));
        assert_eq!(result[3].close_date, date(9));
    }

    #[test]
    fn test_window_first_deposit_seven_days() {
        let dates = [date(9)];
        let closes = closes_map(1..15);
        let result = candidate_closes(date(9), &closes, Some(&dates));
        assert_eq!(result.len(), 7);
        assert_eq!(result[0].close_date, date(2));
        assert_eq!(result[6].close_date, date(8));
    }

    #[test]
    fn test_window_date_not_in_list() {
        let dates = [date(3), date(5)];
        let closes = closes_map(1..15);
        assert!(candidate_closes(date(4), &closes, Some(&dates)).is_empty());
    }

    #[test]
    fn test_fixed_fallback_monday() {
        let closes = closes_map(1..15);
        // Feb 9 2026 is a Monday.
        let result = candidate_closes(date(9), &closes, None);
        let found: Vec<NaiveDate> = result.iter().map(|c| c.close_date).collect();
        assert_eq!(found, vec![date(6), date(7), date(8)]);
        // A Wednesday takes only the prior day.
        let result = candidate_closes(date(11), &closes, None);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].close_date, date(10));
    }

    // --- phase 1 ----------------------------------------------------------

    #[test]
    fn test_exact_assignment_full_match() {
        let deposits = vec![
            deposit(0, dec!(100000)),
            deposit(1, dec!(50000)),
            deposit(2, dec!(80000)),
        ];
        let targets = vec![dec!(150000), dec!(80000)];

        let assignment = assign_exact(&deposits, &targets).unwrap();
        assert_eq!(assignment.len(), 2);
        let first: Decimal = assignment[0].iter().map(|&i| deposits[i].amount()).sum();
        let second: Decimal = assignment[1].iter().map(|&i| deposits[i].amount()).sum();
        assert_eq!(first, dec!(150000));
        assert_eq!(second, dec!(80000));
    }

    #[test]
    fn test_exact_assignment_fails_without_full_match() {
        // Scenario from the weekend run: no subset hits 250000.
        let deposits = vec![
            deposit(0, dec!(300000)),
            deposit(1, dec!(150000)),
            deposit(2, dec!(50000)),
        ];
        let targets = vec![dec!(250000), dec!(200000), dec!(50000)];
        assert!(assign_exact(&deposits, &targets).is_none());
    }

    #[test]
    fn test_exact_prefers_whole_set() {
        let deposits = vec![deposit(0, dec!(70000)), deposit(1, dec!(30000))];
        let targets = vec![dec!(100000)];
        let assignment = assign_exact(&deposits, &targets).unwrap();
        assert_eq!(assignment[0].len(), 2);
    }

    // --- phase 2 ----------------------------------------------------------

    #[test]
    fn test_sequential_no_split_when_exact() {
        let deposits = vec![
            deposit(0, dec!(100000)),
            deposit(1, dec!(50000)),
            deposit(2, dec!(80000)),
        ];
        let closes = vec![close(20, dec!(150000)), close(21, dec!(80000))];

        let result = assign_sequential(&deposits, &closes, EXACT_TOLERANCE);
        assert_eq!(result.assignments.len(), 2);
        let sums: Vec<Decimal> = result
            .assignments
            .iter()
            .map(|(_, deps)| deps.iter().map(|d| d.amount()).sum())
            .collect();
        assert_eq!(sums, vec![dec!(150000), dec!(80000)]);
        assert!(result.leftovers.is_empty());
        assert_eq!(result.split_origins, 0);
    }

    #[test]
    fn test_sequential_weekend_split() {
        // Spec scenario: Monday deposits 300000/150000/50000 against
        // closes 250000/200000/50000.
        let deposits = vec![
            deposit(0, dec!(300000)),
            deposit(1, dec!(150000)),
            deposit(2, dec!(50000)),
        ];
        let closes = vec![
            close(6, dec!(250000)),
            close(7, dec!(200000)),
            close(8, dec!(50000)),
        ];

        let result = assign_sequential(&deposits, &closes, EXACT_TOLERANCE);
        assert_eq!(result.assignments.len(), 3);

        // Friday gets 250000 sliced off the 300000 deposit.
        let friday = &result.assignments[0].1;
        assert_eq!(friday.len(), 1);
        assert_eq!(friday[0].amount(), dec!(250000));
        assert_eq!(friday[0].origin, 0);

        // Saturday gets the 50000 remainder plus the 150000 deposit.
        let saturday = &result.assignments[1].1;
        assert_eq!(saturday.len(), 2);
        assert_eq!(saturday[0].amount(), dec!(50000));
        assert_eq!(saturday[0].origin, 0);
        assert_eq!(saturday[1].amount(), dec!(150000));

        // Sunday gets the last deposit whole.
        let sunday = &result.assignments[2].1;
        assert_eq!(sunday.len(), 1);
        assert_eq!(sunday[0].origin, 2);

        assert!(result.leftovers.is_empty());
        assert_eq!(result.split_origins, 1);
    }

    #[test]
    fn test_sequential_leftover() {
        let deposits = vec![deposit(0, dec!(200000))];
        let closes = vec![close(20, dec!(100000))];

        let result = assign_sequential(&deposits, &closes, EXACT_TOLERANCE);
        assert_eq!(result.assignments.len(), 1);
        assert_eq!(result.leftovers.len(), 1);
        assert_eq!(result.leftovers[0].amount(), dec!(100000));
        assert_eq!(result.leftovers[0].origin, 0);
    }

    #[test]
    fn test_sequential_triple_split() {
        let deposits = vec![deposit(0, dec!(60000))];
        let closes = vec![
            close(20, dec!(20000)),
            close(21, dec!(20000)),
            close(22, dec!(20000)),
        ];

        let result = assign_sequential(&deposits, &closes, EXACT_TOLERANCE);
        assert_eq!(result.assignments.len(), 3);
        for (_, deps) in &result.assignments {
            let sum: Decimal = deps.iter().map(|d| d.amount()).sum();
            assert_eq!(sum, dec!(20000));
            assert!(deps.iter().all(|d| d.origin == 0));
        }
        assert_eq!(result.split_origins, 1);
    }

    #[test]
    fn test_sequential_tolerance_avoids_needless_split() {
        let deposits = vec![deposit(0, dec!(100001.50))];
        let closes = vec![close(20, dec!(100000))];

        let result = assign_sequential(&deposits, &closes, dec!(2.00));
        assert_eq!(result.assignments.len(), 1);
        assert_eq!(result.assignments[0].1[0].amount(), dec!(100001.50));
        assert_eq!(result.split_origins, 0);
        assert!(result.leftovers.is_empty());
    }

    #[test]
    fn test_sequential_skips_targetless_closes() {
        let deposits = vec![deposit(0, dec!(10000))];
        let mut empty = close(20, dec!(0));
        empty.total_card = Some(dec!(0));
        let mut none = close(21, dec!(0));
        none.total_card = None;
        let closes = vec![empty, none, close(22, dec!(10000))];

        let result = assign_sequential(&deposits, &closes, EXACT_TOLERANCE);
        assert_eq!(result.assignments.len(), 1);
        assert_eq!(result.assignments[0].0.close_date, date(22));
    }

    #[test]
    fn test_sequential_without_closes_everything_left_over() {
        let deposits = vec![deposit(0, dec!(10000))];
        let result = assign_sequential(&deposits, &[], EXACT_TOLERANCE);
        assert!(result.assignments.is_empty());
        assert_eq!(result.leftovers.len(), 1);
    }
}
