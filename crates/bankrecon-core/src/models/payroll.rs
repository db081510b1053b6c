//! Payroll data (side channel for the payroll processor).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One perception or deduction line from the payroll workbook, already
/// mapped to a ledger account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollItem {
    pub concept: String,
    pub account: String,
    pub sub_account: String,
    pub amount: Decimal,
}

/// Kind of a provisioned secondary payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayrollBucketKind {
    Checks,
    Vacations,
    Severance,
}

impl PayrollBucketKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Checks => "CHECKS",
            Self::Vacations => "VACATIONS",
            Self::Severance => "SEVERANCE",
        }
    }

    /// Movement class used when the bucket's check is cashed.
    pub fn class(self) -> &'static str {
        match self {
            Self::Severance => "SEVERANCE",
            _ => "PAYROLL",
        }
    }
}

/// A secondary payment provisioned by the dispersion ledger entry and
/// consumed later by check-cashed statement lines.
///
/// `matched` is the single piece of cross-plan mutable state in the
/// engine; it is owned by the job and reset per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollBucket {
    pub kind: PayrollBucketKind,
    pub amount: Decimal,
    #[serde(default)]
    pub matched: bool,
}

/// Parsed payroll workbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payroll {
    /// Payroll number within the year (e.g. 3 for "PAYROLL 03").
    pub number: u32,
    /// Net transfer to all employee accounts.
    pub dispersion_total: Decimal,
    /// Total paid by check.
    pub checks_total: Decimal,
    /// Vacations paid outside the dispersion.
    pub vacations_total: Decimal,
    /// Severance paid outside the dispersion.
    pub severance_total: Decimal,
    /// Perception lines (salary, seventh day, premiums, bonuses, ...).
    #[serde(default)]
    pub perceptions: Vec<PayrollItem>,
    /// Deduction lines (income tax, social security, housing fund, ...).
    #[serde(default)]
    pub deductions: Vec<PayrollItem>,
    /// Secondary buckets pending a check-cashed line.
    #[serde(default)]
    pub buckets: Vec<PayrollBucket>,
}

impl Payroll {
    /// Net payroll total across dispersion and secondaries.
    pub fn net_total(&self) -> Decimal {
        self.dispersion_total + self.checks_total + self.vacations_total + self.severance_total
    }

    /// Amount provisioned to payroll payables by the dispersion entry.
    pub fn secondary_total(&self) -> Decimal {
        self.checks_total + self.vacations_total + self.severance_total
    }

    /// Sum of the deduction lines.
    pub fn deduction_total(&self) -> Decimal {
        self.deductions.iter().map(|d| d.amount).sum()
    }

    /// Sum of the perception lines.
    pub fn perception_total(&self) -> Decimal {
        self.perceptions.iter().map(|p| p.amount).sum()
    }

    /// Build the standard secondary buckets from the three totals,
    /// skipping zero amounts.
    pub fn rebuild_buckets(&mut self) {
        self.buckets.clear();
        for (kind, amount) in [
            (PayrollBucketKind::Checks, self.checks_total),
            (PayrollBucketKind::Vacations, self.vacations_total),
            (PayrollBucketKind::Severance, self.severance_total),
        ] {
            if amount > Decimal::ZERO {
                self.buckets.push(PayrollBucket {
                    kind,
                    amount,
                    matched: false,
                });
            }
        }
    }

    /// Find the first unmatched bucket within `tolerance` of `amount`
    /// and mark it used. Returns the bucket kind on a match.
    pub fn match_secondary(
        &mut self,
        amount: Decimal,
        tolerance: Decimal,
    ) -> Option<PayrollBucketKind> {
        for bucket in &mut self.buckets {
            if bucket.matched || bucket.amount <= Decimal::ZERO {
                continue;
            }
            if (bucket.amount - amount).abs() <= tolerance {
                bucket.matched = true;
                return Some(bucket.kind);
            }
        }
        None
    }

    /// Reset the matched flags (called once per job).
    pub fn reset_matches(&mut self) {
        for bucket in &mut self.buckets {
            bucket.matched = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn payroll() -> Payroll {
        let mut p = Payroll {
            number: 8,
            dispersion_total: dec!(180000.00),
            checks_total: dec!(12500.00),
            vacations_total: dec!(3200.00),
            severance_total: Decimal::ZERO,
            perceptions: vec![],
            deductions: vec![],
            buckets: vec![],
        };
        p.rebuild_buckets();
        p
    }

    #[test]
    fn test_totals() {
        let p = payroll();
        assert_eq!(p.net_total(), dec!(195700.00));
        assert_eq!(p.secondary_total(), dec!(15700.00));
        assert_eq!(p.buckets.len(), 2);
    }

    #[test]
    fn test_match_secondary_consumes_bucket() {
        let mut p = payroll();
        let hit = p.match_secondary(dec!(12500.30), dec!(0.50));
        assert_eq!(hit, Some(PayrollBucketKind::Checks));
        // Same amount again must not re-match the used bucket.
        assert_eq!(p.match_secondary(dec!(12500.30), dec!(0.50)), None);
        // The other bucket is still available.
        assert_eq!(
            p.match_secondary(dec!(3200.00), dec!(0.50)),
            Some(PayrollBucketKind::Vacations)
        );
    }

    #[test]
    fn test_reset_matches() {
        let mut p = payroll();
        p.match_secondary(dec!(12500.00), dec!(0.50)).unwrap();
        p.reset_matches();
        assert!(p.buckets.iter().all(|b| !b.matched));
    }
}
