//! Property tests over the plan builders and the deposit assigner.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use bankrecon_config::{AccountRegistry, FeeProvider};
use bankrecon_core::{BankMovement, ProcessKind};
use bankrecon_engine::assign::{assign_exact, assign_sequential, Deposit, EXACT_TOLERANCE};
use bankrecon_engine::processors::{bank_fee, card_sale};
use bankrecon_test_utils::{close, credit_line, date, debit_line, CARD_ACCOUNT, CASH_ACCOUNT};

/// Cent amounts between 0.01 and 500000.00.
fn money() -> impl Strategy<Value = Decimal> {
    (1i64..50_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn card_deposit(amount: Decimal) -> BankMovement {
    let mut movement = credit_line(
        date(2026, 2, 3),
        "DEBIT CARD SALES DEPOSIT",
        amount,
        CARD_ACCOUNT,
    );
    movement.kind = Some(ProcessKind::CardDebitSale);
    movement
}

proptest! {
    /// Every card-sale plan balances per movement slice, whatever the
    /// deposit amounts.
    #[test]
    fn card_plan_always_balances(amounts in prop::collection::vec(money(), 1..8)) {
        let registry = AccountRegistry::default();
        let deposits: Vec<BankMovement> =
            amounts.iter().map(|a| card_deposit(*a)).collect();
        let daily = close(
            date(2026, 2, 2),
            "20204",
            dec!(725897.52),
            dec!(0),
            amounts.iter().copied().sum(),
        );

        let plan = card_sale::build_plan(
            &deposits,
            date(2026, 2, 3),
            Some(&daily),
            None,
            &registry,
        );

        prop_assert!(plan.unbalanced_slices().is_empty());
        prop_assert_eq!(plan.movements.len(), deposits.len());
        // Each deposit applies exactly its amount to the global invoice.
        for (movement, link) in plan.movements.iter().zip(&plan.invoice_links) {
            prop_assert_eq!(movement.inflow, link.applied);
        }
    }

    /// Fee aggregation books 16% of the aggregated base, and the entry
    /// balances.
    #[test]
    fn fee_plan_vat_is_sixteen_percent(bases in prop::collection::vec(money(), 1..10)) {
        let registry = AccountRegistry::default();
        let provider = FeeProvider::default();
        let day = date(2026, 2, 5);

        let movements: Vec<BankMovement> = bases
            .iter()
            .map(|b| {
                let mut m = debit_line(day, "WIRE TRANSFER FEE", *b, CASH_ACCOUNT);
                m.kind = Some(ProcessKind::FeeWire);
                m
            })
            .collect();

        let plan = bank_fee::build_plan(&movements, day, &registry, &provider);
        prop_assert_eq!(plan.movements.len(), 1);
        prop_assert!(plan.unbalanced_slices().is_empty());

        let base: Decimal = bases.iter().copied().sum();
        let expected_vat = (base * dec!(0.16)).round_dp(2);
        prop_assert_eq!(plan.ap_invoices[0].vat, expected_vat);
        prop_assert_eq!(plan.movements[0].outflow, base + expected_vat);
    }

    /// Phase 1 only reports subsets that actually hit their targets.
    #[test]
    fn exact_assignment_sums_match_targets(
        amounts in prop::collection::vec(money(), 1..7),
        split_at in 0usize..6,
    ) {
        let deposits: Vec<Deposit> = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| Deposit { origin: i, movement: card_deposit(*a) })
            .collect();

        // Build two targets that are exactly satisfiable.
        let cut = split_at.min(amounts.len());
        let first: Decimal = amounts[..cut].iter().copied().sum();
        let second: Decimal = amounts[cut..].iter().copied().sum();
        let targets: Vec<Decimal> = [first, second]
            .into_iter()
            .filter(|t| *t > Decimal::ZERO)
            .collect();

        if let Some(assignment) = assign_exact(&deposits, &targets) {
            for (subset, target) in assignment.iter().zip(&targets) {
                let sum: Decimal = subset.iter().map(|&i| deposits[i].amount()).sum();
                prop_assert!((sum - target).abs() <= EXACT_TOLERANCE);
            }
        } else {
            // Satisfiable targets must be found when the deposit count
            // is this small.
            prop_assert!(false, "exact assignment missed a satisfiable split");
        }
    }

    /// The sequential split conserves money: assigned + leftovers equal
    /// the original deposits, and every slice points at a real origin.
    #[test]
    fn sequential_split_conserves_amounts(
        amounts in prop::collection::vec(money(), 1..7),
        targets in prop::collection::vec(money(), 1..5),
    ) {
        let deposits: Vec<Deposit> = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| Deposit { origin: i, movement: card_deposit(*a) })
            .collect();
        let closes: Vec<_> = targets
            .iter()
            .enumerate()
            .map(|(i, t)| close(date(2026, 2, (i + 1) as u32), "20200", dec!(1), dec!(0), *t))
            .collect();

        let result = assign_sequential(&deposits, &closes, EXACT_TOLERANCE);

        let assigned: Decimal = result
            .assignments
            .iter()
            .flat_map(|(_, slice)| slice.iter())
            .map(|d| d.amount())
            .sum();
        let left: Decimal = result.leftovers.iter().map(|d| d.amount()).sum();
        let original: Decimal = amounts.iter().copied().sum();
        prop_assert_eq!(assigned + left, original);

        for slice in result
            .assignments
            .iter()
            .flat_map(|(_, s)| s.iter())
            .chain(result.leftovers.iter())
        {
            prop_assert!(slice.origin < deposits.len());
            prop_assert!(slice.amount() > Decimal::ZERO);
        }

        // Per-origin conservation: the slices of each statement line
        // sum back to its deposit.
        for (i, amount) in amounts.iter().enumerate() {
            let slices: Decimal = result
                .assignments
                .iter()
                .flat_map(|(_, s)| s.iter())
                .chain(result.leftovers.iter())
                .filter(|d| d.origin == i)
                .map(|d| d.amount())
                .sum();
            prop_assert_eq!(slices, *amount);
        }
    }
}
