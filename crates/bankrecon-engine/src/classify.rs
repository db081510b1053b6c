//! Movement classifier.
//!
//! An ordered table of `(description regex, account filter, kind)`; the
//! first matching rule wins. Rules for a fee's VAT line precede the
//! base-fee rule so the longer pattern cannot be shadowed by its
//! prefix. Account filters require exact equality with the movement's
//! bank-account number. Unmatched movements stay `Unknown`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};
use tracing::info;

use bankrecon_config::AccountRegistry;
use bankrecon_core::{BankMovement, ProcessKind};

struct Rule {
    pattern: Regex,
    /// Exact account-number filter; None applies to any account.
    account: Option<String>,
    kind: ProcessKind,
}

/// Compiled classification table. Built once at startup from the
/// account registry; classification itself is a pure function.
pub struct Classifier {
    rules: Vec<Rule>,
    transfer_destination: Regex,
    check_number: Regex,
}

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("classifier pattern compiles")
}

impl Classifier {
    pub fn new(registry: &AccountRegistry) -> Self {
        let cash = registry.cash().number.clone();
        let card = registry.card().number.clone();
        let expense = registry.expense().number.clone();

        let rules = vec![
            // Card-sale deposits (card account only).
            Rule {
                pattern: ci(r"CREDIT CARD SALES DEPOSIT"),
                account: Some(card.clone()),
                kind: ProcessKind::CardCreditSale,
            },
            Rule {
                pattern: ci(r"DEBIT CARD SALES DEPOSIT"),
                account: Some(card.clone()),
                kind: ProcessKind::CardDebitSale,
            },
            // Cash-sale deposits (cash account only).
            Rule {
                pattern: ci(r"CASH DEPOSIT"),
                account: Some(cash.clone()),
                kind: ProcessKind::CashSale,
            },
            // Transfers between own accounts.
            Rule {
                pattern: ci(r"\(WT\)\s*TRANSFER TO ACCOUNT"),
                account: None,
                kind: ProcessKind::InternalTransferOut,
            },
            Rule {
                pattern: ci(r"\(WT\)\s*TRANSFER RECEIVED FROM ACCOUNT"),
                account: None,
                kind: ProcessKind::InternalTransferIn,
            },
            // Bank fees. VAT patterns must precede their base patterns.
            Rule {
                pattern: ci(r"VAT ON WIRE TRANSFER FEE"),
                account: None,
                kind: ProcessKind::FeeWireVat,
            },
            Rule {
                pattern: ci(r"WIRE TRANSFER FEE"),
                account: None,
                kind: ProcessKind::FeeWire,
            },
            Rule {
                pattern: ci(r"VAT ON DISCOUNT RATE"),
                account: Some(card.clone()),
                kind: ProcessKind::FeeCardVat,
            },
            Rule {
                pattern: ci(r"DISCOUNT RATE APPLICATION"),
                account: Some(card),
                kind: ProcessKind::FeeCard,
            },
            // Payroll.
            Rule {
                pattern: ci(r"PAYROLL DISPERSION"),
                account: None,
                kind: ProcessKind::Payroll,
            },
            Rule {
                pattern: ci(r"CHECK CASHED"),
                account: Some(cash.clone()),
                kind: ProcessKind::CheckCashed,
            },
            // Taxes.
            Rule {
                pattern: ci(r"\(WT\)\s*SERVICE PAYMENT.*REFERENCED TAX"),
                account: Some(cash.clone()),
                kind: ProcessKind::TaxFederal,
            },
            Rule {
                pattern: ci(r"STATE TREASURY OFFICE"),
                account: None,
                kind: ProcessKind::TaxState,
            },
            Rule {
                pattern: ci(r"\(WT\)\s*SERVICE PAYMENT.*SOCIAL SECURITY"),
                account: Some(cash.clone()),
                kind: ProcessKind::TaxSocialSecurity,
            },
            // Customer collections (incoming wires on the cash account).
            Rule {
                pattern: ci(r"INCOMING WIRE RECEIVED"),
                account: Some(cash.clone()),
                kind: ProcessKind::CustomerCollection,
            },
            // Card purchases drawn from the expense account.
            Rule {
                pattern: ci(r"POS PURCHASE"),
                account: Some(expense),
                kind: ProcessKind::ExpenseAccountPayment,
            },
            // Outgoing supplier wires, last resort for cash-account debits.
            Rule {
                pattern: ci(r"[A-Z0-9]{5,}.*OUTGOING WIRE"),
                account: Some(cash),
                kind: ProcessKind::SupplierPayment,
            },
        ];

        Self {
            rules,
            transfer_destination: ci(r"\(WT\)\s*TRANSFER TO ACCOUNT:\s*(\d+)"),
            check_number: ci(r"CHECK CASHED:\s*0*(\d+)"),
        }
    }

    /// Classify a single movement.
    pub fn classify(&self, movement: &BankMovement) -> ProcessKind {
        for rule in &self.rules {
            if let Some(account) = &rule.account {
                if &movement.account != account {
                    continue;
                }
            }
            if rule.pattern.is_match(&movement.description) {
                return rule.kind;
            }
        }
        ProcessKind::Unknown
    }

    /// Classify every movement in place and return per-kind counts.
    pub fn classify_all(&self, movements: &mut [BankMovement]) -> BTreeMap<ProcessKind, usize> {
        let mut counts = BTreeMap::new();
        for movement in movements.iter_mut() {
            let kind = self.classify(movement);
            movement.kind = Some(kind);
            *counts.entry(kind).or_insert(0) += 1;
        }
        for (kind, count) in &counts {
            info!(?kind, count, "classified");
        }
        counts
    }

    /// Destination account embedded in a transfer-out description.
    pub fn transfer_destination(&self, description: &str) -> Option<String> {
        self.transfer_destination
            .captures(description)
            .map(|c| c[1].to_string())
    }

    /// Check number embedded in a check-cashed description.
    pub fn check_number(&self, description: &str) -> Option<String> {
        self.check_number
            .captures(description)
            .map(|c| c[1].to_string())
    }
}

/// Group classified movement indices by kind.
pub fn group_by_kind(
    movements: &[BankMovement],
    indices: &[usize],
) -> BTreeMap<ProcessKind, Vec<usize>> {
    let mut groups: BTreeMap<ProcessKind, Vec<usize>> = BTreeMap::new();
    for &i in indices {
        groups
            .entry(movements[i].kind_or_unknown())
            .or_default()
            .push(i);
    }
    groups
}

/// Dates that carry at least one card-sale deposit, ascending. Feeds
/// the assigner's dynamic look-back window.
pub fn card_sale_dates(movements: &[BankMovement]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = movements
        .iter()
        .filter(|m| m.kind.map(|k| k.is_card_sale()).unwrap_or(false))
        .map(|m| m.date)
        .collect();
    dates.sort();
    dates.dedup();
    dates
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn movement(description: &str, account: &str, credit: bool) -> BankMovement {
        BankMovement {
            date: NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
            description: description.to_string(),
            debit: (!credit).then(|| dec!(100)),
            credit: credit.then(|| dec!(100)),
            account: account.to_string(),
            sheet: String::new(),
            kind: None,
        }
    }

    fn classifier() -> Classifier {
        Classifier::new(&AccountRegistry::default())
    }

    const CASH: &str = "055003730017";
    const CARD: &str = "038900320016";
    const EXPENSE: &str = "055003730157";

    #[test]
    fn test_card_sales_bound_to_card_account() {
        let c = classifier();
        let m = movement("CREDIT CARD SALES DEPOSIT 123", CARD, true);
        assert_eq!(c.classify(&m), ProcessKind::CardCreditSale);
        // Same text on the cash account does not classify.
        let m = movement("CREDIT CARD SALES DEPOSIT 123", CASH, true);
        assert_eq!(c.classify(&m), ProcessKind::Unknown);
    }

    #[test]
    fn test_vat_fee_precedes_base_fee() {
        let c = classifier();
        let vat = movement("VAT ON WIRE TRANSFER FEE", CASH, false);
        assert_eq!(c.classify(&vat), ProcessKind::FeeWireVat);
        let base = movement("WIRE TRANSFER FEE", CASH, false);
        assert_eq!(c.classify(&base), ProcessKind::FeeWire);
        let card_vat = movement("VAT ON DISCOUNT RATE APPLICATION", CARD, false);
        assert_eq!(c.classify(&card_vat), ProcessKind::FeeCardVat);
        let card_base = movement("DISCOUNT RATE APPLICATION", CARD, false);
        assert_eq!(c.classify(&card_base), ProcessKind::FeeCard);
    }

    #[test]
    fn test_transfer_destination_extraction() {
        let c = classifier();
        let m = movement("(WT) TRANSFER TO ACCOUNT: 038900320016", CASH, false);
        assert_eq!(c.classify(&m), ProcessKind::InternalTransferOut);
        assert_eq!(
            c.transfer_destination(&m.description),
            Some("038900320016".to_string())
        );
        let m = movement("(WT) TRANSFER RECEIVED FROM ACCOUNT 055003730017", CARD, true);
        assert_eq!(c.classify(&m), ProcessKind::InternalTransferIn);
    }

    #[test]
    fn test_check_number_extraction() {
        let c = classifier();
        let m = movement("CHECK CASHED:0001234", CASH, false);
        assert_eq!(c.classify(&m), ProcessKind::CheckCashed);
        assert_eq!(c.check_number(&m.description), Some("1234".to_string()));
    }

    #[test]
    fn test_tax_and_supplier_rules() {
        let c = classifier();
        let m = movement("(WT) SERVICE PAYMENT 88113 REFERENCED TAX PAYMENT", CASH, false);
        assert_eq!(c.classify(&m), ProcessKind::TaxFederal);
        let m = movement("STATE TREASURY OFFICE 00441", CASH, false);
        assert_eq!(c.classify(&m), ProcessKind::TaxState);
        let m = movement("(WT) SERVICE PAYMENT SOCIAL SECURITY 5521", CASH, false);
        assert_eq!(c.classify(&m), ProcessKind::TaxSocialSecurity);
        let m = movement("ACME99 SUPPLIES OUTGOING WIRE 7162", CASH, false);
        assert_eq!(c.classify(&m), ProcessKind::SupplierPayment);
        let m = movement("POS PURCHASE GAS STATION 14", EXPENSE, false);
        assert_eq!(c.classify(&m), ProcessKind::ExpenseAccountPayment);
    }

    #[test]
    fn test_unmatched_is_unknown_and_counts() {
        let c = classifier();
        let mut movements = vec![
            movement("SOMETHING ELSE ENTIRELY", CASH, true),
            movement("CASH DEPOSIT 8871", CASH, true),
        ];
        let counts = c.classify_all(&mut movements);
        assert_eq!(counts.get(&ProcessKind::Unknown), Some(&1));
        assert_eq!(counts.get(&ProcessKind::CashSale), Some(&1));
        assert_eq!(movements[1].kind, Some(ProcessKind::CashSale));
    }

    #[test]
    fn test_reordering_non_overlapping_rules_is_invariant() {
        // The cash-deposit and payroll rules never match the same text;
        // classification of either stays stable whatever their order.
        let c = classifier();
        let cash = movement("CASH DEPOSIT 100", CASH, true);
        let payroll = movement("PAYROLL DISPERSION FORTNIGHT 03", CASH, false);
        assert_eq!(c.classify(&cash), ProcessKind::CashSale);
        assert_eq!(c.classify(&payroll), ProcessKind::Payroll);
    }
}
