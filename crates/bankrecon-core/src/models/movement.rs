//! Bank-statement movements and their classification labels.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Transaction family assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessKind {
    /// Credit-card sales deposit on the card account.
    CardCreditSale,
    /// Debit-card sales deposit on the card account.
    CardDebitSale,
    /// Cash sales deposit on the cash account.
    CashSale,
    /// Outgoing transfer between own accounts.
    InternalTransferOut,
    /// Incoming leg of a transfer between own accounts.
    InternalTransferIn,
    /// Wire-transfer fee.
    FeeWire,
    /// VAT charged on a wire-transfer fee.
    FeeWireVat,
    /// Card discount-rate fee.
    FeeCard,
    /// VAT charged on a card discount-rate fee.
    FeeCardVat,
    /// Payroll dispersion.
    Payroll,
    /// A payroll check cashed at the teller.
    CheckCashed,
    /// Wire payment to a supplier (reconcile-only).
    SupplierPayment,
    /// Card payment from the expense account (creates the movement).
    ExpenseAccountPayment,
    /// Incoming customer payment.
    CustomerCollection,
    /// Federal tax payment (referenced payment).
    TaxFederal,
    /// State payroll-tax payment.
    TaxState,
    /// Social-security contribution payment.
    TaxSocialSecurity,
    /// No rule matched.
    Unknown,
}

impl ProcessKind {
    /// Kinds that the bank-fee processor collapses into one movement.
    pub fn is_fee(self) -> bool {
        matches!(
            self,
            Self::FeeWire | Self::FeeWireVat | Self::FeeCard | Self::FeeCardVat
        )
    }

    /// Kinds that carry the fee base amount (as opposed to its VAT).
    pub fn is_fee_base(self) -> bool {
        matches!(self, Self::FeeWire | Self::FeeCard)
    }

    /// Card-sale kinds (credit and debit route to the same processor).
    pub fn is_card_sale(self) -> bool {
        matches!(self, Self::CardCreditSale | Self::CardDebitSale)
    }

    /// Tax kinds (federal, state and social security share a processor).
    pub fn is_tax(self) -> bool {
        matches!(
            self,
            Self::TaxFederal | Self::TaxState | Self::TaxSocialSecurity
        )
    }
}

/// Terminal outcome recorded for each statement line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// New rows were written for this line.
    Insert,
    /// An existing row was marked reconciled.
    Reconcile,
    /// Nothing to do (already registered, auto-generated, month edge).
    Skip,
    /// Could not be processed yet (missing data, pending day).
    NotProcessed,
    /// Needs a human decision.
    NeedsReview,
    /// The plan failed and was rolled back.
    Error,
    /// The line was never classified.
    Unknown,
}

/// Movement kind in the legacy movement table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementKind {
    /// Plain income (kind 1).
    GeneralIncome,
    /// Manual expense without invoice (kind 2).
    ManualExpense,
    /// Expense backed by a purchase invoice (kind 3).
    InvoicedExpense,
    /// Daily-sale income (kind 4).
    SaleIncome,
}

impl MovementKind {
    /// Numeric code stored in the movement table.
    pub fn code(self) -> i64 {
        match self {
            Self::GeneralIncome => 1,
            Self::ManualExpense => 2,
            Self::InvoicedExpense => 3,
            Self::SaleIncome => 4,
        }
    }
}

/// Ledger-entry kind attached to a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerKind {
    Income,
    Expense,
    Journal,
}

impl LedgerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
            Self::Journal => "JOURNAL",
        }
    }
}

/// One parsed row of the bank statement.
///
/// Exactly one of `debit` / `credit` is nonzero. The classifier attaches
/// `kind`; everything else is immutable input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankMovement {
    /// Statement date.
    pub date: NaiveDate,
    /// Free-text description after mojibake normalization.
    pub description: String,
    /// Outflow amount (None on credits).
    pub debit: Option<Decimal>,
    /// Inflow amount (None on debits).
    pub credit: Option<Decimal>,
    /// Bank-account number, key into the account registry.
    pub account: String,
    /// Source sheet of the statement workbook.
    pub sheet: String,
    /// Assigned by the classifier.
    #[serde(default)]
    pub kind: Option<ProcessKind>,
}

impl BankMovement {
    /// The movement amount, always positive.
    pub fn amount(&self) -> Decimal {
        if let Some(credit) = self.credit {
            if credit > Decimal::ZERO {
                return credit;
            }
        }
        if let Some(debit) = self.debit {
            if debit > Decimal::ZERO {
                return debit;
            }
        }
        Decimal::ZERO
    }

    /// True for inflows.
    pub fn is_credit(&self) -> bool {
        self.credit.map(|c| c > Decimal::ZERO).unwrap_or(false)
    }

    /// True for outflows.
    pub fn is_debit(&self) -> bool {
        self.debit.map(|d| d > Decimal::ZERO).unwrap_or(false)
    }

    /// Classified kind, `Unknown` when the classifier found no rule.
    pub fn kind_or_unknown(&self) -> ProcessKind {
        self.kind.unwrap_or(ProcessKind::Unknown)
    }
}
