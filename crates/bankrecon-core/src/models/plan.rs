//! Plan primitives: the declarative bundle a processor hands to the
//! executor.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::movement::{LedgerKind, MovementKind};
use super::Folio;

/// Debit or credit side of a ledger line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntrySide {
    Debit,
    Credit,
}

impl EntrySide {
    /// Numeric code stored in the ledger table.
    pub fn code(self) -> i64 {
        match self {
            Self::Debit => 1,
            Self::Credit => 2,
        }
    }
}

/// Counterparty fields carried on supplier-facing movements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counterparty {
    pub code: String,
    pub name: String,
    /// Counterparty kind as stored in the payment tables.
    pub kind: String,
    pub tax_id: String,
}

/// One bank-movement row to insert.
///
/// `folio` and the ledger-number pointer are assigned by the executor
/// inside its transaction; a plan never carries them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementRow {
    pub bank: String,
    pub account: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub kind: MovementKind,
    /// Inflow amount (zero on expenses).
    pub inflow: Decimal,
    /// Outflow amount (zero on incomes).
    pub outflow: Decimal,
    pub description: String,
    /// Movement class, e.g. "DAILY SALE".
    pub class: String,
    /// Payment method ("Cash", "CreditCard", "DebitCard"), when any.
    pub payment_method: Option<String>,
    /// Expense channel ("TRANSFER", "CHECK", "CARD", "INTERBANK", "NA").
    pub expense_kind: String,
    pub reconciled: bool,
    pub fx_rate: Decimal,
    /// Official-gazette rate, carried on transfers only.
    pub fx_rate_dof: Option<Decimal>,
    pub ledger_kind: LedgerKind,
    /// Linked invoice reference, e.g. "D-20204".
    pub invoice_ref: Option<String>,
    /// Free-form reference, e.g. "AUTO TRANSFER".
    pub reference: Option<String>,
    /// Check number for check-cashed movements.
    pub check_number: Option<String>,
    pub counterparty: Option<Counterparty>,
}

impl Default for MovementRow {
    fn default() -> Self {
        Self {
            bank: String::new(),
            account: String::new(),
            year: 0,
            month: 0,
            day: 0,
            kind: MovementKind::GeneralIncome,
            inflow: Decimal::ZERO,
            outflow: Decimal::ZERO,
            description: String::new(),
            class: String::new(),
            payment_method: None,
            expense_kind: "NA".to_string(),
            reconciled: true,
            fx_rate: dec!(1.0000),
            fx_rate_dof: None,
            ledger_kind: LedgerKind::Journal,
            invoice_ref: None,
            reference: None,
            check_number: None,
            counterparty: None,
        }
    }
}

impl MovementRow {
    /// The movement amount regardless of direction.
    pub fn amount(&self) -> Decimal {
        if self.inflow > Decimal::ZERO {
            self.inflow
        } else {
            self.outflow
        }
    }

    /// True for inflows.
    pub fn is_inflow(&self) -> bool {
        self.inflow > Decimal::ZERO
    }

    /// Split a statement date into the year/month/day columns.
    pub fn date_fields(date: NaiveDate) -> (i32, u32, u32) {
        use chrono::Datelike;
        (date.year(), date.month(), date.day())
    }
}

/// GLOBAL vs INDIVIDUAL tag on a movement-to-invoice link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceLinkKind {
    Global,
    Individual,
}

impl InvoiceLinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "GLOBAL",
            Self::Individual => "INDIVIDUAL",
        }
    }
}

/// A movement-to-invoice link row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLinkRow {
    pub series: String,
    pub number: String,
    /// Amount applied by this movement.
    pub applied: Decimal,
    pub invoice_date: NaiveDate,
    pub kind: InvoiceLinkKind,
    /// Invoice total, informational.
    pub invoice_total: Decimal,
    /// Remaining invoice balance, normally zero.
    pub invoice_balance: Decimal,
}

/// Document type on ledger lines; transfers are tagged distinctly.
pub const DOC_TYPE_CHECKS: &str = "CHECKS";
pub const DOC_TYPE_TRANSFER: &str = "TRANSFER";

/// One line of a balanced ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerLine {
    /// 1-based position within the entry.
    pub position: u32,
    pub account: String,
    pub sub_account: String,
    pub side: EntrySide,
    pub debit: Decimal,
    pub credit: Decimal,
    pub narrative: String,
    pub doc_type: String,
}

impl LedgerLine {
    pub fn debit(
        position: u32,
        account: (&str, &str),
        amount: Decimal,
        narrative: impl Into<String>,
    ) -> Self {
        Self {
            position,
            account: account.0.to_string(),
            sub_account: account.1.to_string(),
            side: EntrySide::Debit,
            debit: amount,
            credit: Decimal::ZERO,
            narrative: narrative.into(),
            doc_type: DOC_TYPE_CHECKS.to_string(),
        }
    }

    pub fn credit(
        position: u32,
        account: (&str, &str),
        amount: Decimal,
        narrative: impl Into<String>,
    ) -> Self {
        Self {
            position,
            account: account.0.to_string(),
            sub_account: account.1.to_string(),
            side: EntrySide::Credit,
            debit: Decimal::ZERO,
            credit: amount,
            narrative: narrative.into(),
            doc_type: DOC_TYPE_CHECKS.to_string(),
        }
    }

    pub fn with_doc_type(mut self, doc_type: &str) -> Self {
        self.doc_type = doc_type.to_string();
        self
    }

    /// The line amount on whichever side it sits.
    pub fn amount(&self) -> Decimal {
        match self.side {
            EntrySide::Debit => self.debit,
            EntrySide::Credit => self.credit,
        }
    }
}

/// A self-generated purchase invoice (header + single line), used for
/// the bank-fee provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct APInvoiceRow {
    pub supplier: String,
    pub supplier_name: String,
    /// Reference in DDMMYYYY form.
    pub reference: String,
    pub date: NaiveDate,
    pub subtotal: Decimal,
    pub vat: Decimal,
    pub total: Decimal,
    /// Product key for the single detail line.
    pub product: String,
    pub product_name: String,
    pub supplier_tax_id: String,
}

/// A pending AP invoice matched by the expense-account processor; the
/// executor uses it to write the payment and its link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct APInvoiceMatch {
    pub series: String,
    pub number: i64,
    pub total: Decimal,
    pub balance: Decimal,
    pub vat: Decimal,
    pub supplier: String,
    pub supplier_name: String,
    pub supplier_kind: String,
    pub tax_id: String,
    pub invoice_ref: String,
    pub receipt_kind: String,
    pub payment_method: String,
}

/// A customer collection to create in full (AR phase A).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionRow {
    pub series: String,
    pub invoice_number: i64,
    pub customer: String,
    pub customer_name: String,
    pub amount: Decimal,
    pub vat: Decimal,
    pub excise: Decimal,
    /// Subtotal taxed at zero percent.
    pub subtotal_zero: Decimal,
    /// Subtotal taxed at sixteen percent.
    pub subtotal_sixteen: Decimal,
    pub invoice_date: NaiveDate,
    pub collection_date: NaiveDate,
    pub bank: String,
    pub account: String,
    pub salesperson: String,
}

/// Pointer to an existing movement to mark reconciled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reconciliation {
    pub folio: Folio,
    pub note: String,
}

/// An existing row that needed no action (already reconciled/paid).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlreadySettled {
    pub folio: Folio,
    pub note: String,
}

/// The declarative bundle a processor hands to the executor.
///
/// The flat `invoice_links` and `ledger_lines` lists are sliced per
/// movement via `invoices_per_movement` / `lines_per_movement`; when a
/// count is missing the executor assumes 1 invoice and 6 lines (the
/// card-sale pattern).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Family label, e.g. "CARD_SALE".
    pub kind: String,
    pub description: String,
    pub date: NaiveDate,

    pub movements: Vec<MovementRow>,
    pub invoice_links: Vec<InvoiceLinkRow>,
    pub ledger_lines: Vec<LedgerLine>,
    pub ap_invoices: Vec<APInvoiceRow>,
    pub ap_payments: Vec<APInvoiceMatch>,
    pub collections: Vec<CollectionRow>,
    pub reconciliations: Vec<Reconciliation>,
    pub already_settled: Vec<AlreadySettled>,

    pub invoices_per_movement: Vec<usize>,
    pub lines_per_movement: Vec<usize>,

    pub validations: Vec<String>,
    pub warnings: Vec<String>,
}

impl ExecutionPlan {
    pub fn new(kind: &str, description: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            kind: kind.to_string(),
            description: description.into(),
            date,
            movements: Vec::new(),
            invoice_links: Vec::new(),
            ledger_lines: Vec::new(),
            ap_invoices: Vec::new(),
            ap_payments: Vec::new(),
            collections: Vec::new(),
            reconciliations: Vec::new(),
            already_settled: Vec::new(),
            invoices_per_movement: Vec::new(),
            lines_per_movement: Vec::new(),
            validations: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Invoice links belonging to movement `i` (default 1).
    pub fn invoices_for(&self, i: usize) -> usize {
        self.invoices_per_movement.get(i).copied().unwrap_or(1)
    }

    /// Ledger lines belonging to movement `i` (default 6).
    pub fn lines_for(&self, i: usize) -> usize {
        self.lines_per_movement.get(i).copied().unwrap_or(6)
    }

    /// Total rows an execution would insert.
    pub fn insert_count(&self) -> usize {
        self.movements.len()
            + self.invoice_links.len()
            + self.ledger_lines.len()
            + self.ap_invoices.len()
            + self.collections.len()
    }

    /// Total rows an execution would update.
    pub fn update_count(&self) -> usize {
        self.reconciliations.len()
    }

    /// True when the plan carries nothing to execute.
    pub fn is_empty(&self) -> bool {
        self.insert_count() == 0 && self.update_count() == 0
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn validate_note(&mut self, msg: impl Into<String>) {
        self.validations.push(msg.into());
    }

    /// Check that each movement's ledger slice balances to the cent.
    /// Returns one message per unbalanced slice.
    pub fn unbalanced_slices(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut cursor = 0usize;
        for (i, movement) in self.movements.iter().enumerate() {
            let n = self.lines_for(i);
            let start = cursor.min(self.ledger_lines.len());
            let end = (cursor + n).min(self.ledger_lines.len());
            let slice = &self.ledger_lines[start..end];
            cursor += n;
            let debits: Decimal = slice.iter().map(|l| l.debit).sum();
            let credits: Decimal = slice.iter().map(|l| l.credit).sum();
            if debits != credits {
                problems.push(format!(
                    "movement {} ({}): debits {} != credits {}",
                    i + 1,
                    movement.description,
                    debits,
                    credits
                ));
            }
        }
        problems
    }
}
