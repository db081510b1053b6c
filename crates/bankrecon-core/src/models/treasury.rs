//! Treasury daily-close data (side channel for the sale processors).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One individual invoice listed on a daily close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleInvoice {
    /// Invoice series (e.g. "FD").
    pub series: String,
    /// Invoice number.
    pub number: String,
    /// Invoice amount.
    pub amount: Decimal,
}

/// One day of the treasury daily-close workbook.
///
/// The close date is authoritative; the loaders fall back to the sheet
/// index as day-of-month when the cell is unreadable. The global invoice
/// absorbs whatever a deposit covers beyond the individual invoices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyClose {
    /// Sales day this close summarises.
    pub close_date: NaiveDate,
    /// Source sheet name.
    pub sheet: String,
    /// Individually issued invoices, in close order.
    #[serde(default)]
    pub invoices: Vec<SaleInvoice>,
    /// Number of the daily global invoice.
    pub global_invoice_number: Option<String>,
    /// Total of the daily global invoice.
    pub global_invoice_amount: Option<Decimal>,
    /// Daily sales total.
    pub total_sales: Option<Decimal>,
    /// Cash subtotal.
    pub total_cash: Option<Decimal>,
    /// Card subtotal.
    pub total_card: Option<Decimal>,
    /// Other payment methods subtotal.
    pub total_other: Option<Decimal>,
    /// Treasury system folio, informational.
    pub treasury_folio: Option<String>,
}

impl DailyClose {
    /// Sum of the individual invoice amounts.
    pub fn individual_total(&self) -> Decimal {
        self.invoices.iter().map(|i| i.amount).sum()
    }

    /// True when the close carries a usable card target for deposit
    /// assignment.
    pub fn has_card_target(&self) -> bool {
        self.total_card.map(|t| t > Decimal::ZERO).unwrap_or(false)
    }
}
