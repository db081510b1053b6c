//! Parsed tax filings (side channel for the tax processor).
//!
//! Each carries a `full_confidence` flag set by the PDF loaders; the
//! processor generates movements only when it is true.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// VAT retained from one supplier, listed on the federal filing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VatRetention {
    /// Supplier key in the ERP.
    pub supplier: String,
    /// Supplier display name.
    pub name: String,
    pub amount: Decimal,
}

/// Monthly federal filing, split into two returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederalTax {
    /// Period label, e.g. "JANUARY 2026".
    pub period: String,

    // First return: retentions + excise.
    /// ISR retained on professional fees.
    pub isr_retention_fees: Decimal,
    /// ISR retained on rentals.
    pub isr_retention_rental: Decimal,
    /// Excise amount payable (capture line).
    pub excise_net: Decimal,
    /// Gross excise collected.
    pub excise_gross: Decimal,
    /// Creditable excise (gross - net).
    pub excise_creditable: Decimal,
    /// Total of the first return.
    pub first_return_total: Decimal,

    // Second return: income tax + VAT.
    /// Provisional corporate income tax.
    pub corporate_isr: Decimal,
    /// ISR retained on salaries.
    pub salary_isr_retention: Decimal,
    /// Gross VAT collected.
    pub vat_collected: Decimal,
    /// Creditable VAT.
    pub vat_creditable: Decimal,
    /// VAT balance in favour (creditable - collected, when positive).
    pub vat_in_favour: Decimal,
    /// Per-supplier VAT retentions.
    #[serde(default)]
    pub vat_retentions: Vec<VatRetention>,
    /// Total of the second return.
    pub second_return_total: Decimal,

    /// True only when every figure was read unambiguously.
    #[serde(default)]
    pub full_confidence: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl FederalTax {
    /// Amount of the principal second-return payment.
    pub fn second_return_principal(&self) -> Decimal {
        self.corporate_isr + self.salary_isr_retention
    }
}

/// State payroll-tax payment slip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTax {
    pub period: String,
    pub amount: Decimal,
    #[serde(default)]
    pub full_confidence: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Social-security settlement summary.
///
/// Bimonthly filings include the housing fund; monthly ones do not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialSecurityTax {
    pub period: String,
    /// Total payable on the slip.
    pub total_due: Decimal,
    /// Social-security portion (retention + employer expense).
    pub ss_total: Decimal,
    /// 2 % retirement contribution.
    pub retirement: Decimal,
    /// Unemployment and old-age contribution.
    pub unemployment_old_age: Decimal,
    /// Housing-fund 5 %, the sum of the two slip sub-totals.
    pub housing_fund: Decimal,
    /// Housing-fund loan amortization retained from employees.
    pub housing_amortization: Decimal,
    /// True on bimonthly filings.
    #[serde(default)]
    pub includes_housing_fund: bool,
    #[serde(default)]
    pub full_confidence: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
}
