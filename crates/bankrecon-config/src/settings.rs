//! Runtime settings, loaded from environment variables with an optional
//! YAML settings file underneath.

use std::env;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use bankrecon_core::{ReconError, ReconResult};

use crate::accounts::AccountRegistry;

/// Constants written on every row the engine inserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyConstants {
    /// Company code.
    pub company: String,
    /// Accounting source of the engine's ledger stream.
    pub source: String,
    pub office: String,
    pub account_office: String,
    pub branch: i64,
    pub currency: String,
    /// Operator recorded in the created-by columns.
    pub operator: String,
    pub fx_rate: Decimal,
    /// Official-gazette rate stamped on transfers.
    pub fx_rate_dof: Decimal,
}

impl Default for CompanyConstants {
    fn default() -> Self {
        Self {
            company: "001".to_string(),
            source: "BANK-MVMT".to_string(),
            office: "01".to_string(),
            account_office: "01".to_string(),
            branch: 5,
            currency: "MXN".to_string(),
            operator: "AUTORECON".to_string(),
            fx_rate: dec!(1.0000),
            fx_rate_dof: dec!(20.0000),
        }
    }
}

/// Matching tolerances. All comparisons in the engine are explicit;
/// these are the only knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tolerances {
    /// Exact-sum matching (subset-sum, split, idempotency lookups).
    pub exact: Decimal,
    /// Fuzzy amount matching (payroll checks, AP invoice lookup).
    pub fuzzy: Decimal,
    /// Cross-source validation (statement vs treasury totals).
    pub validation: Decimal,
    /// Cash-deposit to daily-close matching.
    pub cash_close: Decimal,
    /// Days of slack when reconciling supplier payments.
    pub supplier_window_days: i64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            exact: dec!(0.01),
            fuzzy: dec!(0.50),
            validation: dec!(1.00),
            cash_close: dec!(2.00),
            supplier_window_days: 2,
        }
    }
}

/// Bank-fee provider constants (the fabricated purchase invoice).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeProvider {
    pub supplier: String,
    pub supplier_name: String,
    pub supplier_tax_id: String,
    pub product: String,
    pub product_name: String,
    /// VAT rate recomputed over the aggregated fee base.
    pub vat_rate: Decimal,
}

impl Default for FeeProvider {
    fn default() -> Self {
        Self {
            supplier: "001081".to_string(),
            supplier_name: "REGIONAL BANK".to_string(),
            supplier_tax_id: "BRM940216EQ6".to_string(),
            product: "001002002".to_string(),
            product_name: "TERMINAL FEE".to_string(),
            vat_rate: dec!(0.16),
        }
    }
}

/// Top-level settings for one job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path of the database file.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub registry: Option<AccountRegistry>,
    #[serde(default)]
    pub company: CompanyConstants,
    #[serde(default)]
    pub tolerances: Tolerances,
    #[serde(default)]
    pub fee_provider: FeeProvider,
}

impl Settings {
    /// Load from a YAML settings file.
    pub fn from_file(path: &Path) -> ReconResult<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&text)
            .map_err(|e| ReconError::config(format!("{}: {}", path.display(), e)))
    }

    /// Load from the environment, optionally on top of the file named by
    /// `BANKRECON_CONFIG`. Recognised variables: `BANKRECON_DB`,
    /// `BANKRECON_OPERATOR`, `BANKRECON_COMPANY`.
    pub fn from_env() -> ReconResult<Self> {
        let mut settings = match env::var_os("BANKRECON_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        if let Some(db) = env::var_os("BANKRECON_DB") {
            settings.db_path = Some(PathBuf::from(db));
        }
        if let Ok(operator) = env::var("BANKRECON_OPERATOR") {
            settings.company.operator = operator;
        }
        if let Ok(company) = env::var("BANKRECON_COMPANY") {
            settings.company.company = company;
        }
        Ok(settings)
    }

    /// The account registry, falling back to the production defaults.
    pub fn registry(&self) -> AccountRegistry {
        self.registry.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.company.source, "BANK-MVMT");
        assert_eq!(s.tolerances.exact, dec!(0.01));
        assert_eq!(s.tolerances.supplier_window_days, 2);
        assert_eq!(s.fee_provider.vat_rate, dec!(0.16));
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(
            &path,
            "db_path: /tmp/recon.db\ncompany:\n  company: \"777\"\n  source: BANK-MVMT\n  office: \"01\"\n  account_office: \"01\"\n  branch: 5\n  currency: MXN\n  operator: TESTOP\n  fx_rate: \"1.0000\"\n  fx_rate_dof: \"20.0000\"\n",
        )
        .unwrap();
        let s = Settings::from_file(&path).unwrap();
        assert_eq!(s.company.company, "777");
        assert_eq!(s.company.operator, "TESTOP");
        assert_eq!(s.db_path.unwrap(), PathBuf::from("/tmp/recon.db"));
    }
}
