//! Ledger-account catalog used by the plan builders.
//!
//! Account pairs are `(account, sub_account)` as stored in the ledger
//! table. The set mirrors the production chart of accounts.

/// Catalog of the ledger accounts the processors post to.
pub struct LedgerAccounts;

impl LedgerAccounts {
    // Banks
    pub const BANK_CASH: (&'static str, &'static str) = ("1120", "040000");
    pub const BANK_CARD: (&'static str, &'static str) = ("1120", "060000");
    pub const BANK_EXPENSE: (&'static str, &'static str) = ("1120", "070000");

    // Customers
    pub const CUSTOMERS_GLOBAL: (&'static str, &'static str) = ("1210", "010000");

    // VAT
    pub const VAT_COLLECTED: (&'static str, &'static str) = ("2141", "010000");
    pub const VAT_PENDING_COLLECTION: (&'static str, &'static str) = ("2146", "010000");
    pub const VAT_PENDING_PAYMENT: (&'static str, &'static str) = ("1240", "010000");
    pub const VAT_PAID: (&'static str, &'static str) = ("1246", "010000");

    // Excise
    pub const EXCISE_COLLECTED: (&'static str, &'static str) = ("2141", "020000");
    pub const EXCISE_PENDING_COLLECTION: (&'static str, &'static str) = ("2146", "020000");
    pub const EXCISE_PAID: (&'static str, &'static str) = ("1246", "020000");

    // Suppliers
    pub const SUPPLIERS_GLOBAL: (&'static str, &'static str) = ("2110", "010000");

    // Creditors
    pub const CREDITORS_CUSTOMERS: (&'static str, &'static str) = ("2120", "070000");
    pub const CREDITORS_PAYROLL: (&'static str, &'static str) = ("2120", "040000");

    // Retentions
    pub const RETENTION_SOCIAL_SECURITY: (&'static str, &'static str) = ("2140", "010000");
    pub const RETENTION_ISR: (&'static str, &'static str) = ("2140", "020000");
    pub const RETENTION_HOUSING_FUND: (&'static str, &'static str) = ("2140", "270000");

    // Federal taxes
    pub const ISR_PROVISIONAL: (&'static str, &'static str) = ("1245", "010000");
    pub const ISR_RETENTION_FEES: (&'static str, &'static str) = ("2140", "070000");
    pub const ISR_RETENTION_RENTAL: (&'static str, &'static str) = ("2140", "320000");
    pub const VAT_WITHHELD_PAID: (&'static str, &'static str) = ("2140", "290000");
    pub const VAT_IN_FAVOUR: (&'static str, &'static str) = ("1247", "010000");

    // State tax
    pub const STATE_PAYROLL_TAX: (&'static str, &'static str) = ("6200", "850000");

    // Payroll and social security expense
    pub const SALARIES_GENERIC: (&'static str, &'static str) = ("6200", "010000");
    pub const SOCIAL_SECURITY_EXPENSE: (&'static str, &'static str) = ("6200", "070000");
    pub const RETIREMENT_2PCT: (&'static str, &'static str) = ("6200", "028000");
    pub const UNEMPLOYMENT_OLD_AGE: (&'static str, &'static str) = ("6200", "360000");
    pub const HOUSING_FUND_5PCT: (&'static str, &'static str) = ("6200", "050000");

    /// Display name for an account pair, used on ledger lines whose
    /// narrative does not carry one.
    pub fn display_name(account: &str, sub_account: &str) -> &'static str {
        match (account, sub_account) {
            ("1120", "040000") => "BANK CASH ACCOUNT",
            ("1120", "060000") => "BANK CARD ACCOUNT",
            ("1120", "070000") => "BANK EXPENSE ACCOUNT",
            ("1210", "010000") => "CUSTOMERS GLOBAL",
            ("2141", "010000") => "VAT COLLECTED",
            ("2146", "010000") => "VAT PENDING COLLECTION",
            ("1240", "010000") => "VAT PENDING PAYMENT",
            ("1246", "010000") => "VAT PAID",
            ("2141", "020000") => "EXCISE COLLECTED",
            ("2146", "020000") => "EXCISE PENDING COLLECTION",
            ("1246", "020000") => "EXCISE PAID",
            ("2110", "010000") => "SUPPLIERS GLOBAL",
            ("2120", "040000") => "PAYROLL PAYABLES",
            ("2120", "070000") => "CUSTOMER CREDITORS",
            ("2140", "010000") => "SOCIAL SECURITY RETENTION",
            ("2140", "020000") => "SALARY ISR RETENTION",
            ("6200", "010000") => "SALARIES",
            ("6200", "070000") => "SOCIAL SECURITY EXPENSE",
            ("6200", "850000") => "STATE PAYROLL TAX",
            _ => "",
        }
    }
}
