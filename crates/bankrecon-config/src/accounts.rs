//! Bank-account registry.

use serde::{Deserialize, Serialize};

/// Role a bank account plays in the reconciliation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountRole {
    /// Receives cash-sale deposits; source of most expense movements.
    Cash,
    /// Receives card-sale deposits and card fees.
    Card,
    /// Card-based supplier payments are drawn from here.
    Expense,
    /// Pseudo-account for till transfers; not a statement sheet.
    PettyCash,
}

/// One bank account known to the ERP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankAccount {
    /// Institution name as stored in the movement table.
    pub bank: String,
    /// Account number, the registry key.
    pub number: String,
    /// Ledger account the balance posts to.
    pub ledger_account: String,
    /// Ledger sub-account.
    pub ledger_sub_account: String,
    /// Display name.
    pub name: String,
    pub role: AccountRole,
}

impl BankAccount {
    /// Ledger account pair for plan construction.
    pub fn ledger_pair(&self) -> (&str, &str) {
        (&self.ledger_account, &self.ledger_sub_account)
    }
}

/// Registry of the active bank accounts, keyed by account number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRegistry {
    pub accounts: Vec<BankAccount>,
}

impl Default for AccountRegistry {
    /// The production account set.
    fn default() -> Self {
        Self {
            accounts: vec![
                BankAccount {
                    bank: "BANREGIO".to_string(),
                    number: "055003730017".to_string(),
                    ledger_account: "1120".to_string(),
                    ledger_sub_account: "040000".to_string(),
                    name: "BANREGIO F (CASH)".to_string(),
                    role: AccountRole::Cash,
                },
                BankAccount {
                    bank: "BANREGIO".to_string(),
                    number: "038900320016".to_string(),
                    ledger_account: "1120".to_string(),
                    ledger_sub_account: "060000".to_string(),
                    name: "BANREGIO T (CARD)".to_string(),
                    role: AccountRole::Card,
                },
                BankAccount {
                    bank: "BANREGIO".to_string(),
                    number: "055003730157".to_string(),
                    ledger_account: "1120".to_string(),
                    ledger_sub_account: "070000".to_string(),
                    name: "BANREGIO EXPENSES".to_string(),
                    role: AccountRole::Expense,
                },
                BankAccount {
                    bank: "PETTY CASH".to_string(),
                    number: "PETTY-CASH".to_string(),
                    ledger_account: "1110".to_string(),
                    ledger_sub_account: "010000".to_string(),
                    name: "PETTY CASH".to_string(),
                    role: AccountRole::PettyCash,
                },
            ],
        }
    }
}

impl AccountRegistry {
    /// Look up an account by its exact number.
    pub fn by_number(&self, number: &str) -> Option<&BankAccount> {
        self.accounts.iter().find(|a| a.number == number)
    }

    /// The first account with the given role.
    pub fn by_role(&self, role: AccountRole) -> Option<&BankAccount> {
        self.accounts.iter().find(|a| a.role == role)
    }

    /// Resolve a number or an 18-digit CLABE embedding one of the known
    /// account numbers. Returns the input unchanged when nothing matches.
    pub fn resolve(&self, number: &str) -> String {
        if self.by_number(number).is_some() {
            return number.to_string();
        }
        for account in &self.accounts {
            if !account.number.is_empty() && number.contains(&account.number) {
                return account.number.clone();
            }
        }
        number.to_string()
    }

    pub fn cash(&self) -> &BankAccount {
        self.by_role(AccountRole::Cash)
            .expect("registry has a cash account")
    }

    pub fn card(&self) -> &BankAccount {
        self.by_role(AccountRole::Card)
            .expect("registry has a card account")
    }

    pub fn expense(&self) -> &BankAccount {
        self.by_role(AccountRole::Expense)
            .expect("registry has an expense account")
    }

    pub fn petty_cash(&self) -> &BankAccount {
        self.by_role(AccountRole::PettyCash)
            .expect("registry has a petty-cash account")
    }
}
