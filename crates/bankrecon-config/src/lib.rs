//! # bankrecon-config
//!
//! Static configuration for the reconciliation engine: the bank-account
//! registry, the ledger-account catalog and runtime settings. Everything
//! here is read-only after startup and safe to share across plans.

pub mod accounts;
pub mod ledger;
pub mod settings;

pub use accounts::*;
pub use ledger::*;
pub use settings::*;
