//! Domain models for bank-statement reconciliation.
//!
//! - Statement input (`BankMovement`, `ProcessKind`, `Action`)
//! - Side-channel data (treasury closes, payroll, tax filings)
//! - Plan primitives (`MovementRow`, `InvoiceLinkRow`, `LedgerLine`,
//!   `APInvoiceRow`, `ExecutionPlan`)
//! - Per-line results (`LineResult`, `ExecutionOutcome`)

mod movement;
mod payroll;
mod plan;
mod result;
mod taxes;
mod treasury;

pub use movement::*;
pub use payroll::*;
pub use plan::*;
pub use result::*;
pub use taxes::*;
pub use treasury::*;

/// Primary key of the movement table, minted at insert time.
pub type Folio = i64;

/// Primary key of a balanced ledger entry within one accounting source.
pub type LedgerNumber = i64;
