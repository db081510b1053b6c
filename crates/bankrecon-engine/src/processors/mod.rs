//! Plan builders, one module per transaction family.
//!
//! Every builder follows the same contract: it takes the day's
//! movements of one family plus the side-channel data it needs, may
//! read (never write) the database, and returns a declarative
//! [`ExecutionPlan`](bankrecon_core::ExecutionPlan) carrying
//! validations, warnings and the rows to write.

pub mod adjustment;
pub mod bank_fee;
pub mod card_sale;
pub mod cash_sale;
pub mod collection;
pub mod expense_payment;
pub mod payroll;
pub mod supplier_payment;
pub mod taxes;
pub mod transfer;
