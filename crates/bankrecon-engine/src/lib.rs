//! # bankrecon-engine
//!
//! The reconciliation engine: the pipeline from classified bank-statement
//! lines to a committed, balanced, idempotent, multi-table transactional
//! write.
//!
//! - [`classify`]: regex-plus-account-routing rule table
//! - [`processors`]: one plan builder per transaction family
//! - [`assign`]: multi-day card-deposit to daily-close assignment
//! - [`dispatch`]: the per-day dispatcher and job driver
//! - [`execute`]: the transactional plan executor
//! - [`validate`]: cross-source consistency checks (warnings only)

pub mod assign;
pub mod classify;
pub mod dispatch;
pub mod execute;
pub mod processors;
pub mod render;
pub mod validate;

pub use classify::Classifier;
pub use dispatch::{Job, RunOptions, SideChannels};
pub use execute::Executor;
