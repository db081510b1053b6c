//! # bankrecon-core
//!
//! Core domain models for bank-statement reconciliation against a legacy
//! ERP schema.
//!
//! This crate provides the foundational types used throughout the
//! reconciliation engine:
//! - Bank-statement movements and their classification labels
//! - Treasury daily closes, payroll and tax side-channel data
//! - Plan primitives (movement rows, invoice links, ledger lines)
//! - The declarative `ExecutionPlan` consumed by the plan executor
//! - Per-line results and execution outcomes

pub mod error;
pub mod models;

pub use error::*;
pub use models::*;
