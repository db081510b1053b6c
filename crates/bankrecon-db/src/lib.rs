//! # bankrecon-db
//!
//! Thin, typed gateway over the legacy ERP schema: monotonic folio and
//! ledger-number sequences, movement inserts and reconciliation lookups,
//! invoice links, ledger lines, the AP/AR side tables, and the read-only
//! reference queries the processors need.
//!
//! Every statement is parameterised. All money columns are stored as
//! canonical two-decimal strings and re-parsed into `Decimal`: never
//! floats. Sequence reads happen inside the caller's write transaction,
//! which serialises concurrent minting (the embedded engine's equivalent
//! of a row-range lock held to commit).

pub mod ap;
pub mod ar;
pub mod connection;
pub mod error;
pub mod ledger;
pub mod links;
pub mod movements;
pub mod queries;
pub mod schema;
pub mod sequences;
pub mod value;

pub use connection::*;
pub use error::*;
