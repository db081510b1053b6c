//! Database error type.

use bankrecon_core::ReconError;
use thiserror::Error;

/// Errors raised by the gateway.
#[derive(Error, Debug)]
pub enum DbError {
    /// Underlying SQL error.
    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// A stored money value could not be parsed back into a decimal.
    #[error("Bad decimal value in column {column}: {value}")]
    BadDecimal { column: String, value: String },

    /// No connection candidate succeeded.
    #[error("Could not open database {path}: {detail}")]
    Connect { path: String, detail: String },
}

impl From<DbError> for ReconError {
    fn from(err: DbError) -> Self {
        ReconError::DatabaseError(err.to_string())
    }
}

/// Result type alias for gateway operations.
pub type DbResult<T> = Result<T, DbError>;
