//! Error types for the reconciliation engine.

use thiserror::Error;

/// Main error type for reconciliation operations.
#[derive(Error, Debug)]
pub enum ReconError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Plan construction error
    #[error("Plan error: {0}")]
    PlanError(String),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Side-channel data is missing or unusable
    #[error("Missing data: {0}")]
    MissingData(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ReconError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a plan construction error.
    pub fn plan(msg: impl Into<String>) -> Self {
        Self::PlanError(msg.into())
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::DatabaseError(msg.into())
    }

    /// Create a missing-data error.
    pub fn missing_data(msg: impl Into<String>) -> Self {
        Self::MissingData(msg.into())
    }

    /// Check if this error leaves the job able to continue with the
    /// next plan (per-plan isolation).
    pub fn is_plan_local(&self) -> bool {
        matches!(
            self,
            Self::PlanError(_) | Self::ValidationError(_) | Self::MissingData(_)
        )
    }
}

/// Result type alias for reconciliation operations.
pub type ReconResult<T> = Result<T, ReconError>;
