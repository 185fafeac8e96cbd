//! Error types for the sales core

use thiserror::Error;

/// Errors raised while encoding features, validating models or loading configuration
#[derive(Error, Debug)]
pub enum SalesCoreError {
    /// A row lacks a column the encoder requires
    #[error("Schema mismatch: row {row} is missing required column `{column}`")]
    SchemaMismatch { column: &'static str, row: usize },

    /// Transform or predict invoked before the encoder was fitted
    #[error("Not fitted: {0}")]
    NotFitted(&'static str),

    /// Filtering and dropna left nothing to train on
    #[error("Empty training set: {usable_rows} usable rows out of {total_rows}")]
    EmptyTrainingSet { total_rows: usize, usable_rows: usize },

    /// Vector lengths disagree with the frozen column contract
    #[error("Feature size mismatch: expected {expected}, got {actual}")]
    FeatureSizeMismatch { expected: usize, actual: usize },

    /// Invalid parameters or call sequence
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Model structure failed validation
    #[error("Model validation failed: {0}")]
    ValidationFailed(String),

    /// Configuration could not be parsed or is out of range
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Canonical JSON encoding failed
    #[error("Canonical serialization error: {0}")]
    Canonical(#[from] crate::serde_canon::CanonicalError),
}

/// Result type for sales core operations
pub type Result<T> = std::result::Result<T, SalesCoreError>;
