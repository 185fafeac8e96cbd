use thiserror::Error;
use vgsales_core::SalesCoreError;

/// Errors returned by the dataset loader, trainer and pipeline.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("training error: {0}")]
    Training(String),

    #[error(transparent)]
    Core(#[from] SalesCoreError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for trainer operations
pub type Result<T> = std::result::Result<T, TrainerError>;
