//! Video-game sales trainer
//!
//! Loads the sales table, trains a deterministic boosted-tree regressor
//! on encoded features and reports held-out RMSE and per-feature
//! importance. Reproducible for a fixed seed and configuration.

pub mod cart;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod pipeline;
pub mod trainer;

use std::path::Path;
use vgsales_core::PipelineConfig;

pub use dataset::{train_test_split, Dataset, DatasetFilter};
pub use deterministic::{LcgRng, SplitTieBreaker};
pub use errors::{Result, TrainerError};
pub use pipeline::{FittedPipeline, PipelineReport, SalesPipeline};
pub use trainer::{FeatureImportance, GbdtTrainer, SalesRegressor};

/// Load a CSV, apply `filter` and fit the full pipeline.
pub fn train_from_csv(
    path: &Path,
    filter: &DatasetFilter,
    config: PipelineConfig,
) -> Result<FittedPipeline> {
    let dataset = Dataset::from_csv(path)?.filtered(filter);
    SalesPipeline::new(config).fit(&dataset)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
