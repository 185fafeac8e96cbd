//! Video-game sales prediction core
//!
//! Deterministic, fixed-point pieces shared by training and inference:
//!
//! - `record`: game records and the logical columns the model reads
//! - `encoding`: target + one-hot encoding with a frozen column contract
//! - `gbdt`: integer-only boosted regression trees
//! - `inference`: single-row prediction against a fitted encoder and model
//! - `verdict`: HIT / near-HIT / not HIT banding
//! - `config`: pipeline configuration (TOML + environment)
//! - `serde_canon`: canonical JSON and blake3 fingerprints

pub mod config;
pub mod encoding;
pub mod errors;
pub mod fixed;
pub mod gbdt;
pub mod inference;
pub mod record;
pub mod serde_canon;
pub mod verdict;

pub use config::{GbdtParams, LoggingConfig, PipelineConfig, SplitConfig};
pub use encoding::{
    ColumnKind, EncoderConfig, FeatureEncoder, FeatureMatrix, FeatureSchema, SchemaColumn,
};
pub use errors::{Result, SalesCoreError};
pub use fixed::{from_fixed, to_fixed, SCALE};
pub use gbdt::{Model, Node, Tree};
pub use inference::{Prediction, SalesPredictor};
pub use record::{CategoricalColumn, GameFeatures, GameRecord, NumericColumn};
pub use verdict::Verdict;

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
