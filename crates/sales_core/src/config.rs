//! Pipeline configuration
//!
//! Loaded from TOML, then overridden from `VGSALES_*` environment
//! variables. Fractions and the learning rate are fixed-point integers
//! (`250_000` = 0.25).

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::encoding::EncoderConfig;
use crate::errors::{Result, SalesCoreError};
use crate::fixed::SCALE;
use crate::serde_canon::hash_canonical_hex;

/// Full configuration of one training run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Train/test partitioning
    pub split: SplitConfig,
    /// Categorical encoding
    pub encoder: EncoderConfig,
    /// Boosted-tree hyperparameters
    pub gbdt: GbdtParams,
    /// Log output
    pub logging: LoggingConfig,
}

/// Train/test partitioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Held-out fraction (fixed-point)
    pub test_fraction: i64,
    /// Seed for the split shuffle and tree subsampling
    pub seed: i64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 250_000,
            seed: 42,
        }
    }
}

/// Boosted-tree hyperparameters (squared-error loss)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbdtParams {
    pub num_trees: usize,
    /// Shrinkage per tree (fixed-point, 50_000 = 0.05)
    pub learning_rate: i64,
    pub max_depth: usize,
    /// Nodes with fewer rows become leaves
    pub min_samples_split: usize,
    /// Neither side of a split may have fewer rows
    pub min_samples_leaf: usize,
    /// Fraction of rows sampled per tree (fixed-point)
    pub subsample: i64,
    /// Fraction of columns sampled per tree (fixed-point)
    pub colsample: i64,
    /// Bucket width for candidate split thresholds (fixed-point)
    pub quant_step: i64,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            num_trees: 300,
            learning_rate: 50_000,
            max_depth: 5,
            min_samples_split: 10,
            min_samples_leaf: 5,
            subsample: 800_000,
            colsample: 800_000,
            quant_step: 1_000,
        }
    }
}

/// Log output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
    /// `pretty` or `compact`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file; absent keys keep their defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&content)
            .map_err(|e| SalesCoreError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SalesCoreError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Apply `VGSALES_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup; unparsable values are errors
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(key: &str, raw: String) -> Result<T> {
            raw.trim()
                .parse()
                .map_err(|_| SalesCoreError::Config(format!("{key}: cannot parse `{raw}`")))
        }

        if let Some(raw) = lookup("VGSALES_SEED") {
            self.split.seed = parsed("VGSALES_SEED", raw)?;
        }
        if let Some(raw) = lookup("VGSALES_TEST_FRACTION") {
            self.split.test_fraction = parsed("VGSALES_TEST_FRACTION", raw)?;
        }
        if let Some(raw) = lookup("VGSALES_NUM_TREES") {
            self.gbdt.num_trees = parsed("VGSALES_NUM_TREES", raw)?;
        }
        if let Some(raw) = lookup("VGSALES_LEARNING_RATE") {
            self.gbdt.learning_rate = parsed("VGSALES_LEARNING_RATE", raw)?;
        }
        if let Some(raw) = lookup("VGSALES_MAX_DEPTH") {
            self.gbdt.max_depth = parsed("VGSALES_MAX_DEPTH", raw)?;
        }
        if let Some(raw) = lookup("VGSALES_SMOOTHING") {
            self.encoder.smoothing = parsed("VGSALES_SMOOTHING", raw)?;
        }
        if let Some(raw) = lookup("VGSALES_LOG_LEVEL") {
            self.logging.level = raw;
        }
        Ok(())
    }

    /// Reject impossible values; return warnings for suspicious ones
    pub fn validate(&self) -> Result<Vec<String>> {
        let fraction = |name: &str, value: i64, allow_one: bool| -> Result<()> {
            let upper_ok = if allow_one { value <= SCALE } else { value < SCALE };
            if value > 0 && upper_ok {
                Ok(())
            } else {
                Err(SalesCoreError::Config(format!(
                    "{name} must be in (0, {}{}, got {value}",
                    SCALE,
                    if allow_one { "]" } else { ")" }
                )))
            }
        };

        fraction("split.test_fraction", self.split.test_fraction, false)?;
        fraction("gbdt.subsample", self.gbdt.subsample, true)?;
        fraction("gbdt.colsample", self.gbdt.colsample, true)?;

        if self.gbdt.num_trees == 0 {
            return Err(SalesCoreError::Config("gbdt.num_trees must be positive".into()));
        }
        if self.gbdt.learning_rate <= 0 {
            return Err(SalesCoreError::Config("gbdt.learning_rate must be positive".into()));
        }
        if self.gbdt.quant_step <= 0 {
            return Err(SalesCoreError::Config("gbdt.quant_step must be positive".into()));
        }
        if self.gbdt.min_samples_leaf == 0 {
            return Err(SalesCoreError::Config("gbdt.min_samples_leaf must be positive".into()));
        }

        let mut warnings = Vec::new();
        if self.gbdt.learning_rate > SCALE {
            warnings.push("Learning rate above 1.0 will likely diverge".to_string());
        }
        if self.gbdt.max_depth == 0 {
            warnings.push("max_depth is 0, every tree is a single leaf".to_string());
        }
        if self.gbdt.min_samples_split < 2 * self.gbdt.min_samples_leaf {
            warnings.push(format!(
                "min_samples_split ({}) below 2 * min_samples_leaf ({}) has no effect",
                self.gbdt.min_samples_split,
                2 * self.gbdt.min_samples_leaf
            ));
        }
        if self.encoder.smoothing < 0 {
            warnings.push("Negative smoothing is treated as 0".to_string());
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "compact") {
            warnings.push(format!(
                "Unknown log format `{}`, using pretty",
                self.logging.format
            ));
        }

        if warnings.is_empty() {
            info!("Configuration validation passed");
        } else {
            warn!("Configuration validation warnings: {:?}", warnings);
        }
        Ok(warnings)
    }

    /// Blake3 fingerprint of everything that affects the trained model
    pub fn fingerprint(&self) -> Result<String> {
        Ok(hash_canonical_hex(&(&self.split, &self.encoder, &self.gbdt))?)
    }
}
