//! End-to-end training run: dropna, split, encode, boost, evaluate
//!
//! Every call retrains from scratch; nothing is cached between runs.

use serde::Serialize;
use std::time::Instant;
use tracing::{info, instrument, warn};

use vgsales_core::{
    to_fixed, FeatureEncoder, GameFeatures, GameRecord, PipelineConfig, Prediction,
    SalesCoreError, SalesPredictor,
};

use crate::dataset::{train_test_split, Dataset};
use crate::errors::Result;
use crate::trainer::{FeatureImportance, SalesRegressor};

/// Metrics and provenance of one training run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    /// Held-out RMSE, millions of units
    pub rmse: f64,
    pub feature_importances: Vec<FeatureImportance>,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Encoded column contract the model was trained on
    pub columns: Vec<String>,
    /// Blake3 of the canonical model JSON
    pub model_hash: String,
    /// Blake3 of the canonical training configuration
    pub config_fingerprint: String,
}

/// A trained predictor together with the report of the run that produced it
#[derive(Debug, Clone)]
pub struct FittedPipeline {
    pub predictor: SalesPredictor,
    pub report: PipelineReport,
}

impl FittedPipeline {
    /// Predicted global sales (millions) for one raw row
    pub fn predict_one(&self, row: &GameFeatures) -> Result<f64> {
        Ok(self.predictor.predict_one(row)?)
    }

    /// Prediction with its HIT / near-HIT / not HIT verdict
    pub fn assess(&self, row: &GameFeatures) -> Result<Prediction> {
        Ok(self.predictor.assess(row)?)
    }
}

/// Training pipeline over a loaded dataset
#[derive(Debug, Clone, Default)]
pub struct SalesPipeline {
    config: PipelineConfig,
}

impl SalesPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Train on the complete records of `dataset` and evaluate on a held-out split
    #[instrument(skip_all, fields(rows = dataset.len()))]
    pub fn fit(&self, dataset: &Dataset) -> Result<FittedPipeline> {
        let started = Instant::now();
        for warning in self.config.validate()? {
            warn!("{warning}");
        }

        let complete = dataset.complete_records();
        if complete.is_empty() {
            return Err(SalesCoreError::EmptyTrainingSet {
                total_rows: dataset.len(),
                usable_rows: 0,
            }
            .into());
        }

        let split = &self.config.split;
        let (train_idx, test_idx) = train_test_split(complete.len(), split.test_fraction, split.seed);
        if train_idx.is_empty() {
            return Err(SalesCoreError::EmptyTrainingSet {
                total_rows: dataset.len(),
                usable_rows: complete.len(),
            }
            .into());
        }
        info!(
            usable = complete.len(),
            dropped = dataset.len() - complete.len(),
            train = train_idx.len(),
            test = test_idx.len(),
            "dataset split"
        );

        let (train_rows, train_targets) = partition(&complete, &train_idx);
        let (test_rows, test_targets) = partition(&complete, &test_idx);

        let mut encoder = FeatureEncoder::new(self.config.encoder.clone());
        let train_matrix = encoder.fit_transform(&train_rows, &train_targets)?;
        let test_matrix = encoder.transform(&test_rows)?;
        let columns = train_matrix.columns.clone();

        let mut regressor = SalesRegressor::new(encoder.schema()?.clone(), self.config.gbdt.clone());
        regressor.fit(&train_matrix, &train_targets, split.seed)?;
        let rmse = regressor.evaluate(&test_matrix, &test_targets)?;
        let feature_importances = regressor.feature_importances()?;

        let model = regressor.into_model()?;
        let model_hash = model.hash_hex()?;
        let predictor = SalesPredictor::new(encoder, model)?;

        let report = PipelineReport {
            rmse,
            feature_importances,
            train_rows: train_idx.len(),
            test_rows: test_idx.len(),
            columns,
            model_hash,
            config_fingerprint: self.config.fingerprint()?,
        };
        info!(
            rmse = report.rmse,
            model_hash = %report.model_hash,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline fitted"
        );

        Ok(FittedPipeline { predictor, report })
    }
}

/// Feature rows and fixed-point targets for the selected records
fn partition(records: &[&GameRecord], indices: &[usize]) -> (Vec<GameFeatures>, Vec<i64>) {
    indices
        .iter()
        .filter_map(|&i| records.get(i))
        .map(|r| (r.features.clone(), to_fixed(r.global_sales.unwrap_or(0.0))))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TrainerError;

    fn record(publisher: &str, genre: &str, critic: f64, sales: f64) -> GameRecord {
        let features = GameFeatures {
            platform: Some("PS4".into()),
            publisher: Some(publisher.into()),
            developer: Some(format!("{publisher} Studio")),
            genre: Some(genre.into()),
            rating: Some("T".into()),
            critic_score: Some(critic),
            critic_count: Some(40.0),
            user_score: Some(7.5),
            user_count: Some(300.0),
            year_of_release: Some(2016),
        };
        GameRecord::new(Some(format!("{publisher} {genre} {critic}")), features, Some(sales))
    }

    fn small_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.gbdt.num_trees = 20;
        config.gbdt.min_samples_split = 4;
        config.gbdt.min_samples_leaf = 2;
        config
    }

    #[test]
    fn test_no_complete_rows() {
        let mut incomplete = record("Sega", "Action", 70.0, 1.0);
        incomplete.features.user_score = None;
        let dataset = Dataset::from_records(vec![incomplete]);

        let err = SalesPipeline::new(small_config()).fit(&dataset).unwrap_err();
        assert!(matches!(
            err,
            TrainerError::Core(SalesCoreError::EmptyTrainingSet {
                total_rows: 1,
                usable_rows: 0
            })
        ));
    }

    #[test]
    fn test_single_row_leaves_empty_training_partition() {
        let dataset = Dataset::from_records(vec![record("Sega", "Action", 70.0, 1.0)]);
        let err = SalesPipeline::new(small_config()).fit(&dataset).unwrap_err();
        assert!(matches!(
            err,
            TrainerError::Core(SalesCoreError::EmptyTrainingSet {
                total_rows: 1,
                usable_rows: 1
            })
        ));
    }

    #[test]
    fn test_fit_reports_split_and_contract() {
        let records: Vec<GameRecord> = (0..40)
            .map(|i| {
                let publisher = if i % 2 == 0 { "Nintendo" } else { "Sega" };
                let genre = if i % 4 < 2 { "Action" } else { "Sports" };
                record(publisher, genre, 50.0 + i as f64, 0.2 + i as f64 * 0.05)
            })
            .collect();
        let dataset = Dataset::from_records(records);

        let fitted = SalesPipeline::new(small_config()).fit(&dataset).unwrap();
        assert_eq!(fitted.report.test_rows, 10);
        assert_eq!(fitted.report.train_rows, 30);
        assert_eq!(fitted.report.columns[0], "Platform_enc");
        assert!(fitted.report.rmse.is_finite());
        assert_eq!(fitted.report.model_hash.len(), 64);

        let prediction = fitted.assess(&dataset.records[0].features).unwrap();
        assert!(prediction.sales >= 0.0);
    }
}
