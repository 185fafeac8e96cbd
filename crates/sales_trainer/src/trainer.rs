//! Gradient Boosted Decision Tree (GBDT) trainer
//!
//! Deterministic squared-error boosting with fixed-point arithmetic and
//! exact-greedy CART splits, plus the sales regressor that evaluates the
//! ensemble and attributes importance to original feature names.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, instrument};

use vgsales_core::{
    CategoricalColumn, FeatureMatrix, FeatureSchema, GbdtParams, Model, NumericColumn,
    SalesCoreError, Tree, SCALE,
};

use crate::cart::{CartBuilder, TreeConfig};
use crate::deterministic::LcgRng;
use crate::errors::{Result, TrainerError};

/// GBDT trainer
pub struct GbdtTrainer {
    params: GbdtParams,
    seed: i64,
}

impl GbdtTrainer {
    pub fn new(params: GbdtParams, seed: i64) -> Self {
        Self { params, seed }
    }

    /// Train a model on encoded rows and fixed-point targets
    #[instrument(skip_all, fields(rows = features.len(), trees = self.params.num_trees))]
    pub fn train(&self, features: &[Vec<i64>], targets: &[i64]) -> Result<Model> {
        if features.is_empty() {
            return Err(SalesCoreError::EmptyTrainingSet {
                total_rows: 0,
                usable_rows: 0,
            }
            .into());
        }
        if features.len() != targets.len() {
            return Err(SalesCoreError::FeatureSizeMismatch {
                expected: features.len(),
                actual: targets.len(),
            }
            .into());
        }
        if self.params.learning_rate <= 0 {
            return Err(TrainerError::Training("learning_rate must be positive".into()));
        }

        let started = Instant::now();
        let n_samples = features.len();
        let feature_count = features[0].len();

        let bias = Self::calculate_bias(targets);
        let mut predictions = vec![bias; n_samples];
        let mut rng = LcgRng::new(self.seed);

        let tree_config = TreeConfig {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            quant_step: self.params.quant_step,
        };

        let mut trees = Vec::with_capacity(self.params.num_trees);
        for tree_idx in 0..self.params.num_trees {
            let gradients = Self::calculate_gradients(targets, &predictions);
            let rows = self.sample_rows(&mut rng, n_samples);
            let columns = self.sample_columns(&mut rng, feature_count);

            let tree = CartBuilder::new(features, &gradients, tree_config.clone())?
                .with_features(columns)
                .build(&rows, self.params.learning_rate);

            Self::update_predictions(&tree, features, &mut predictions);
            debug!(
                tree = tree_idx + 1,
                nodes = tree.nodes.len(),
                sampled_rows = rows.len(),
                "tree built"
            );
            trees.push(tree);
        }

        let model = Model::new(trees, bias, feature_count);
        model.validate()?;
        info!(
            trees = model.num_trees(),
            bias,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "training complete"
        );
        Ok(model)
    }

    /// Initial prediction: mean of the targets
    fn calculate_bias(targets: &[i64]) -> i64 {
        if targets.is_empty() {
            return 0;
        }
        let sum: i128 = targets.iter().map(|&t| i128::from(t)).sum();
        (sum / targets.len() as i128) as i64
    }

    /// Squared-error gradients: prediction - target
    fn calculate_gradients(targets: &[i64], predictions: &[i64]) -> Vec<i64> {
        predictions
            .iter()
            .zip(targets)
            .map(|(&p, &t)| p.saturating_sub(t))
            .collect()
    }

    /// Per-tree row bag; falls back to every row when the bag is too small to split
    fn sample_rows(&self, rng: &mut LcgRng, n: usize) -> Vec<usize> {
        let rows: Vec<usize> = (0..n).filter(|_| rng.bernoulli(self.params.subsample)).collect();
        if rows.len() < 2 {
            (0..n).collect()
        } else {
            rows
        }
    }

    /// Per-tree column subset; never empty when there are columns
    fn sample_columns(&self, rng: &mut LcgRng, width: usize) -> Vec<usize> {
        let columns: Vec<usize> = (0..width)
            .filter(|_| rng.bernoulli(self.params.colsample))
            .collect();
        if columns.is_empty() && width > 0 {
            vec![rng.next_range(width as i64) as usize]
        } else {
            columns
        }
    }

    fn update_predictions(tree: &Tree, features: &[Vec<i64>], predictions: &mut [i64]) {
        for (pred, row) in predictions.iter_mut().zip(features) {
            *pred = pred.saturating_add(tree.contribution(row));
        }
    }
}

/// Importance of one original (pre-encoding) feature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    /// Summed split gain of every encoded column derived from `feature`
    pub gain: i64,
    /// Share of the total gain, in `[0, 1]`
    pub importance: f64,
}

/// Boosted-tree sales regressor bound to a frozen column contract
#[derive(Debug, Clone)]
pub struct SalesRegressor {
    schema: FeatureSchema,
    params: GbdtParams,
    model: Option<Model>,
}

impl SalesRegressor {
    pub fn new(schema: FeatureSchema, params: GbdtParams) -> Self {
        Self {
            schema,
            params,
            model: None,
        }
    }

    /// Train on an encoded matrix; its columns must match the contract exactly
    pub fn fit(&mut self, matrix: &FeatureMatrix, targets: &[i64], seed: i64) -> Result<()> {
        self.check_columns(matrix)?;
        let model = GbdtTrainer::new(self.params.clone(), seed).train(&matrix.rows, targets)?;
        self.model = Some(model);
        Ok(())
    }

    /// Fixed-point prediction for one encoded row, clamped at zero
    pub fn predict(&self, row: &[i64]) -> Result<i64> {
        let model = self.fitted()?;
        if row.len() != model.feature_count {
            return Err(SalesCoreError::FeatureSizeMismatch {
                expected: model.feature_count,
                actual: row.len(),
            }
            .into());
        }
        Ok(model.score(row).max(0))
    }

    /// Root-mean-squared error in millions of units
    #[instrument(skip_all, fields(rows = matrix.len()))]
    pub fn evaluate(&self, matrix: &FeatureMatrix, targets: &[i64]) -> Result<f64> {
        self.check_columns(matrix)?;
        if matrix.is_empty() {
            return Err(TrainerError::Training(
                "cannot evaluate on an empty set".into(),
            ));
        }
        if matrix.len() != targets.len() {
            return Err(SalesCoreError::FeatureSizeMismatch {
                expected: matrix.len(),
                actual: targets.len(),
            }
            .into());
        }

        let mut sse: i128 = 0;
        for (row, &target) in matrix.rows.iter().zip(targets) {
            let err = i128::from(self.predict(row)?) - i128::from(target);
            sse += err * err;
        }
        let rmse = (sse as f64 / matrix.len() as f64).sqrt() / SCALE as f64;
        info!(rmse, "evaluation complete");
        Ok(rmse)
    }

    /// Raw split gain per encoded column, in contract order
    pub fn column_importances(&self) -> Result<Vec<(String, i64)>> {
        let gains = self.fitted()?.split_gains();
        Ok(self
            .schema
            .columns()
            .iter()
            .zip(gains)
            .map(|(column, gain)| (column.name.clone(), gain))
            .collect())
    }

    /// Gains folded back onto original feature names, largest first
    ///
    /// Indicator columns sum into their source column. Every original
    /// feature is listed; ties are ordered by name.
    pub fn feature_importances(&self) -> Result<Vec<FeatureImportance>> {
        let raw = self.fitted()?.split_gains();

        let mut by_source: BTreeMap<String, i64> = CategoricalColumn::TARGET_ENCODED
            .iter()
            .chain(CategoricalColumn::ONE_HOT.iter())
            .map(|c| c.name())
            .chain(NumericColumn::ALL.iter().map(|c| c.name()))
            .map(|name| (name.to_string(), 0))
            .collect();
        for (column, gain) in self.schema.columns().iter().zip(raw) {
            let slot = by_source.entry(column.source.clone()).or_insert(0);
            *slot = slot.saturating_add(gain);
        }

        let total: i128 = by_source.values().map(|&g| i128::from(g)).sum();
        let mut importances: Vec<FeatureImportance> = by_source
            .into_iter()
            .map(|(feature, gain)| FeatureImportance {
                importance: if total > 0 {
                    gain as f64 / total as f64
                } else {
                    0.0
                },
                feature,
                gain,
            })
            .collect();
        importances.sort_by(|a, b| b.gain.cmp(&a.gain).then_with(|| a.feature.cmp(&b.feature)));
        Ok(importances)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    /// Hand over the trained model
    pub fn into_model(self) -> Result<Model> {
        self.model
            .ok_or_else(|| SalesCoreError::NotFitted("sales regressor (call fit first)").into())
    }

    fn fitted(&self) -> Result<&Model> {
        self.model
            .as_ref()
            .ok_or_else(|| SalesCoreError::NotFitted("sales regressor (call fit first)").into())
    }

    fn check_columns(&self, matrix: &FeatureMatrix) -> Result<()> {
        let expected = self.schema.names();
        if matrix.columns != expected {
            return Err(TrainerError::Training(format!(
                "matrix columns {:?} do not match the fitted contract {:?}",
                matrix.columns, expected
            )));
        }
        Ok(())
    }
}
