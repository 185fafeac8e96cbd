//! Single-row sales prediction
//!
//! Pairs a fitted [`FeatureEncoder`] with the [`Model`] trained on its
//! output. Prediction is a pure function of the two and the input row.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::encoding::FeatureEncoder;
use crate::errors::{Result, SalesCoreError};
use crate::fixed::from_fixed;
use crate::gbdt::Model;
use crate::record::GameFeatures;
use crate::verdict::Verdict;

/// Predicted global sales and the band it falls in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Millions of units, never negative
    pub sales: f64,
    pub verdict: Verdict,
}

/// Fitted encoder + fitted model
#[derive(Debug, Clone)]
pub struct SalesPredictor {
    encoder: FeatureEncoder,
    model: Model,
}

impl SalesPredictor {
    /// Pair a fitted encoder with a model trained on its column contract.
    pub fn new(encoder: FeatureEncoder, model: Model) -> Result<Self> {
        let width = encoder.schema()?.len();
        if width != model.feature_count {
            return Err(SalesCoreError::FeatureSizeMismatch {
                expected: model.feature_count,
                actual: width,
            });
        }
        model.validate()?;
        Ok(Self { encoder, model })
    }

    /// Predicted global sales (millions) for one raw feature row
    pub fn predict_one(&self, row: &GameFeatures) -> Result<f64> {
        let encoded = self.encoder.transform_one(row)?;
        let score = self.model.score(&encoded).max(0);
        debug!(score, "sales prediction");
        Ok(from_fixed(score))
    }

    /// Prediction together with its verdict band
    pub fn assess(&self, row: &GameFeatures) -> Result<Prediction> {
        let sales = self.predict_one(row)?;
        Ok(Prediction {
            sales,
            verdict: Verdict::classify(sales),
        })
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn model(&self) -> &Model {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::EncoderConfig;
    use crate::fixed::SCALE;
    use crate::gbdt::{Node, Tree};

    fn features(genre: &str, critic: f64) -> GameFeatures {
        GameFeatures {
            platform: Some("PS4".into()),
            publisher: Some("Capcom".into()),
            developer: Some("Capcom".into()),
            genre: Some(genre.into()),
            rating: Some("T".into()),
            critic_score: Some(critic),
            critic_count: Some(60.0),
            user_score: Some(7.9),
            user_count: Some(900.0),
            year_of_release: Some(2017),
        }
    }

    fn fitted_encoder() -> FeatureEncoder {
        let rows = vec![
            features("Action", 80.0),
            features("Fighting", 70.0),
            features("Action", 60.0),
        ];
        let mut encoder = FeatureEncoder::new(EncoderConfig::default());
        encoder.fit(&rows, &[SCALE, SCALE, SCALE]).unwrap();
        encoder
    }

    /// One stump on Critic_Score (column 3): <= 75 → -0.6, else +0.6
    fn critic_model(width: usize) -> Model {
        let tree = Tree::new(
            vec![
                Node::internal(0, 3, 75 * SCALE, 1, 2),
                Node::leaf(1, -600_000),
                Node::leaf(2, 600_000),
            ],
            SCALE,
        );
        Model::new(vec![tree], 500_000, width)
    }

    #[test]
    fn test_predict_and_assess() {
        let encoder = fitted_encoder();
        let width = encoder.schema().unwrap().len();
        let predictor = SalesPredictor::new(encoder, critic_model(width)).unwrap();

        let high = predictor.assess(&features("Action", 90.0)).unwrap();
        assert_eq!(high.sales, 1.1);
        assert_eq!(high.verdict, Verdict::Hit);

        // 0.5 - 0.6 clamps to zero
        let low = predictor.assess(&features("Puzzle", 50.0)).unwrap();
        assert_eq!(low.sales, 0.0);
        assert_eq!(low.verdict, Verdict::NotHit);
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let encoder = fitted_encoder();
        let width = encoder.schema().unwrap().len();
        let err = SalesPredictor::new(encoder, critic_model(width + 1)).unwrap_err();
        assert!(matches!(err, SalesCoreError::FeatureSizeMismatch { .. }));
    }

    #[test]
    fn test_unfitted_encoder_is_rejected() {
        let err = SalesPredictor::new(FeatureEncoder::default(), critic_model(12)).unwrap_err();
        assert!(matches!(err, SalesCoreError::NotFitted(_)));
    }

    #[test]
    fn test_missing_input_column() {
        let encoder = fitted_encoder();
        let width = encoder.schema().unwrap().len();
        let predictor = SalesPredictor::new(encoder, critic_model(width)).unwrap();

        let mut row = features("Action", 90.0);
        row.publisher = None;
        assert!(matches!(
            predictor.predict_one(&row),
            Err(SalesCoreError::SchemaMismatch { column: "Publisher", .. })
        ));
    }
}
