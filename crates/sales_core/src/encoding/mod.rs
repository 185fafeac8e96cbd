//! Feature encoding for the sales regressor
//!
//! `FeatureEncoder::fit` learns, from the training partition only:
//! - a [`TargetEncoding`] table for Platform, Publisher and Developer
//! - a set of [`OneHotColumns`] for Genre and Rating
//! - the frozen [`FeatureSchema`] every later matrix must follow
//!
//! `transform` encodes each row sparsely (only the columns that row
//! produces) and then aligns it to the schema, so a single inference
//! row always yields the full training-time column set. `fit_transform`
//! is the training-side entry: it encodes the fitting rows leave-one-out.

pub mod onehot;
pub mod schema;
pub mod target;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::errors::{Result, SalesCoreError};
use crate::fixed::to_fixed;
use crate::record::{CategoricalColumn, GameFeatures, NumericColumn};

pub use onehot::OneHotColumns;
pub use schema::{ColumnKind, FeatureSchema, SchemaColumn};
pub use target::TargetEncoding;

/// Encoder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// m-estimate weight blending rare categories toward the global mean (0 = raw means)
    pub smoothing: i64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self { smoothing: 10 }
    }
}

/// Encoded rows with the column names of the contract they follow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<i64>>,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Value of a named column in a given row
    pub fn value(&self, row: usize, column: &str) -> Option<i64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).and_then(|r| r.get(idx)).copied()
    }
}

#[derive(Debug, Clone)]
struct FittedEncoders {
    target: Vec<TargetEncoding>,
    onehot: Vec<OneHotColumns>,
    schema: FeatureSchema,
}

/// Target + one-hot encoder with a frozen output schema
#[derive(Debug, Clone, Default)]
pub struct FeatureEncoder {
    config: EncoderConfig,
    fitted: Option<FittedEncoders>,
}

impl FeatureEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Learn encodings and the column contract from training rows.
    ///
    /// `targets` are fixed-point global sales aligned with `rows`. May be
    /// called once; a fitted encoder is immutable.
    #[instrument(skip(self, rows, targets), fields(rows = rows.len()))]
    pub fn fit(&mut self, rows: &[GameFeatures], targets: &[i64]) -> Result<()> {
        if self.fitted.is_some() {
            return Err(SalesCoreError::InvalidParameters(
                "encoder is already fitted".into(),
            ));
        }
        if rows.is_empty() {
            return Err(SalesCoreError::EmptyTrainingSet {
                total_rows: 0,
                usable_rows: 0,
            });
        }
        if rows.len() != targets.len() {
            return Err(SalesCoreError::FeatureSizeMismatch {
                expected: rows.len(),
                actual: targets.len(),
            });
        }
        for (idx, row) in rows.iter().enumerate() {
            if let Some(column) = row.first_missing() {
                return Err(SalesCoreError::SchemaMismatch { column, row: idx });
            }
        }

        let mut columns = Vec::new();

        let mut target = Vec::with_capacity(CategoricalColumn::TARGET_ENCODED.len());
        for column in CategoricalColumn::TARGET_ENCODED {
            let values = category_values(rows, column)?;
            let encoding = TargetEncoding::fit(column.name(), &values, targets, self.config.smoothing);
            debug!(
                column = column.name(),
                categories = encoding.categories(),
                prior = encoding.prior(),
                "target encoding fitted"
            );
            columns.push(SchemaColumn::new(
                target_column_name(column),
                column.name(),
                ColumnKind::TargetEncoded,
            ));
            target.push(encoding);
        }

        for column in NumericColumn::ALL {
            columns.push(SchemaColumn::new(column.name(), column.name(), ColumnKind::Numeric));
        }

        let mut onehot = Vec::with_capacity(CategoricalColumn::ONE_HOT.len());
        for column in CategoricalColumn::ONE_HOT {
            let values = category_values(rows, column)?;
            let encoding = OneHotColumns::fit(column.name(), &values);
            debug!(
                column = column.name(),
                reference = encoding.reference(),
                indicators = encoding.categories().len(),
                "one-hot columns fitted"
            );
            for name in encoding.column_names() {
                columns.push(SchemaColumn::new(name, column.name(), ColumnKind::Indicator));
            }
            onehot.push(encoding);
        }

        let schema = FeatureSchema::new(columns);
        info!(
            "Encoder fitted on {} rows, {} output columns",
            rows.len(),
            schema.len()
        );

        self.fitted = Some(FittedEncoders {
            target,
            onehot,
            schema,
        });
        Ok(())
    }

    /// Encode rows into the frozen column contract
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub fn transform(&self, rows: &[GameFeatures]) -> Result<FeatureMatrix> {
        let fitted = self.fitted()?;
        let encoded = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| Self::encode_row(fitted, row, idx, None))
            .collect::<Result<Vec<_>>>()?;

        Ok(FeatureMatrix {
            columns: fitted.schema.names(),
            rows: encoded,
        })
    }

    /// Fit on training rows and encode those same rows out-of-fold.
    ///
    /// Target-encoded columns of each training row are computed
    /// leave-one-out, so a row's own target never reaches its features.
    /// Later `transform` calls (held-out and inference rows) use the full
    /// frozen table.
    #[instrument(skip(self, rows, targets), fields(rows = rows.len()))]
    pub fn fit_transform(&mut self, rows: &[GameFeatures], targets: &[i64]) -> Result<FeatureMatrix> {
        self.fit(rows, targets)?;
        let fitted = self.fitted()?;
        let encoded = rows
            .iter()
            .zip(targets)
            .enumerate()
            .map(|(idx, (row, &target))| Self::encode_row(fitted, row, idx, Some(target)))
            .collect::<Result<Vec<_>>>()?;

        Ok(FeatureMatrix {
            columns: fitted.schema.names(),
            rows: encoded,
        })
    }

    /// Encode a single row into the frozen column contract
    pub fn transform_one(&self, row: &GameFeatures) -> Result<Vec<i64>> {
        Self::encode_row(self.fitted()?, row, 0, None)
    }

    /// The frozen column contract
    pub fn schema(&self) -> Result<&FeatureSchema> {
        Ok(&self.fitted()?.schema)
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Fitted target encoding for a high-cardinality column
    pub fn target_encoding(&self, column: CategoricalColumn) -> Option<&TargetEncoding> {
        self.fitted
            .as_ref()?
            .target
            .iter()
            .find(|enc| enc.column() == column.name())
    }

    /// Fitted indicator set for a low-cardinality column
    pub fn one_hot(&self, column: CategoricalColumn) -> Option<&OneHotColumns> {
        self.fitted
            .as_ref()?
            .onehot
            .iter()
            .find(|enc| enc.column() == column.name())
    }

    fn fitted(&self) -> Result<&FittedEncoders> {
        self.fitted
            .as_ref()
            .ok_or(SalesCoreError::NotFitted("feature encoder (call fit first)"))
    }

    /// `own_target` is set for training rows, which are encoded leave-one-out
    fn encode_row(
        fitted: &FittedEncoders,
        row: &GameFeatures,
        idx: usize,
        own_target: Option<i64>,
    ) -> Result<Vec<i64>> {
        let mut sparse: Vec<(String, i64)> = Vec::with_capacity(fitted.schema.len());

        for (column, encoding) in CategoricalColumn::TARGET_ENCODED.iter().zip(&fitted.target) {
            let value = required_category(row, *column, idx)?;
            let encoded = match own_target {
                Some(target) => encoding.encode_excluding(value, target),
                None => encoding.encode(value),
            };
            sparse.push((target_column_name(*column), encoded));
        }

        for column in NumericColumn::ALL {
            let value = column.value(row).ok_or(SalesCoreError::SchemaMismatch {
                column: column.name(),
                row: idx,
            })?;
            sparse.push((column.name().to_string(), to_fixed(value)));
        }

        for (column, encoding) in CategoricalColumn::ONE_HOT.iter().zip(&fitted.onehot) {
            let value = required_category(row, *column, idx)?;
            sparse.push(encoding.hot(value));
        }

        Ok(fitted.schema.align(&sparse))
    }
}

/// Name of the target-encoded column for a source column
pub fn target_column_name(column: CategoricalColumn) -> String {
    format!("{}_enc", column.name())
}

fn required_category(row: &GameFeatures, column: CategoricalColumn, idx: usize) -> Result<&str> {
    column.value(row).ok_or(SalesCoreError::SchemaMismatch {
        column: column.name(),
        row: idx,
    })
}

fn category_values(rows: &[GameFeatures], column: CategoricalColumn) -> Result<Vec<&str>> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| required_category(row, column, idx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::SCALE;

    fn row(platform: &str, publisher: &str, genre: &str, rating: &str) -> GameFeatures {
        GameFeatures {
            platform: Some(platform.into()),
            publisher: Some(publisher.into()),
            developer: Some(format!("{publisher} Studio")),
            genre: Some(genre.into()),
            rating: Some(rating.into()),
            critic_score: Some(75.0),
            critic_count: Some(40.0),
            user_score: Some(7.5),
            user_count: Some(300.0),
            year_of_release: Some(2010),
        }
    }

    fn fitted_encoder() -> FeatureEncoder {
        let rows = vec![
            row("PS3", "Sony", "RPG", "E"),
            row("PS3", "EA", "Sports", "E"),
            row("X360", "EA", "RPG", "T"),
            row("Wii", "Nintendo", "Action", "M"),
            row("Wii", "Nintendo", "RPG", "E"),
        ];
        let targets = vec![2_000_000, 1_000_000, 500_000, 3_000_000, 4_000_000];
        let mut encoder = FeatureEncoder::new(EncoderConfig { smoothing: 0 });
        encoder.fit(&rows, &targets).unwrap();
        encoder
    }

    #[test]
    fn test_schema_order() {
        let encoder = fitted_encoder();
        assert_eq!(
            encoder.schema().unwrap().names(),
            vec![
                "Platform_enc",
                "Publisher_enc",
                "Developer_enc",
                "Critic_Score",
                "Critic_Count",
                "User_Score",
                "User_Count",
                "Year_of_Release",
                "Genre_Action",
                "Genre_Sports",
                "Rating_M",
                "Rating_T",
            ]
        );
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let encoder = FeatureEncoder::default();
        let err = encoder.transform(&[row("PS3", "Sony", "RPG", "E")]).unwrap_err();
        assert!(matches!(err, SalesCoreError::NotFitted(_)));
        assert!(matches!(encoder.schema(), Err(SalesCoreError::NotFitted(_))));
    }

    #[test]
    fn test_transform_encodes_values() {
        let encoder = fitted_encoder();
        let matrix = encoder.transform(&[row("Wii", "EA", "Sports", "T")]).unwrap();

        assert_eq!(matrix.value(0, "Platform_enc"), Some(3_500_000));
        assert_eq!(matrix.value(0, "Publisher_enc"), Some(750_000));
        assert_eq!(matrix.value(0, "Critic_Score"), Some(75 * SCALE));
        assert_eq!(matrix.value(0, "User_Score"), Some(7_500_000));
        assert_eq!(matrix.value(0, "Genre_Sports"), Some(SCALE));
        assert_eq!(matrix.value(0, "Genre_Action"), Some(0));
        assert_eq!(matrix.value(0, "Rating_T"), Some(SCALE));
        assert_eq!(matrix.value(0, "Rating_M"), Some(0));
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let encoder = fitted_encoder();
        let mut incomplete = row("PS3", "Sony", "RPG", "E");
        incomplete.rating = None;

        let err = encoder
            .transform(&[row("PS3", "Sony", "RPG", "E"), incomplete])
            .unwrap_err();
        match err {
            SalesCoreError::SchemaMismatch { column, row } => {
                assert_eq!(column, "Rating");
                assert_eq!(row, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let mut encoder = FeatureEncoder::default();
        assert!(matches!(
            encoder.fit(&[], &[]),
            Err(SalesCoreError::EmptyTrainingSet { .. })
        ));
        assert!(matches!(
            encoder.fit(&[row("PS3", "Sony", "RPG", "E")], &[1, 2]),
            Err(SalesCoreError::FeatureSizeMismatch { .. })
        ));

        let mut incomplete = row("PS3", "Sony", "RPG", "E");
        incomplete.critic_count = None;
        assert!(matches!(
            encoder.fit(&[incomplete], &[1]),
            Err(SalesCoreError::SchemaMismatch { column: "Critic_Count", row: 0 })
        ));
        assert!(!encoder.is_fitted());
    }

    #[test]
    fn test_second_fit_is_rejected() {
        let mut encoder = fitted_encoder();
        let err = encoder
            .fit(&[row("PS3", "Sony", "RPG", "E")], &[SCALE])
            .unwrap_err();
        assert!(matches!(err, SalesCoreError::InvalidParameters(_)));
    }

    #[test]
    fn test_fit_transform_row_ignores_its_own_target() {
        let mut rows = vec![
            row("PS3", "Sony", "RPG", "E"),
            row("PS3", "Sony", "RPG", "E"),
            row("Wii", "Sony", "RPG", "E"),
        ];
        rows[0].developer = Some("A".into());
        rows[1].developer = Some("A".into());
        rows[2].developer = Some("Solo".into());

        let encode = |solo_target: i64| {
            let mut encoder = FeatureEncoder::default();
            let train = encoder
                .fit_transform(&rows, &[SCALE, SCALE, solo_target])
                .unwrap();
            let frozen = encoder.transform(&rows[2..]).unwrap();
            let col = encoder.schema().unwrap().position("Developer_enc").unwrap();
            (train.rows[2][col], frozen.rows[0][col])
        };

        let (low_train, low_frozen) = encode(0);
        let (high_train, high_frozen) = encode(20 * SCALE);
        assert_eq!(low_train, high_train);
        assert_eq!(low_train, SCALE);
        // held-out rows still use the full table
        assert_eq!(low_frozen, 606_060);
        assert_eq!(high_frozen, 8_484_848);
    }

    #[test]
    fn test_fit_transform_matches_fit_columns() {
        let rows = vec![
            row("PS3", "Sony", "RPG", "E"),
            row("X360", "EA", "Sports", "T"),
        ];
        let mut encoder = FeatureEncoder::default();
        let train = encoder.fit_transform(&rows, &[SCALE, 2 * SCALE]).unwrap();
        assert!(encoder.is_fitted());
        assert_eq!(train.columns, encoder.schema().unwrap().names());
        assert_eq!(train.rows.len(), 2);
        assert!(matches!(
            encoder.fit_transform(&rows, &[SCALE, SCALE]),
            Err(SalesCoreError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_transform_one_matches_transform() {
        let encoder = fitted_encoder();
        let input = row("X360", "Nintendo", "Action", "E");
        let single = encoder.transform_one(&input).unwrap();
        let batch = encoder.transform(&[input]).unwrap();
        assert_eq!(batch.rows[0], single);
    }
}
