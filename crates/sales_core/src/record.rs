//! Game records and the logical columns the encoder reads
use serde::{Deserialize, Serialize};

/// Dataset column holding the regression target
pub const TARGET_COLUMN: &str = "Global_Sales";

/// Global sales (millions of units) at or above which a title counts as a hit
pub const HIT_THRESHOLD: f64 = 1.0;

/// Categorical source columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CategoricalColumn {
    Platform,
    Publisher,
    Developer,
    Genre,
    Rating,
}

impl CategoricalColumn {
    /// High-cardinality columns, replaced by their target statistic
    pub const TARGET_ENCODED: [CategoricalColumn; 3] = [
        CategoricalColumn::Platform,
        CategoricalColumn::Publisher,
        CategoricalColumn::Developer,
    ];

    /// Low-cardinality columns, expanded to indicator columns
    pub const ONE_HOT: [CategoricalColumn; 2] = [CategoricalColumn::Genre, CategoricalColumn::Rating];

    /// Dataset column name
    pub const fn name(self) -> &'static str {
        match self {
            CategoricalColumn::Platform => "Platform",
            CategoricalColumn::Publisher => "Publisher",
            CategoricalColumn::Developer => "Developer",
            CategoricalColumn::Genre => "Genre",
            CategoricalColumn::Rating => "Rating",
        }
    }

    /// Read this column from a feature row
    pub fn value(self, features: &GameFeatures) -> Option<&str> {
        let value = match self {
            CategoricalColumn::Platform => &features.platform,
            CategoricalColumn::Publisher => &features.publisher,
            CategoricalColumn::Developer => &features.developer,
            CategoricalColumn::Genre => &features.genre,
            CategoricalColumn::Rating => &features.rating,
        };
        value.as_deref()
    }
}

/// Numeric source columns, passed through unchanged (in fixed-point)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NumericColumn {
    CriticScore,
    CriticCount,
    UserScore,
    UserCount,
    YearOfRelease,
}

impl NumericColumn {
    /// All numeric columns in contract order
    pub const ALL: [NumericColumn; 5] = [
        NumericColumn::CriticScore,
        NumericColumn::CriticCount,
        NumericColumn::UserScore,
        NumericColumn::UserCount,
        NumericColumn::YearOfRelease,
    ];

    /// Dataset column name
    pub const fn name(self) -> &'static str {
        match self {
            NumericColumn::CriticScore => "Critic_Score",
            NumericColumn::CriticCount => "Critic_Count",
            NumericColumn::UserScore => "User_Score",
            NumericColumn::UserCount => "User_Count",
            NumericColumn::YearOfRelease => "Year_of_Release",
        }
    }

    /// Read this column from a feature row
    pub fn value(self, features: &GameFeatures) -> Option<f64> {
        match self {
            NumericColumn::CriticScore => features.critic_score,
            NumericColumn::CriticCount => features.critic_count,
            NumericColumn::UserScore => features.user_score,
            NumericColumn::UserCount => features.user_count,
            NumericColumn::YearOfRelease => features.year_of_release.map(f64::from),
        }
    }
}

/// The model's input attributes for one title (everything but the target)
///
/// `None` marks a missing value. Training drops such rows; the encoder
/// rejects them with `SchemaMismatch`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameFeatures {
    pub platform: Option<String>,
    pub publisher: Option<String>,
    pub developer: Option<String>,
    pub genre: Option<String>,
    pub rating: Option<String>,
    /// Metascore, 0-100
    pub critic_score: Option<f64>,
    pub critic_count: Option<f64>,
    /// Average user score, 0-10
    pub user_score: Option<f64>,
    pub user_count: Option<f64>,
    pub year_of_release: Option<i32>,
}

impl GameFeatures {
    /// Name of the first required column with no value, if any
    pub fn first_missing(&self) -> Option<&'static str> {
        CategoricalColumn::TARGET_ENCODED
            .iter()
            .chain(CategoricalColumn::ONE_HOT.iter())
            .find(|column| column.value(self).is_none())
            .map(|column| column.name())
            .or_else(|| {
                NumericColumn::ALL
                    .iter()
                    .find(|column| column.value(self).is_none())
                    .map(|column| column.name())
            })
    }

    /// True when every required column is present
    pub fn is_complete(&self) -> bool {
        self.first_missing().is_none()
    }
}

/// One row of the sales table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub name: Option<String>,
    pub features: GameFeatures,
    pub na_sales: Option<f64>,
    pub eu_sales: Option<f64>,
    pub jp_sales: Option<f64>,
    pub other_sales: Option<f64>,
    /// Millions of units sold worldwide
    pub global_sales: Option<f64>,
    /// Derived: `global_sales >= HIT_THRESHOLD`
    pub is_hit: bool,
}

impl GameRecord {
    /// Build a record, deriving the hit label from global sales
    pub fn new(name: Option<String>, features: GameFeatures, global_sales: Option<f64>) -> Self {
        Self {
            name,
            features,
            global_sales,
            is_hit: is_hit(global_sales),
            ..Self::default()
        }
    }

    /// True when the record can be used for training: all features and the target present
    pub fn is_complete(&self) -> bool {
        self.global_sales.is_some() && self.features.is_complete()
    }
}

/// Hit label for a (possibly missing) global sales figure
pub fn is_hit(global_sales: Option<f64>) -> bool {
    global_sales.is_some_and(|sales| sales >= HIT_THRESHOLD)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_features() -> GameFeatures {
        GameFeatures {
            platform: Some("PS4".into()),
            publisher: Some("Sony".into()),
            developer: Some("Naughty Dog".into()),
            genre: Some("Action".into()),
            rating: Some("M".into()),
            critic_score: Some(92.0),
            critic_count: Some(110.0),
            user_score: Some(8.7),
            user_count: Some(5400.0),
            year_of_release: Some(2016),
        }
    }

    #[test]
    fn test_complete_row_has_nothing_missing() {
        let features = complete_features();
        assert!(features.is_complete());
        assert_eq!(features.first_missing(), None);
    }

    #[test]
    fn test_first_missing_reports_column_name() {
        let mut features = complete_features();
        features.developer = None;
        features.user_score = None;
        assert_eq!(features.first_missing(), Some("Developer"));

        features.developer = Some("Guerrilla".into());
        assert_eq!(features.first_missing(), Some("User_Score"));
    }

    #[test]
    fn test_hit_label_threshold() {
        assert!(is_hit(Some(1.0)));
        assert!(is_hit(Some(12.3)));
        assert!(!is_hit(Some(0.99)));
        assert!(!is_hit(None));

        let record = GameRecord::new(None, complete_features(), Some(1.5));
        assert!(record.is_hit);
        assert!(record.is_complete());
    }

    #[test]
    fn test_missing_target_is_incomplete() {
        let record = GameRecord::new(Some("Untitled".into()), complete_features(), None);
        assert!(!record.is_complete());
        assert!(!record.is_hit);
    }

    #[test]
    fn test_column_accessors() {
        let features = complete_features();
        assert_eq!(CategoricalColumn::Rating.value(&features), Some("M"));
        assert_eq!(NumericColumn::YearOfRelease.value(&features), Some(2016.0));
        assert_eq!(NumericColumn::UserScore.name(), "User_Score");
    }
}
