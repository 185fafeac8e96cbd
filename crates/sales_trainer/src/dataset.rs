//! CSV dataset loading and preprocessing
//!
//! Reads the video-game sales table by header, coerces numeric columns
//! (non-numeric text such as `tbd` becomes missing), filters rows and
//! provides the deterministic train/test split.

use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, instrument};

use vgsales_core::record::TARGET_COLUMN;
use vgsales_core::{CategoricalColumn, GameFeatures, GameRecord, NumericColumn, SCALE};

use crate::deterministic::LcgRng;
use crate::errors::{Result, TrainerError};

/// One raw CSV row; absent and unparsable numeric cells become `None`
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "Platform", default)]
    platform: Option<String>,
    #[serde(rename = "Year_of_Release", default, deserialize_with = "csv::invalid_option")]
    year_of_release: Option<f64>,
    #[serde(rename = "Genre", default)]
    genre: Option<String>,
    #[serde(rename = "Publisher", default)]
    publisher: Option<String>,
    #[serde(rename = "NA_Sales", default, deserialize_with = "csv::invalid_option")]
    na_sales: Option<f64>,
    #[serde(rename = "EU_Sales", default, deserialize_with = "csv::invalid_option")]
    eu_sales: Option<f64>,
    #[serde(rename = "JP_Sales", default, deserialize_with = "csv::invalid_option")]
    jp_sales: Option<f64>,
    #[serde(rename = "Other_Sales", default, deserialize_with = "csv::invalid_option")]
    other_sales: Option<f64>,
    #[serde(rename = "Global_Sales", default, deserialize_with = "csv::invalid_option")]
    global_sales: Option<f64>,
    #[serde(rename = "Critic_Score", default, deserialize_with = "csv::invalid_option")]
    critic_score: Option<f64>,
    #[serde(rename = "Critic_Count", default, deserialize_with = "csv::invalid_option")]
    critic_count: Option<f64>,
    #[serde(rename = "User_Score", default, deserialize_with = "csv::invalid_option")]
    user_score: Option<f64>,
    #[serde(rename = "User_Count", default, deserialize_with = "csv::invalid_option")]
    user_count: Option<f64>,
    #[serde(rename = "Developer", default)]
    developer: Option<String>,
    #[serde(rename = "Rating", default)]
    rating: Option<String>,
}

impl CsvRow {
    fn into_record(self) -> GameRecord {
        let year = self
            .year_of_release
            .filter(|y| y.is_finite() && *y >= f64::from(i32::MIN) && *y <= f64::from(i32::MAX))
            .map(|y| y.round() as i32);
        let finite = |v: Option<f64>| v.filter(|v| v.is_finite());

        let features = GameFeatures {
            platform: non_blank(self.platform),
            publisher: non_blank(self.publisher),
            developer: non_blank(self.developer),
            genre: non_blank(self.genre),
            rating: non_blank(self.rating),
            critic_score: finite(self.critic_score),
            critic_count: finite(self.critic_count),
            user_score: finite(self.user_score),
            user_count: finite(self.user_count),
            year_of_release: year,
        };

        let mut record = GameRecord::new(non_blank(self.name), features, finite(self.global_sales));
        record.na_sales = finite(self.na_sales);
        record.eu_sales = finite(self.eu_sales);
        record.jp_sales = finite(self.jp_sales);
        record.other_sales = finite(self.other_sales);
        record
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Columns the loader refuses to do without
fn required_headers() -> Vec<&'static str> {
    CategoricalColumn::TARGET_ENCODED
        .iter()
        .chain(CategoricalColumn::ONE_HOT.iter())
        .map(|c| c.name())
        .chain(NumericColumn::ALL.iter().map(|c| c.name()))
        .chain(std::iter::once(TARGET_COLUMN))
        .collect()
}

/// Row restrictions applied before training
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetFilter {
    /// Inclusive lower bound on the release year
    pub year_min: Option<i32>,
    /// Inclusive upper bound on the release year
    pub year_max: Option<i32>,
    /// Allowed platforms; empty = any
    pub platforms: Vec<String>,
    /// Allowed genres; empty = any
    pub genres: Vec<String>,
}

impl DatasetFilter {
    pub fn is_unrestricted(&self) -> bool {
        self.year_min.is_none()
            && self.year_max.is_none()
            && self.platforms.is_empty()
            && self.genres.is_empty()
    }

    /// Whether a record survives the filter
    pub fn accepts(&self, record: &GameRecord) -> bool {
        let features = &record.features;
        if self.year_min.is_some() || self.year_max.is_some() {
            let Some(year) = features.year_of_release else {
                return false;
            };
            if self.year_min.is_some_and(|min| year < min) || self.year_max.is_some_and(|max| year > max) {
                return false;
            }
        }
        let allowed = |list: &[String], value: &Option<String>| {
            list.is_empty() || value.as_ref().is_some_and(|v| list.iter().any(|l| l == v))
        };
        allowed(&self.platforms, &features.platform) && allowed(&self.genres, &features.genre)
    }
}

/// The loaded sales table
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub records: Vec<GameRecord>,
}

impl Dataset {
    /// Load the sales table from a CSV file with a header row
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path.as_ref())?;

        let headers = reader.headers()?.clone();
        let missing: Vec<&str> = required_headers()
            .into_iter()
            .filter(|name| !headers.iter().any(|h| h == *name))
            .collect();
        if !missing.is_empty() {
            return Err(TrainerError::Dataset(format!(
                "missing required columns: {}",
                missing.join(", ")
            )));
        }

        let mut records = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            let row = row.map_err(|e| {
                let line = e.position().map_or(0, |p| p.line());
                TrainerError::Dataset(format!("line {line}: {e}"))
            })?;
            records.push(row.into_record());
        }

        let dataset = Self { records };
        info!(
            rows = dataset.len(),
            complete = dataset.complete_records().len(),
            hits = dataset.hit_count(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    pub fn from_records(records: Vec<GameRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records with global sales of at least one million units
    pub fn hit_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_hit).count()
    }

    /// Earliest and latest release year present
    pub fn year_span(&self) -> Option<(i32, i32)> {
        let years = self.records.iter().filter_map(|r| r.features.year_of_release);
        years.fold(None, |span, y| match span {
            None => Some((y, y)),
            Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
        })
    }

    /// Copy of the records accepted by `filter`
    pub fn filtered(&self, filter: &DatasetFilter) -> Self {
        if filter.is_unrestricted() {
            return self.clone();
        }
        let records: Vec<GameRecord> = self
            .records
            .iter()
            .filter(|r| filter.accepts(r))
            .cloned()
            .collect();
        debug!(before = self.len(), after = records.len(), "dataset filtered");
        Self { records }
    }

    /// Records with every model feature and the target present
    pub fn complete_records(&self) -> Vec<&GameRecord> {
        self.records.iter().filter(|r| r.is_complete()).collect()
    }
}

/// Seeded shuffle-then-split of `0..n` into (train, test) index lists.
///
/// `test_fraction` is fixed-point; `ceil(n * test_fraction)` rows are held out.
pub fn train_test_split(n: usize, test_fraction: i64, seed: i64) -> (Vec<usize>, Vec<usize>) {
    let fraction = i128::from(test_fraction.clamp(0, SCALE));
    let scale = i128::from(SCALE);
    let test_len = ((n as i128 * fraction + scale - 1) / scale) as usize;

    let mut indices: Vec<usize> = (0..n).collect();
    LcgRng::new(seed).shuffle(&mut indices);

    let train = indices.split_off(test_len.min(n));
    (train, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "Name,Platform,Year_of_Release,Genre,Publisher,NA_Sales,EU_Sales,JP_Sales,Other_Sales,Global_Sales,Critic_Score,Critic_Count,User_Score,User_Count,Developer,Rating";

    fn write_csv(rows: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_and_coerce() {
        let file = write_csv(&[
            "Wii Sports,Wii,2006,Sports,Nintendo,41.36,28.96,3.77,8.45,82.53,76,51,8,322,Nintendo,E",
            "Some Game,PS2,2004.0,Action,Acme,0.1,0.05,0,0.01,0.16,61,12,tbd,,Acme Studio,T",
            "\"Quoted, Name\",DS,,Puzzle,,0.3,0.2,0.1,0.0,0.6,,,,,,",
        ]);

        let dataset = Dataset::from_csv(file.path()).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.hit_count(), 1);

        let first = &dataset.records[0];
        assert!(first.is_complete());
        assert_eq!(first.global_sales, Some(82.53));
        assert_eq!(first.features.user_count, Some(322.0));

        let second = &dataset.records[1];
        assert_eq!(second.features.year_of_release, Some(2004));
        assert_eq!(second.features.user_score, None);
        assert_eq!(second.features.user_count, None);
        assert!(!second.is_complete());

        let third = &dataset.records[2];
        assert_eq!(third.name.as_deref(), Some("Quoted, Name"));
        assert_eq!(third.features.publisher, None);
        assert_eq!(third.features.rating, None);

        assert_eq!(dataset.complete_records().len(), 1);
        assert_eq!(dataset.year_span(), Some((2004, 2006)));
    }

    #[test]
    fn test_missing_header_is_dataset_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Name,Platform,Global_Sales").unwrap();
        writeln!(file, "A,Wii,1.0").unwrap();
        file.flush().unwrap();

        let err = Dataset::from_csv(file.path()).unwrap_err();
        let TrainerError::Dataset(message) = err else {
            panic!("expected dataset error, got {err:?}");
        };
        assert!(message.contains("Critic_Score"));
        assert!(!message.contains("Platform,"));
    }

    #[test]
    fn test_ragged_row_names_line() {
        let file = write_csv(&["Short,Wii,2006"]);
        let err = Dataset::from_csv(file.path()).unwrap_err();
        let TrainerError::Dataset(message) = err else {
            panic!("expected dataset error, got {err:?}");
        };
        assert!(message.starts_with("line 2"), "{message}");
    }

    fn record(platform: &str, genre: &str, year: Option<i32>) -> GameRecord {
        let features = GameFeatures {
            platform: Some(platform.into()),
            genre: Some(genre.into()),
            year_of_release: year,
            ..GameFeatures::default()
        };
        GameRecord::new(None, features, Some(0.5))
    }

    #[test]
    fn test_filters() {
        let dataset = Dataset::from_records(vec![
            record("Wii", "Sports", Some(2006)),
            record("PS4", "Action", Some(2015)),
            record("PS4", "Sports", Some(2017)),
            record("PC", "Action", None),
        ]);

        assert_eq!(dataset.filtered(&DatasetFilter::default()).len(), 4);

        let years = DatasetFilter {
            year_min: Some(2010),
            year_max: Some(2016),
            ..DatasetFilter::default()
        };
        assert_eq!(dataset.filtered(&years).len(), 1);

        let platform_and_genre = DatasetFilter {
            platforms: vec!["PS4".into(), "PC".into()],
            genres: vec!["Action".into()],
            ..DatasetFilter::default()
        };
        let filtered = dataset.filtered(&platform_and_genre);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.records.iter().all(|r| r.features.genre.as_deref() == Some("Action")));
    }

    #[test]
    fn test_split_sizes_and_disjointness() {
        let (train, test) = train_test_split(10, 250_000, 42);
        // ceil(2.5) = 3
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 7);

        let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());

        assert_eq!(train_test_split(10, 250_000, 42), (train, test));
        assert_eq!(train_test_split(0, 250_000, 42), (vec![], vec![]));
        assert_eq!(train_test_split(1, 250_000, 42).1.len(), 1);
    }
}
