//! Target encoding for high-cardinality categorical columns
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-category target statistic, frozen after fit
///
/// `enc(c) = (sum_c + m * prior) / (n_c + m)` where `prior` is the
/// global training mean and `m` the smoothing weight. With `m = 0` this
/// is the raw per-category mean. Categories never seen in training
/// encode to `prior`.
///
/// Training rows themselves are encoded leave-one-out through
/// [`TargetEncoding::encode_excluding`], so no row sees its own target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetEncoding {
    column: &'static str,
    prior: i64,
    smoothing: i64,
    table: BTreeMap<String, i64>,
    /// Training target sum and row count per category
    stats: BTreeMap<String, (i64, i64)>,
    total: i64,
    rows: i64,
}

impl TargetEncoding {
    /// Fit from aligned category values and fixed-point targets.
    ///
    /// Callers guarantee `values.len() == targets.len()` and non-empty input.
    pub fn fit(column: &'static str, values: &[&str], targets: &[i64], smoothing: i64) -> Self {
        debug_assert_eq!(values.len(), targets.len());
        let smoothing = smoothing.max(0);

        let total: i128 = targets.iter().map(|&t| i128::from(t)).sum();
        let prior = if targets.is_empty() {
            0
        } else {
            (total / targets.len() as i128) as i64
        };

        let mut groups: BTreeMap<&str, (i128, i128)> = BTreeMap::new();
        for (&value, &target) in values.iter().zip(targets) {
            let entry = groups.entry(value).or_insert((0, 0));
            entry.0 += i128::from(target);
            entry.1 += 1;
        }

        let mut table = BTreeMap::new();
        let mut stats = BTreeMap::new();
        for (value, (sum, count)) in groups {
            table.insert(value.to_string(), smoothed(sum, count, prior, smoothing));
            stats.insert(value.to_string(), (saturate(sum), saturate(count)));
        }

        Self {
            column,
            prior,
            smoothing,
            table,
            stats,
            total: saturate(total),
            rows: targets.len() as i64,
        }
    }

    /// Encoded value for a category; unseen categories fall back to the prior
    pub fn encode(&self, value: &str) -> i64 {
        self.table.get(value).copied().unwrap_or(self.prior)
    }

    /// Leave-one-out encoding of a training row with category `value` and target `own_target`
    ///
    /// Both the category statistic and the prior are recomputed without the
    /// row, so the result does not depend on `own_target`. A category seen
    /// only in this row falls back to the leave-one-out prior.
    pub fn encode_excluding(&self, value: &str, own_target: i64) -> i64 {
        let own = i128::from(own_target);
        let rest = i128::from(self.rows) - 1;
        let prior = if rest > 0 {
            ((i128::from(self.total) - own) / rest) as i64
        } else {
            self.prior
        };

        match self.stats.get(value) {
            Some(&(sum, count)) if count > 0 => smoothed(
                i128::from(sum) - own,
                i128::from(count) - 1,
                prior,
                self.smoothing,
            ),
            _ => prior,
        }
    }

    /// Source column name
    pub fn column(&self) -> &'static str {
        self.column
    }

    /// Global mean target of the training partition
    pub fn prior(&self) -> i64 {
        self.prior
    }

    /// Number of categories observed during fit
    pub fn categories(&self) -> usize {
        self.table.len()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.table.contains_key(value)
    }
}

/// `(sum + m * prior) / (count + m)`, or `prior` when nothing remains
fn smoothed(sum: i128, count: i128, prior: i64, smoothing: i64) -> i64 {
    let weight = i128::from(smoothing);
    let denominator = count + weight;
    if denominator <= 0 {
        return prior;
    }
    saturate((sum + weight * i128::from(prior)) / denominator)
}

fn saturate(value: i128) -> i64 {
    value.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}
