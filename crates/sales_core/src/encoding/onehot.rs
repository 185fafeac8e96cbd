//! One-hot encoding for low-cardinality categorical columns
use serde::Serialize;
use std::collections::BTreeMap;

use crate::fixed::SCALE;

/// Indicator columns for one source column, frozen after fit
///
/// The most frequent training value is the reference category (ties go
/// to the lexicographically smallest value) and gets no column of its
/// own. Every other observed value gets one indicator, in ascending
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OneHotColumns {
    column: &'static str,
    reference: String,
    categories: Vec<String>,
}

impl OneHotColumns {
    /// Fit from the observed training values. `values` must be non-empty.
    pub fn fit(column: &'static str, values: &[&str]) -> Self {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for &value in values {
            *counts.entry(value).or_insert(0) += 1;
        }

        // BTreeMap iterates ascending, so a strict `>` keeps the smallest name on ties
        let mut reference: Option<(&str, usize)> = None;
        for (&value, &count) in &counts {
            if reference.map_or(true, |(_, best)| count > best) {
                reference = Some((value, count));
            }
        }
        let reference = reference.map(|(value, _)| value).unwrap_or_default();

        let categories = counts
            .keys()
            .filter(|&&value| value != reference)
            .map(|value| value.to_string())
            .collect();

        Self {
            column,
            reference: reference.to_string(),
            categories,
        }
    }

    /// Indicator column name for a category value
    pub fn column_name(&self, value: &str) -> String {
        format!("{}_{}", self.column, value)
    }

    /// Indicator column names in contract order
    pub fn column_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| self.column_name(c)).collect()
    }

    /// Sparse encoding of one value: the single "hot" column.
    ///
    /// The name may be absent from the frozen schema (reference or unseen
    /// category); schema alignment drops it, leaving every indicator zero.
    pub fn hot(&self, value: &str) -> (String, i64) {
        (self.column_name(value), SCALE)
    }

    pub fn column(&self) -> &'static str {
        self.column
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}
