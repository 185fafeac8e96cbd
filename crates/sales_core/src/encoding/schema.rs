//! Frozen column contract between training and inference
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a contract column was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    TargetEncoded,
    Numeric,
    Indicator,
}

/// One column of the training feature matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaColumn {
    /// Encoded column name, e.g. `Publisher_enc` or `Genre_Action`
    pub name: String,
    /// Original feature the column derives from, e.g. `Genre`
    pub source: String,
    pub kind: ColumnKind,
}

impl SchemaColumn {
    pub fn new(name: impl Into<String>, source: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            kind,
        }
    }
}

/// Ordered column list captured at fit time
///
/// Every matrix the encoder produces, and every row the model sees, has
/// exactly these columns in exactly this order.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureSchema {
    columns: Vec<SchemaColumn>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Freeze a column list. Duplicate names keep their first position.
    pub fn new(columns: Vec<SchemaColumn>) -> Self {
        let mut positions = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            positions.entry(column.name.clone()).or_insert(idx);
        }
        Self { columns, positions }
    }

    pub fn columns(&self) -> &[SchemaColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in contract order
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Position of a column name in the contract
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Reindex a sparse `(name, value)` encoding to the contract.
    ///
    /// Known names land at their contract position, unknown names are
    /// dropped and columns the input does not mention are zero.
    pub fn align<S: AsRef<str>>(&self, sparse: &[(S, i64)]) -> Vec<i64> {
        let mut row = vec![0i64; self.columns.len()];
        for (name, value) in sparse {
            if let Some(idx) = self.position(name.as_ref()) {
                row[idx] = *value;
            }
        }
        row
    }
}

impl PartialEq for FeatureSchema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for FeatureSchema {}
