//! Boosted ensemble with deterministic inference
//!
//! - Canonical JSON serialization
//! - Blake3 model hashing
//! - Integer-only inference

use serde::{Deserialize, Serialize};

use super::tree::Tree;
use crate::errors::{Result, SalesCoreError};
use crate::fixed::SCALE;
use crate::serde_canon::{hash_canonical_hex, to_canonical_json};

/// Current model format version
pub const MODEL_VERSION: i32 = 1;

/// Gradient-boosted regression ensemble
///
/// `score = bias + Σ leaf(tree) * weight(tree) / SCALE`, all in fixed-point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    /// Model format version
    pub version: i32,

    /// Fixed-point scale factor
    pub scale: i64,

    /// Width of the encoded feature rows the model was trained on
    pub feature_count: usize,

    /// Decision trees in the ensemble
    pub trees: Vec<Tree>,

    /// Initial prediction (mean training target, fixed-point)
    pub bias: i64,
}

impl Model {
    pub fn new(trees: Vec<Tree>, bias: i64, feature_count: usize) -> Self {
        Self {
            version: MODEL_VERSION,
            scale: SCALE,
            feature_count,
            trees,
            bias,
        }
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<()> {
        if self.version != MODEL_VERSION {
            return Err(SalesCoreError::ValidationFailed(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }

        if self.scale != SCALE {
            return Err(SalesCoreError::ValidationFailed(format!(
                "Invalid scale: {} (expected {})",
                self.scale, SCALE
            )));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate().map_err(|e| {
                SalesCoreError::ValidationFailed(format!("Tree {} validation failed: {}", i, e))
            })?;
            if let Some(max) = tree.max_feature_idx() {
                if max >= self.feature_count {
                    return Err(SalesCoreError::ValidationFailed(format!(
                        "Tree {} splits on feature {} but the model has {} features",
                        i, max, self.feature_count
                    )));
                }
            }
        }

        Ok(())
    }

    /// Deterministic fixed-point prediction for one encoded row
    pub fn score(&self, features: &[i64]) -> i64 {
        self.trees
            .iter()
            .fold(self.bias, |sum, tree| sum.saturating_add(tree.contribution(features)))
    }

    /// Sum of recorded split gains per feature column
    pub fn split_gains(&self) -> Vec<i64> {
        let mut gains = vec![0i64; self.feature_count];
        for node in self.trees.iter().flat_map(|t| t.nodes.iter()) {
            if node.is_leaf() {
                continue;
            }
            if let Some(slot) = usize::try_from(node.feature_idx)
                .ok()
                .and_then(|f| gains.get_mut(f))
            {
                *slot = slot.saturating_add(node.gain);
            }
        }
        gains
    }

    /// Serialize model to canonical JSON (sorted keys, no whitespace)
    pub fn to_canonical_json(&self) -> Result<String> {
        Ok(to_canonical_json(self)?)
    }

    /// Blake3 hash of the canonical JSON representation, hex encoded
    pub fn hash_hex(&self) -> Result<String> {
        Ok(hash_canonical_hex(self)?)
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}
