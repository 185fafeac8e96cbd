//! Regression tree structures
//!
//! Integer-only nodes and traversal. Thresholds and leaf values are
//! fixed-point at `SCALE` precision.

use serde::{Deserialize, Serialize};

use crate::fixed::mul_fixed;

/// A decision tree node (internal or leaf)
///
/// For internal nodes:
/// - `feature_idx >= 0`: index into the encoded feature row
/// - `left` and `right` point to child node indices
/// - `gain` is the loss reduction the split achieved during training
///
/// For leaf nodes:
/// - `feature_idx == -1`
/// - `leaf` contains the residual correction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Node {
    /// Node ID (its index in the tree)
    pub id: i32,

    /// Left child index (-1 for leaf nodes)
    pub left: i32,

    /// Right child index (-1 for leaf nodes)
    pub right: i32,

    /// Feature index to split on (-1 for leaf nodes)
    pub feature_idx: i32,

    /// Split threshold (fixed-point); rows with `value <= threshold` go left
    pub threshold: i64,

    /// Leaf value (Some for leaf nodes, None for internal nodes)
    pub leaf: Option<i64>,

    /// Split gain recorded at training time (0 for leaves)
    #[serde(default)]
    pub gain: i64,
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(id: i32, feature_idx: i32, threshold: i64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
            gain: 0,
        }
    }

    /// Create a new leaf node
    pub fn leaf(id: i32, value: i64) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0,
            leaf: Some(value),
            gain: 0,
        }
    }

    /// Attach the training gain of this split
    pub fn with_gain(mut self, gain: i64) -> Self {
        self.gain = gain;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }
}

/// A single regression tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tree {
    /// Tree nodes (node 0 is the root)
    pub nodes: Vec<Node>,

    /// Shrinkage applied to leaf values (fixed-point learning rate)
    pub weight: i64,
}

impl Tree {
    pub fn new(nodes: Vec<Node>, weight: i64) -> Self {
        Self { nodes, weight }
    }

    /// Raw leaf value reached by a feature row
    ///
    /// Malformed structure (dangling child, out-of-range feature) yields 0.
    pub fn evaluate(&self, features: &[i64]) -> i64 {
        let mut idx = 0usize;

        // A well-formed path visits each node at most once
        for _ in 0..self.nodes.len() {
            let Some(node) = self.nodes.get(idx) else {
                return 0;
            };

            if node.is_leaf() {
                return node.leaf.unwrap_or(0);
            }

            let Some(&value) = usize::try_from(node.feature_idx)
                .ok()
                .and_then(|f| features.get(f))
            else {
                return 0;
            };

            let next = if value <= node.threshold {
                node.left
            } else {
                node.right
            };
            idx = match usize::try_from(next) {
                Ok(next) => next,
                Err(_) => return 0,
            };
        }
        0
    }

    /// Leaf value scaled by the tree weight: `leaf * weight / SCALE`
    pub fn contribution(&self, features: &[i64]) -> i64 {
        mul_fixed(self.evaluate(features), self.weight)
    }

    /// Validate tree structure
    pub fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        let in_range = |child: i32| child >= 0 && (child as usize) < self.nodes.len();

        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                if node.leaf.is_none() {
                    return Err(format!("Leaf node {i} has no leaf value"));
                }
                continue;
            }
            if !in_range(node.left) {
                return Err(format!("Node {} has invalid left child: {}", i, node.left));
            }
            if !in_range(node.right) {
                return Err(format!("Node {} has invalid right child: {}", i, node.right));
            }
            // Children come after their parent, which rules out cycles
            if node.left as usize <= i || node.right as usize <= i {
                return Err(format!(
                    "Node {} points back to an earlier node: left {}, right {}",
                    i, node.left, node.right
                ));
            }
            if node.feature_idx < 0 {
                return Err(format!(
                    "Internal node {} has invalid feature index: {}",
                    i, node.feature_idx
                ));
            }
        }

        Ok(())
    }

    /// Largest feature index referenced by a split, if any
    pub fn max_feature_idx(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter(|n| !n.is_leaf())
            .filter_map(|n| usize::try_from(n.feature_idx).ok())
            .max()
    }
}
