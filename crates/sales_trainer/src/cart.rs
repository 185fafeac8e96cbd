//! CART (Classification and Regression Tree) builder
//!
//! Deterministic exact-greedy regression trees on squared-error
//! gradients, fixed-point arithmetic only. Hessians are unit, so a leaf
//! is the mean residual and a split's gain is the reduction in
//! `G² / n` summed over its children.

use vgsales_core::{Node, Tree, SCALE};

use crate::deterministic::SplitTieBreaker;
use crate::errors::{Result, TrainerError};

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub quant_step: i64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            min_samples_split: 10,
            min_samples_leaf: 5,
            quant_step: 1_000,
        }
    }
}

/// Split candidate with gain and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: i64,
    /// Unscaled gain (fixed-point squared)
    gain: i128,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn new(feature_idx: usize, threshold: i64, gain: i128, node_id: usize) -> Self {
        Self {
            feature_idx,
            threshold,
            gain,
            tie_breaker: SplitTieBreaker::new(feature_idx, threshold, node_id),
        }
    }

    fn beats(&self, other: &SplitCandidate) -> bool {
        self.gain > other.gain || (self.gain == other.gain && self.tie_breaker < other.tie_breaker)
    }

    /// Gain stored on the node, in fixed-point
    fn recorded_gain(&self) -> i64 {
        (self.gain / i128::from(SCALE)).clamp(0, i128::from(i64::MAX)) as i64
    }
}

/// Build a regression tree using exact-greedy CART algorithm
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<i64>],
    gradients: &'a [i64],
    /// Columns eligible for splitting, ascending
    allowed: Vec<usize>,
}

impl<'a> CartBuilder<'a> {
    pub fn new(features: &'a [Vec<i64>], gradients: &'a [i64], config: TreeConfig) -> Result<Self> {
        if features.len() != gradients.len() {
            return Err(TrainerError::Training(format!(
                "{} feature rows but {} gradients",
                features.len(),
                gradients.len()
            )));
        }
        if config.quant_step <= 0 {
            return Err(TrainerError::Training("quant_step must be positive".into()));
        }
        let width = features.first().map_or(0, Vec::len);
        if let Some(row) = features.iter().position(|r| r.len() != width) {
            return Err(TrainerError::Training(format!(
                "row {row} has {} features, expected {width}",
                features[row].len()
            )));
        }

        Ok(Self {
            config,
            features,
            gradients,
            allowed: (0..width).collect(),
        })
    }

    /// Restrict splitting to a subset of columns
    pub fn with_features(mut self, mut columns: Vec<usize>) -> Self {
        let width = self.features.first().map_or(0, Vec::len);
        columns.retain(|&c| c < width);
        columns.sort_unstable();
        columns.dedup();
        self.allowed = columns;
        self
    }

    /// Build a tree over the given rows; leaves are scaled by `weight` at evaluation
    pub fn build(&self, rows: &[usize], weight: i64) -> Tree {
        let mut nodes = Vec::new();
        self.build_node(rows, 0, &mut nodes, 0);
        Tree::new(nodes, weight)
    }

    /// Recursively build tree nodes, returning the index of the subtree root
    fn build_node(&self, rows: &[usize], depth: usize, nodes: &mut Vec<Node>, node_id: usize) -> i32 {
        let current = nodes.len() as i32;
        let leaf = Node::leaf(current, self.leaf_value(rows));

        if depth >= self.config.max_depth
            || rows.len() < self.config.min_samples_split
            || rows.len() < 2 * self.config.min_samples_leaf
        {
            nodes.push(leaf);
            return current;
        }

        let Some(split) = self.find_best_split(rows, node_id) else {
            nodes.push(leaf);
            return current;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&r| self.features[r][split.feature_idx] <= split.threshold);

        // Placeholder children, patched below
        nodes.push(
            Node::internal(current, split.feature_idx as i32, split.threshold, -1, -1)
                .with_gain(split.recorded_gain()),
        );

        let left = self.build_node(&left_rows, depth + 1, nodes, node_id.saturating_mul(2).saturating_add(1));
        let right = self.build_node(&right_rows, depth + 1, nodes, node_id.saturating_mul(2).saturating_add(2));

        let node = &mut nodes[current as usize];
        node.left = left;
        node.right = right;

        current
    }

    /// Mean residual: `-G / n`
    fn leaf_value(&self, rows: &[usize]) -> i64 {
        if rows.is_empty() {
            return 0;
        }
        let sum: i128 = rows.iter().map(|&r| i128::from(self.gradients[r])).sum();
        (-sum / rows.len() as i128).clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }

    /// Upper bound of the quantization bucket containing `value`
    fn bucket(&self, value: i64) -> i64 {
        let step = self.config.quant_step;
        value
            .div_euclid(step)
            .saturating_mul(step)
            .saturating_add(step - 1)
    }

    /// Find best split using a sorted prefix-sum sweep per column
    fn find_best_split(&self, rows: &[usize], node_id: usize) -> Option<SplitCandidate> {
        let n = rows.len();
        if n < 2 {
            return None;
        }
        let min_leaf = self.config.min_samples_leaf.max(1);
        let total: i128 = rows.iter().map(|&r| i128::from(self.gradients[r])).sum();
        let parent_score = total * total / n as i128;

        let mut best: Option<SplitCandidate> = None;
        let mut sorted: Vec<(i64, i64)> = Vec::with_capacity(n);

        for &feature_idx in &self.allowed {
            sorted.clear();
            sorted.extend(
                rows.iter()
                    .map(|&r| (self.bucket(self.features[r][feature_idx]), self.gradients[r])),
            );
            sorted.sort_unstable();

            let mut left_sum: i128 = 0;
            for i in 0..n - 1 {
                left_sum += i128::from(sorted[i].1);
                if sorted[i].0 == sorted[i + 1].0 {
                    continue;
                }

                let left_n = i + 1;
                let right_n = n - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let right_sum = total - left_sum;
                let gain = left_sum * left_sum / left_n as i128
                    + right_sum * right_sum / right_n as i128
                    - parent_score;
                if gain <= 0 {
                    continue;
                }

                let candidate = SplitCandidate::new(feature_idx, sorted[i].0, gain, node_id);
                if best.as_ref().map_or(true, |b| candidate.beats(b)) {
                    best = Some(candidate);
                }
            }
        }

        best
    }
}
