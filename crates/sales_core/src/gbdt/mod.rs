//! Fixed-point gradient-boosted regression trees
//!
//! Inference side of the sales regressor. Trees are built by the
//! trainer crate; this module only evaluates them.
//!
//! - All arithmetic is integer-only (no IEEE 754 in the scoring path)
//! - Traversal goes left when `feature <= threshold`
//! - Models hash to the same blake3 digest on every platform

pub mod model;
pub mod tree;

pub use model::{Model, MODEL_VERSION};
pub use tree::{Node, Tree};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::fixed::SCALE;

    #[test]
    fn test_repeated_inference_is_stable() {
        let tree = Tree::new(
            vec![
                Node::internal(0, 2, 2_010 * SCALE, 1, 2),
                Node::leaf(1, -300_000),
                Node::leaf(2, 450_000),
            ],
            50_000,
        );
        let model = Model::new(vec![tree.clone(), tree], 640_000, 3);
        let row = vec![0, 0, 2_015 * SCALE];

        let first = model.score(&row);
        assert!((0..100).all(|_| model.score(&row) == first));
        // 0.64 + 2 * (0.45 * 0.05)
        assert_eq!(first, 685_000);
    }

    #[test]
    fn test_empty_ensemble_predicts_bias() {
        let model = Model::new(vec![], 1_234_567, 12);
        assert_eq!(model.score(&[0; 12]), 1_234_567);
        assert!(model.split_gains().iter().all(|&g| g == 0));
    }
}
