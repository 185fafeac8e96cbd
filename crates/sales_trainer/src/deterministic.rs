//! Deterministic utilities for reproducible training
//!
//! LCG-based RNG for the train/test shuffle and per-tree subsampling,
//! plus the tie-breaking order for equal-gain splits.

use std::num::Wrapping;

use vgsales_core::SCALE;

/// Linear Congruential Generator for deterministic pseudo-randomness
/// Uses constants from Numerical Recipes (glibc)
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<i64>,
}

impl LcgRng {
    // LCG constants (compatible with glibc)
    const MULTIPLIER: i64 = 1103515245;
    const INCREMENT: i64 = 12345;
    const MODULUS: i64 = 1 << 31;

    pub fn new(seed: i64) -> Self {
        Self {
            state: Wrapping(seed.rem_euclid(Self::MODULUS)),
        }
    }

    /// Next value in `[0, 2^31)`
    pub fn next_i64(&mut self) -> i64 {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
        self.state.0 & (Self::MODULUS - 1)
    }

    /// Value in `[0, max)`; 0 when `max <= 0`
    pub fn next_range(&mut self, max: i64) -> i64 {
        if max <= 0 {
            return 0;
        }
        self.next_i64() % max
    }

    /// Fixed-point value in `[0, SCALE)`
    pub fn next_unit(&mut self) -> i64 {
        let r = self.next_i64();
        ((i128::from(r) * i128::from(SCALE)) / i128::from(Self::MODULUS)) as i64
    }

    /// True with probability `fraction / SCALE`
    pub fn bernoulli(&mut self, fraction: i64) -> bool {
        self.next_unit() < fraction
    }

    /// In-place Fisher–Yates shuffle
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_range(i as i64 + 1) as usize;
            items.swap(i, j);
        }
    }
}

/// Deterministic tie-breaker for split selection
/// Lower wins: ordered by (feature_idx, threshold, node_id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SplitTieBreaker {
    pub feature_idx: usize,
    pub threshold: i64,
    pub node_id: usize,
}

impl SplitTieBreaker {
    pub fn new(feature_idx: usize, threshold: i64, node_id: usize) -> Self {
        Self {
            feature_idx,
            threshold,
            node_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcg_determinism() {
        let mut rng1 = LcgRng::new(42);
        let mut rng2 = LcgRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.next_i64(), rng2.next_i64());
        }
    }

    #[test]
    fn test_negative_seed_is_usable() {
        let mut rng = LcgRng::new(-42);
        assert!((0..100).all(|_| (0..(1 << 31)).contains(&rng.next_i64())));
    }

    #[test]
    fn test_lcg_range() {
        let mut rng = LcgRng::new(42);
        for _ in 0..100 {
            let val = rng.next_range(10);
            assert!((0..10).contains(&val));
        }
        assert_eq!(rng.next_range(0), 0);
    }

    #[test]
    fn test_unit_and_bernoulli_bounds() {
        let mut rng = LcgRng::new(7);
        for _ in 0..1000 {
            assert!((0..SCALE).contains(&rng.next_unit()));
        }
        assert!((0..100).all(|_| rng.bernoulli(SCALE)));
        assert!((0..100).all(|_| !rng.bernoulli(0)));
    }

    #[test]
    fn test_shuffle_is_a_seeded_permutation() {
        let mut a: Vec<usize> = (0..20).collect();
        let mut b = a.clone();
        LcgRng::new(42).shuffle(&mut a);
        LcgRng::new(42).shuffle(&mut b);
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
        assert_ne!(a, sorted);
    }

    #[test]
    fn test_tie_breaker_ordering() {
        let t1 = SplitTieBreaker::new(0, 100, 0);
        let t2 = SplitTieBreaker::new(0, 100, 1);
        let t3 = SplitTieBreaker::new(1, 50, 0);

        assert!(t1 < t2);
        assert!(t1 < t3);
    }
}
