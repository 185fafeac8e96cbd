//! Verdict bands for a predicted sales figure
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound (inclusive) of the HIT band, millions of units
pub const HIT_FLOOR: f64 = 1.0;

/// Lower bound (inclusive) of the near-HIT band, millions of units
pub const NEAR_HIT_FLOOR: f64 = 0.8;

/// Outcome band, ordered from worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// `p < 0.8`
    NotHit,
    /// `0.8 <= p < 1.0`
    NearHit,
    /// `p >= 1.0`
    Hit,
}

impl Verdict {
    /// Band a predicted global sales value. Total: NaN lands in `NotHit`.
    pub fn classify(predicted_sales: f64) -> Self {
        if predicted_sales >= HIT_FLOOR {
            Verdict::Hit
        } else if predicted_sales >= NEAR_HIT_FLOOR {
            Verdict::NearHit
        } else {
            Verdict::NotHit
        }
    }

    /// User-facing label
    pub const fn label(self) -> &'static str {
        match self {
            Verdict::Hit => "HIT",
            Verdict::NearHit => "near-HIT",
            Verdict::NotHit => "not HIT",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
