//! Fixed-point conversions
//!
//! Every model-facing quantity (encoded features, targets, thresholds,
//! leaf values, learning rate) is an `i64` scaled by [`SCALE`]. Floats
//! only appear at the edges: CSV input, user input and display.

/// Scaling factor: 1 unit = 10^-6 in real numbers.
pub const SCALE: i64 = 1_000_000;

/// Convert a real value to fixed-point, rounding half away from zero.
///
/// Non-finite inputs map to zero; out-of-range inputs saturate.
#[inline]
pub fn to_fixed(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    // `as` saturates on overflow
    (value * SCALE as f64).round() as i64
}

/// Convert a fixed-point value back to a real number.
#[inline]
pub fn from_fixed(value: i64) -> f64 {
    value as f64 / SCALE as f64
}

/// Fixed-point product `a * b / SCALE` computed in `i128`, saturating to `i64`.
#[inline]
pub fn mul_fixed(a: i64, b: i64) -> i64 {
    let product = (i128::from(a) * i128::from(b)) / i128::from(SCALE);
    product.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}
