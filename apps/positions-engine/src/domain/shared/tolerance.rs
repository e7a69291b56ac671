//! Tolerance-based floating point comparisons.
//!
//! Quantities and prices are `f64` because they feed straight into the
//! Black pricing formulas. Every "is zero" or "is positive" decision in the
//! crate goes through these helpers instead of exact comparison.

/// Absolute tolerance below which a value is treated as zero.
pub const EPSILON: f64 = 1e-9;

/// Scale-aware tolerance for `value`: absolute near zero, relative for large magnitudes.
#[must_use]
pub fn tolerance_for(value: f64) -> f64 {
    EPSILON * value.abs().max(1.0)
}

/// True if `value` is indistinguishable from zero.
#[must_use]
pub fn is_zero(value: f64) -> bool {
    value.abs() <= EPSILON
}

/// True if `value` is strictly positive beyond tolerance.
#[must_use]
pub fn is_positive(value: f64) -> bool {
    value > EPSILON
}

/// True if `value` is strictly negative beyond tolerance.
#[must_use]
pub fn is_negative(value: f64) -> bool {
    value < -EPSILON
}

/// True if `value` is a finite, strictly positive number.
///
/// Used to validate volatilities coming out of a smile.
#[must_use]
pub fn is_valid_positive(value: f64) -> bool {
    value.is_finite() && is_positive(value)
}

/// True if `a` and `b` are equal within a scale-aware tolerance.
#[must_use]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= tolerance_for(a.abs().max(b.abs()))
}

/// Sign of `value` with a dead zone around zero: -1, 0 or 1.
#[must_use]
pub fn sign(value: f64) -> i8 {
    if is_positive(value) {
        1
    } else if is_negative(value) {
        -1
    } else {
        0
    }
}
