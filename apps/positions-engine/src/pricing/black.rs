//! Black (forward) option pricing.
//!
//! Prices are expressed on the forward `f` with discounting at the risk-free
//! rate `r` over `t` years.

// Black uses standard mathematical notation (f, k, t, r, sigma)
// Financial formulas use standard notation where mul_add() obscures meaning
#![allow(clippy::many_single_char_names)]
#![allow(clippy::suboptimal_flops)]

use std::f64::consts::PI;

use super::{OptionKind, PricingError};

/// Standard normal CDF.
pub(crate) fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + libm::erf(x / std::f64::consts::SQRT_2))
}

/// Standard normal PDF.
pub(crate) fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

fn d1(f: f64, k: f64, t: f64, sigma: f64) -> f64 {
    ((f / k).ln() + 0.5 * sigma * sigma * t) / (sigma * t.sqrt())
}

/// Undiscounted intrinsic value.
#[must_use]
pub fn intrinsic(f: f64, k: f64, kind: OptionKind) -> f64 {
    match kind {
        OptionKind::Call => (f - k).max(0.0),
        OptionKind::Put => (k - f).max(0.0),
    }
}

/// Black option price.
///
/// Degenerate inputs collapse to the discounted intrinsic value: an expired
/// option (`t <= 0`) or a zero volatility has no time value.
#[must_use]
pub fn option_price(f: f64, k: f64, t: f64, sigma: f64, r: f64, kind: OptionKind) -> f64 {
    let df = (-r * t.max(0.0)).exp();
    if t <= 0.0 || sigma <= 0.0 || f <= 0.0 || k <= 0.0 {
        return df * intrinsic(f, k, kind);
    }
    let d1_val = d1(f, k, t, sigma);
    let d2_val = d1_val - sigma * t.sqrt();
    match kind {
        OptionKind::Call => df * (f * norm_cdf(d1_val) - k * norm_cdf(d2_val)),
        OptionKind::Put => df * (k * norm_cdf(-d2_val) - f * norm_cdf(-d1_val)),
    }
}

/// Black option price with input validation.
///
/// # Errors
///
/// `NoVolatility` if `sigma` is not a finite positive number, `InvalidInput`
/// for a non-positive forward or strike or a negative time.
pub fn try_option_price(
    f: f64,
    k: f64,
    t: f64,
    sigma: f64,
    r: f64,
    kind: OptionKind,
) -> Result<f64, PricingError> {
    if !f.is_finite() || f <= 0.0 {
        return Err(PricingError::InvalidInput {
            message: format!("Forward must be positive, got: {f}"),
        });
    }
    if !k.is_finite() || k <= 0.0 {
        return Err(PricingError::InvalidInput {
            message: format!("Strike must be positive, got: {k}"),
        });
    }
    if !t.is_finite() || t < 0.0 {
        return Err(PricingError::InvalidInput {
            message: format!("Time to expiry must be non-negative, got: {t}"),
        });
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(PricingError::NoVolatility {
            strike: k,
            value: sigma,
        });
    }
    Ok(option_price(f, k, t, sigma, r, kind))
}

/// Black vega (same for calls and puts), per unit of volatility.
#[must_use]
pub fn vega(f: f64, k: f64, t: f64, sigma: f64, r: f64) -> f64 {
    if t <= 0.0 || sigma <= 0.0 || f <= 0.0 || k <= 0.0 {
        return 0.0;
    }
    let d1_val = d1(f, k, t, sigma);
    (-r * t).exp() * f * norm_pdf(d1_val) * t.sqrt()
}
