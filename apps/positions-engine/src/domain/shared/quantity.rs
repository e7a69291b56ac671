//! Lot-size and price-step rounding.
//!
//! Rounding is done in `Decimal` so that `0.1 + 0.2` style artifacts never
//! produce a spurious extra lot or a price one tick off.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Round `qty` down to a whole number of lots (toward zero).
///
/// A non-positive or non-finite `lot` leaves the quantity unchanged.
#[must_use]
pub fn round_to_lot(qty: f64, lot: f64) -> f64 {
    round_with(qty, lot, RoundingStrategy::ToZero)
}

/// Round `price` to the nearest multiple of `step`.
///
/// A non-positive or non-finite `step` leaves the price unchanged.
#[must_use]
pub fn round_to_step(price: f64, step: f64) -> f64 {
    round_with(price, step, RoundingStrategy::MidpointAwayFromZero)
}

fn round_with(value: f64, increment: f64, strategy: RoundingStrategy) -> f64 {
    if !value.is_finite() || !increment.is_finite() || increment <= 0.0 {
        return value;
    }
    let (Some(value_d), Some(inc_d)) = (Decimal::from_f64(value), Decimal::from_f64(increment))
    else {
        return value;
    };
    if inc_d.is_zero() {
        return value;
    }
    let units = (value_d / inc_d).round_dp_with_strategy(0, strategy);
    (units * inc_d).to_f64().unwrap_or(value)
}
