//! Effective implied volatility of a mixed option book.
//!
//! Finds the uniform smile shift `s` at which the floating PnL of the whole
//! book (options plus the underlying hedge) is zero, with long exposure
//! valued on `smile - s` and short exposure on `smile + s`. The result is
//! `long_iv = atm - s` and `short_iv = atm + s`.
//!
//! Holdings are netted per contract (strike, kind) before bucketing, so
//! offsetting long and short positions in one contract only contribute their
//! settled cash and a perfectly hedged book is flat in volatility.

use thiserror::Error;
use tracing::{debug, info_span, warn};

use super::pnl::{StrikePositions, cash_and_open_qty, total_profit};
use crate::config::SolverConfig;
use crate::domain::position::PositionSnapshot;
use crate::domain::shared::tolerance::{is_valid_positive, is_zero, sign};
use crate::domain::smile::SmileInfo;
use crate::observability::span_names;
use crate::pricing::{OptionKind, PricingError};

/// Errors from the effective-IV search. None of them is fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EffectiveIvError {
    /// Shifting the smile does not change the book's PnL.
    #[error("Book PnL does not depend on volatility")]
    FlatBook,

    /// The shift needed would make a volatility non-positive.
    #[error("Volatility would turn non-positive at shift {shift}")]
    NonPositiveVolatility {
        /// Shift that failed.
        shift: f64,
    },

    /// No sign change within the iteration budget.
    #[error("No zero crossing after {iterations} steps")]
    NotBracketed {
        /// Steps taken.
        iterations: u32,
    },

    /// The series has no smile to shift.
    #[error("No smile available for the series")]
    NoSmile,

    /// The smile cannot price a contract of the book.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

impl EffectiveIvError {
    /// Stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::FlatBook => "FLAT_BOOK",
            Self::NonPositiveVolatility { .. } => "NON_POSITIVE_VOLATILITY",
            Self::NotBracketed { .. } => "NOT_BRACKETED",
            Self::NoSmile => "NO_SMILE",
            Self::Pricing(_) => "PRICING_ERROR",
        }
    }
}

/// Break-even volatility levels of a book.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveIv {
    /// Effective volatility of the long sub-book.
    pub long_iv: f64,
    /// Effective volatility of the short sub-book.
    pub short_iv: f64,
    /// At-the-money volatility of the unshifted smile.
    pub atm_iv: f64,
    /// Shift at which the book breaks even.
    pub zero_shift: f64,
    /// Steps taken by the march.
    pub iterations: u32,
}

/// Net open quantity of one contract.
#[derive(Debug, Clone, Copy)]
struct Leg {
    strike: f64,
    kind: OptionKind,
    qty: f64,
}

/// Book reduced to a constant cash term and net legs.
#[derive(Debug)]
struct Book<'a> {
    smile: &'a SmileInfo,
    constant: f64,
    legs: Vec<Leg>,
}

impl Book<'_> {
    /// Book PnL with longs on `smile - shift` and shorts on `smile + shift`.
    fn full_sum(&self, shift: f64) -> Result<f64, EffectiveIvError> {
        let long_smile = self.smile.shifted(-shift);
        let short_smile = self.smile.shifted(shift);
        let mut sum = self.constant;
        for leg in &self.legs {
            let smile = if leg.qty > 0.0 { &long_smile } else { &short_smile };
            let price = smile.option_price(leg.strike, leg.kind).map_err(|e| match e {
                PricingError::NoVolatility { .. } => EffectiveIvError::NonPositiveVolatility { shift },
                other => EffectiveIvError::Pricing(other),
            })?;
            sum += leg.qty * price;
        }
        Ok(sum)
    }
}

/// Bracketing root search over the smile shift.
#[derive(Debug, Clone, Default)]
pub struct EffectiveIvSolver {
    config: SolverConfig,
}

impl EffectiveIvSolver {
    /// Solver with the given settings.
    #[must_use]
    pub const fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Settings.
    #[must_use]
    pub const fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Estimate the break-even volatilities of `strikes` plus the `underlying`
    /// hedge at `bar`. The hedge is marked at the smile's forward and does not
    /// move with the shift.
    ///
    /// # Errors
    ///
    /// `FlatBook`, `NonPositiveVolatility`, `NotBracketed`, or `Pricing` when
    /// the unshifted smile cannot price an open contract.
    pub fn estimate(
        &self,
        smile: &SmileInfo,
        strikes: &[StrikePositions],
        underlying: &[PositionSnapshot],
        bar: usize,
    ) -> Result<EffectiveIv, EffectiveIvError> {
        let _span = info_span!(span_names::EFFECTIVE_IV, bar, strikes = strikes.len()).entered();

        let book = Self::build_book(smile, strikes, underlying, bar);
        let atm_iv = smile.atm_volatility();
        let tolerance = self.config.tolerance;

        let initial = book.full_sum(0.0).map_err(|e| match e {
            EffectiveIvError::NonPositiveVolatility { .. } => {
                EffectiveIvError::Pricing(PricingError::NoVolatility {
                    strike: smile.forward(),
                    value: atm_iv,
                })
            }
            other => other,
        })?;
        if initial.abs() <= tolerance {
            debug!(atm_iv, "Book already at break-even");
            return Ok(EffectiveIv {
                long_iv: atm_iv,
                short_iv: atm_iv,
                atm_iv,
                zero_shift: 0.0,
                iterations: 0,
            });
        }

        let mut step = self.config.initial_step;
        let derivative = match (book.full_sum(step), book.full_sum(-step)) {
            (Ok(up), Ok(down)) => (up - down) / (2.0 * step),
            (Ok(up), Err(_)) => (up - initial) / step,
            (Err(_), Ok(down)) => (initial - down) / step,
            (Err(e), Err(_)) => return Err(e),
        };
        if (derivative * step).abs() <= tolerance {
            warn!(initial, "Book is flat in volatility");
            return Err(EffectiveIvError::FlatBook);
        }
        if sign(derivative) == sign(initial) {
            step = -step;
        }

        let mut prev_shift = 0.0;
        let mut prev_sum = initial;
        for iteration in 1..=self.config.max_iterations {
            let shift = f64::from(iteration) * step;
            let sum = book.full_sum(shift)?;

            let zero_shift = if sum.abs() <= tolerance {
                Some(shift)
            } else if sign(sum) != sign(prev_sum) {
                Some(prev_shift - prev_sum * (shift - prev_shift) / (sum - prev_sum))
            } else {
                None
            };

            if let Some(zero_shift) = zero_shift {
                let long_iv = atm_iv - zero_shift;
                let short_iv = atm_iv + zero_shift;
                if !is_valid_positive(long_iv) || !is_valid_positive(short_iv) {
                    return Err(EffectiveIvError::NonPositiveVolatility { shift: zero_shift });
                }
                debug!(zero_shift, long_iv, short_iv, iterations = iteration, "Effective IV found");
                return Ok(EffectiveIv {
                    long_iv,
                    short_iv,
                    atm_iv,
                    zero_shift,
                    iterations: iteration,
                });
            }

            prev_shift = shift;
            prev_sum = sum;
        }

        Err(EffectiveIvError::NotBracketed {
            iterations: self.config.max_iterations,
        })
    }

    fn build_book<'a>(
        smile: &'a SmileInfo,
        strikes: &[StrikePositions],
        underlying: &[PositionSnapshot],
        bar: usize,
    ) -> Book<'a> {
        let mut constant = total_profit(underlying, bar, smile.forward()).total();
        let mut legs = Vec::new();
        for pair in strikes {
            for kind in [OptionKind::Put, OptionKind::Call] {
                let (cash, open) = cash_and_open_qty(pair.of_kind(kind), bar);
                constant += cash;
                if !is_zero(open) {
                    legs.push(Leg {
                        strike: pair.strike,
                        kind,
                        qty: open,
                    });
                }
            }
        }
        Book {
            smile,
            constant,
            legs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::PositionId;
    use crate::domain::shared::Side;
    use crate::pricing::option_price;

    const F: f64 = 100.0;
    const T: f64 = 0.25;
    const SIGMA: f64 = 0.4;

    fn smile() -> SmileInfo {
        SmileInfo::flat(F, T, 0.0, SIGMA)
    }

    fn theo(k: f64, kind: OptionKind, sigma: f64) -> f64 {
        option_price(F, k, T, sigma, 0.0, kind)
    }

    fn position(side: Side, qty: f64, price: f64) -> PositionSnapshot {
        PositionSnapshot::open(PositionId::new(1), side, qty, price, 0)
    }

    fn calls(strike: f64, calls: Vec<PositionSnapshot>) -> StrikePositions {
        StrikePositions {
            strike,
            puts: Vec::new(),
            calls,
        }
    }

    #[test]
    fn empty_book_is_at_break_even() {
        let result = EffectiveIvSolver::default().estimate(&smile(), &[], &[], 1).unwrap();
        assert_eq!(result.long_iv, SIGMA);
        assert_eq!(result.short_iv, SIGMA);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn hedged_book_is_flat() {
        let book = vec![calls(
            100.0,
            vec![position(Side::Long, 2.0, 7.0), position(Side::Short, 2.0, 8.5)],
        )];
        let err = EffectiveIvSolver::default().estimate(&smile(), &book, &[], 1).unwrap_err();
        assert_eq!(err, EffectiveIvError::FlatBook);
        assert_eq!(err.code(), "FLAT_BOOK");
    }

    #[test]
    fn profitable_long_call_breaks_even_below_atm() {
        let paid = theo(100.0, OptionKind::Call, 0.3);
        let book = vec![calls(100.0, vec![position(Side::Long, 1.0, paid)])];
        let result = EffectiveIvSolver::default().estimate(&smile(), &book, &[], 1).unwrap();

        assert!(result.long_iv < result.atm_iv);
        assert!((result.long_iv - 0.3).abs() < 1e-3, "long_iv = {}", result.long_iv);
        assert!((result.short_iv - (2.0 * SIGMA - result.long_iv)).abs() < 1e-12);
    }

    #[test]
    fn profitable_short_call_breaks_even_above_atm() {
        let received = theo(110.0, OptionKind::Call, 0.5);
        let book = vec![calls(110.0, vec![position(Side::Short, 3.0, received)])];
        let result = EffectiveIvSolver::default().estimate(&smile(), &book, &[], 1).unwrap();

        assert!(result.short_iv > result.atm_iv);
        assert!((result.short_iv - 0.5).abs() < 1e-3, "short_iv = {}", result.short_iv);
    }

    #[test]
    fn losing_long_call_breaks_even_above_atm() {
        let paid = theo(100.0, OptionKind::Call, 0.45);
        let book = vec![calls(100.0, vec![position(Side::Long, 1.0, paid)])];
        let result = EffectiveIvSolver::default().estimate(&smile(), &book, &[], 1).unwrap();
        assert!(result.long_iv > result.atm_iv);
        assert!((result.long_iv - 0.45).abs() < 1e-3);
    }

    #[test]
    fn unreachable_break_even_is_non_positive_volatility() {
        // Paid almost nothing: only a vanishing volatility explains it.
        let book = vec![calls(100.0, vec![position(Side::Long, 1.0, 0.01)])];
        let err = EffectiveIvSolver::default().estimate(&smile(), &book, &[], 1).unwrap_err();
        assert!(matches!(err, EffectiveIvError::NonPositiveVolatility { .. }));
    }

    #[test]
    fn iteration_budget_is_respected() {
        let paid = theo(100.0, OptionKind::Call, 0.2);
        let book = vec![calls(100.0, vec![position(Side::Long, 1.0, paid)])];
        let solver = EffectiveIvSolver::new(SolverConfig {
            max_iterations: 3,
            ..SolverConfig::default()
        });
        assert_eq!(
            solver.estimate(&smile(), &book, &[], 1),
            Err(EffectiveIvError::NotBracketed { iterations: 3 })
        );
    }

    #[test]
    fn underlying_hedge_shifts_constant_term() {
        let paid = theo(100.0, OptionKind::Call, SIGMA);
        let book = vec![calls(100.0, vec![position(Side::Long, 1.0, paid)])];
        // Underlying bought 1 below the forward adds a fixed profit of 1.
        let hedge = vec![position(Side::Long, 1.0, F - 1.0)];
        let result = EffectiveIvSolver::default().estimate(&smile(), &book, &hedge, 1).unwrap();
        assert!(result.long_iv < SIGMA);
    }
}
