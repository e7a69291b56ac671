//! Implied Volatility Solver
//!
//! Inverts the Black formula on a forward:
//! - Newton-Raphson: fast convergence near the money
//! - Corrado-Miller: initial guess for Newton-Raphson
//! - Bisection: guaranteed convergence far from the money or when vega vanishes

#![allow(clippy::many_single_char_names)]
#![allow(clippy::suboptimal_flops)]

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

use super::OptionKind;
use super::black::{intrinsic, option_price, vega};

/// Errors from IV computation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IvError {
    /// Convergence failed after max iterations.
    #[error(
        "IV solver failed to converge after {iterations} iterations (last error: {last_error:.6})"
    )]
    ConvergenceFailed {
        /// Number of iterations attempted.
        iterations: u32,
        /// Last price error.
        last_error: f64,
    },

    /// Invalid input parameters.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message.
        message: String,
    },

    /// No solution exists (e.g., price below intrinsic value).
    #[error("No valid IV solution: {reason}")]
    NoSolution {
        /// Reason no solution exists.
        reason: String,
    },
}

/// Configuration for the IV solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IvSolverConfig {
    /// Maximum iterations for Newton-Raphson and bisection.
    pub max_iterations: u32,
    /// Convergence tolerance (absolute price error).
    pub tolerance: f64,
    /// Minimum volatility bound.
    pub min_vol: f64,
    /// Maximum volatility bound.
    pub max_vol: f64,
    /// Use bisection when |ln(F/K)| exceeds this.
    pub hybrid_threshold: f64,
}

impl Default for IvSolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-8,
            min_vol: 0.001,
            max_vol: 5.0,
            hybrid_threshold: 0.20,
        }
    }
}

/// Implied Volatility Solver.
#[derive(Debug, Clone, Default)]
pub struct IvSolver {
    config: IvSolverConfig,
}

impl IvSolver {
    /// Create a new IV solver with the given configuration.
    #[must_use]
    pub const fn new(config: IvSolverConfig) -> Self {
        Self { config }
    }

    /// Solver configuration.
    #[must_use]
    pub const fn config(&self) -> &IvSolverConfig {
        &self.config
    }

    /// Compute implied volatility from an option price.
    ///
    /// # Arguments
    ///
    /// * `market_price` - Observed option price
    /// * `f` - Forward price
    /// * `k` - Strike
    /// * `t` - Time to expiry (years)
    /// * `r` - Risk-free rate
    /// * `kind` - Call or put
    ///
    /// # Errors
    ///
    /// Returns an error if inputs are invalid, the price is outside the
    /// attainable range, or the solver does not converge.
    pub fn solve(
        &self,
        market_price: f64,
        f: f64,
        k: f64,
        t: f64,
        r: f64,
        kind: OptionKind,
    ) -> Result<f64, IvError> {
        Self::validate_inputs(market_price, f, k, t)?;

        let df = (-r * t).exp();
        let floor = df * intrinsic(f, k, kind);
        if market_price < floor - self.config.tolerance {
            return Err(IvError::NoSolution {
                reason: format!(
                    "Market price ({market_price:.4}) is below intrinsic value ({floor:.4})"
                ),
            });
        }

        let moneyness = (f / k).ln().abs();
        if moneyness > self.config.hybrid_threshold {
            self.bisection(market_price, f, k, t, r, kind)
        } else {
            let guess = self.corrado_miller_guess(market_price, f, k, t, r, kind);
            self.newton_raphson(market_price, f, k, t, r, kind, guess)
                .or_else(|_| self.bisection(market_price, f, k, t, r, kind))
        }
    }

    fn validate_inputs(market_price: f64, f: f64, k: f64, t: f64) -> Result<(), IvError> {
        if !market_price.is_finite() || market_price <= 0.0 {
            return Err(IvError::InvalidInput {
                message: format!("Market price must be positive, got: {market_price}"),
            });
        }
        if !f.is_finite() || f <= 0.0 {
            return Err(IvError::InvalidInput {
                message: format!("Forward price must be positive, got: {f}"),
            });
        }
        if !k.is_finite() || k <= 0.0 {
            return Err(IvError::InvalidInput {
                message: format!("Strike price must be positive, got: {k}"),
            });
        }
        if !t.is_finite() || t <= 0.0 {
            return Err(IvError::InvalidInput {
                message: format!("Time to expiration must be positive, got: {t}"),
            });
        }
        Ok(())
    }

    /// Modified Corrado-Miller initial guess.
    fn corrado_miller_guess(
        &self,
        market_price: f64,
        f: f64,
        k: f64,
        t: f64,
        r: f64,
        kind: OptionKind,
    ) -> f64 {
        let df = (-r * t).exp();

        // Put-call parity to a call price
        let call_price = match kind {
            OptionKind::Call => market_price,
            OptionKind::Put => market_price + df * (f - k),
        };

        let x = f - k;
        let y = call_price / df;
        if y <= 0.0 {
            return 0.30;
        }

        let numerator = y - 0.5 * x;
        let sqrt_term = (y - 0.5 * x).powi(2) - (x.powi(2) / PI);
        if sqrt_term < 0.0 {
            return 0.30;
        }

        let sigma_approx = (PI / (2.0 * t)).sqrt() * (numerator + sqrt_term.sqrt()) / f;
        sigma_approx.clamp(self.config.min_vol, self.config.max_vol)
    }

    #[allow(clippy::too_many_arguments)]
    fn newton_raphson(
        &self,
        market_price: f64,
        f: f64,
        k: f64,
        t: f64,
        r: f64,
        kind: OptionKind,
        initial_guess: f64,
    ) -> Result<f64, IvError> {
        let mut sigma = initial_guess.clamp(self.config.min_vol, self.config.max_vol);

        for i in 0..self.config.max_iterations {
            let error = option_price(f, k, t, sigma, r, kind) - market_price;
            if error.abs() < self.config.tolerance {
                return Ok(sigma);
            }

            let v = vega(f, k, t, sigma, r);
            if v.abs() < 1e-12 {
                return Err(IvError::ConvergenceFailed {
                    iterations: i,
                    last_error: error.abs(),
                });
            }

            sigma -= error / v;
            sigma = sigma.clamp(self.config.min_vol, self.config.max_vol);
        }

        Err(IvError::ConvergenceFailed {
            iterations: self.config.max_iterations,
            last_error: (option_price(f, k, t, sigma, r, kind) - market_price).abs(),
        })
    }

    fn bisection(
        &self,
        market_price: f64,
        f: f64,
        k: f64,
        t: f64,
        r: f64,
        kind: OptionKind,
    ) -> Result<f64, IvError> {
        let mut low = self.config.min_vol;
        let mut high = self.config.max_vol;

        let price_low = option_price(f, k, t, low, r, kind);
        let price_high = option_price(f, k, t, high, r, kind);

        if market_price < price_low {
            return Err(IvError::NoSolution {
                reason: format!(
                    "Market price ({market_price:.4}) is below minimum theoretical price ({price_low:.4})"
                ),
            });
        }
        if market_price > price_high {
            return Err(IvError::NoSolution {
                reason: format!(
                    "Market price ({market_price:.4}) exceeds maximum theoretical price ({price_high:.4})"
                ),
            });
        }

        for _ in 0..self.config.max_iterations {
            let mid = low.midpoint(high);
            let error = option_price(f, k, t, mid, r, kind) - market_price;

            if error.abs() < self.config.tolerance {
                return Ok(mid);
            }
            if error > 0.0 {
                high = mid;
            } else {
                low = mid;
            }
            if (high - low) < 1e-10 {
                return Ok(mid);
            }
        }

        Err(IvError::ConvergenceFailed {
            iterations: self.config.max_iterations,
            last_error: (option_price(f, k, t, low.midpoint(high), r, kind) - market_price).abs(),
        })
    }
}
