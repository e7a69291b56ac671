//! Smile with its pricing context.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::{FlatCurve, InterpolatedCurve, ShiftedCurve, SmileError, VolCurve};
use crate::domain::shared::tolerance::is_valid_positive;
use crate::pricing::{IvSolver, OptionKind, PricingError, try_option_price};

/// Market quote used to build a smile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    /// Strike.
    pub strike: f64,
    /// Option price.
    pub price: f64,
    /// Call or put.
    pub kind: OptionKind,
}

/// Forward, time to expiry, rate and a strike to volatility curve.
#[derive(Debug, Clone)]
pub struct SmileInfo {
    forward: f64,
    time_to_expiry: f64,
    risk_free_rate: f64,
    curve: Arc<dyn VolCurve>,
}

impl SmileInfo {
    /// Smile over an arbitrary curve.
    #[must_use]
    pub fn new(
        forward: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        curve: Arc<dyn VolCurve>,
    ) -> Self {
        Self {
            forward,
            time_to_expiry,
            risk_free_rate,
            curve,
        }
    }

    /// Smile with the same volatility at every strike.
    #[must_use]
    pub fn flat(forward: f64, time_to_expiry: f64, risk_free_rate: f64, sigma: f64) -> Self {
        Self::new(
            forward,
            time_to_expiry,
            risk_free_rate,
            Arc::new(FlatCurve::new(sigma)),
        )
    }

    /// Build an interpolated smile by inverting option quotes.
    ///
    /// Quotes the solver cannot invert are skipped. When a strike is quoted
    /// twice (put and call), the out-of-the-money side wins.
    ///
    /// # Errors
    ///
    /// `NoSolvableQuotes` when no quote can be inverted.
    pub fn from_quotes(
        forward: f64,
        time_to_expiry: f64,
        risk_free_rate: f64,
        quotes: &[OptionQuote],
        solver: &IvSolver,
    ) -> Result<Self, SmileError> {
        let mut points: Vec<(f64, f64, bool)> = Vec::with_capacity(quotes.len());
        for quote in quotes {
            let iv = match solver.solve(
                quote.price,
                forward,
                quote.strike,
                time_to_expiry,
                risk_free_rate,
                quote.kind,
            ) {
                Ok(iv) => iv,
                Err(e) => {
                    debug!(strike = quote.strike, kind = %quote.kind, error = %e, "Skipping unsolvable quote");
                    continue;
                }
            };
            let otm = match quote.kind {
                OptionKind::Call => quote.strike >= forward,
                OptionKind::Put => quote.strike <= forward,
            };
            match points.iter_mut().find(|p| p.0 == quote.strike) {
                Some(existing) if otm && !existing.2 => *existing = (quote.strike, iv, otm),
                Some(_) => {}
                None => points.push((quote.strike, iv, otm)),
            }
        }
        if points.is_empty() {
            return Err(SmileError::NoSolvableQuotes {
                count: quotes.len(),
            });
        }
        let curve = InterpolatedCurve::new(points.into_iter().map(|(k, v, _)| (k, v)).collect())?;
        Ok(Self::new(
            forward,
            time_to_expiry,
            risk_free_rate,
            Arc::new(curve),
        ))
    }

    /// Forward price.
    #[must_use]
    pub const fn forward(&self) -> f64 {
        self.forward
    }

    /// Time to expiry in years.
    #[must_use]
    pub const fn time_to_expiry(&self) -> f64 {
        self.time_to_expiry
    }

    /// Risk-free rate.
    #[must_use]
    pub const fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    /// Raw curve value at `strike`.
    #[must_use]
    pub fn volatility(&self, strike: f64) -> f64 {
        self.curve.volatility(strike)
    }

    /// Curve slope at `strike`.
    #[must_use]
    pub fn derivative(&self, strike: f64) -> f64 {
        self.curve.derivative(strike)
    }

    /// Volatility at the forward.
    #[must_use]
    pub fn atm_volatility(&self) -> f64 {
        self.curve.volatility(self.forward)
    }

    /// Volatility at `strike`, rejected unless finite and positive.
    ///
    /// # Errors
    ///
    /// `NoVolatility` when the curve returns NaN, infinity or a non-positive value.
    pub fn try_volatility(&self, strike: f64) -> Result<f64, PricingError> {
        let value = self.curve.volatility(strike);
        if is_valid_positive(value) {
            Ok(value)
        } else {
            Err(PricingError::NoVolatility { strike, value })
        }
    }

    /// A new smile with every volatility moved by `shift`.
    #[must_use]
    pub fn shifted(&self, shift: f64) -> Self {
        Self {
            curve: Arc::new(ShiftedCurve::new(Arc::clone(&self.curve), shift)),
            ..self.clone()
        }
    }

    /// Theoretical price at `strike` using `sigma` instead of the curve.
    ///
    /// # Errors
    ///
    /// Propagates pricing input validation.
    pub fn price_with_volatility(
        &self,
        strike: f64,
        sigma: f64,
        kind: OptionKind,
    ) -> Result<f64, PricingError> {
        try_option_price(
            self.forward,
            strike,
            self.time_to_expiry,
            sigma,
            self.risk_free_rate,
            kind,
        )
    }

    /// Theoretical price at `strike` using the curve volatility.
    ///
    /// # Errors
    ///
    /// `NoVolatility` when the curve has no usable volatility at `strike`.
    pub fn option_price(&self, strike: f64, kind: OptionKind) -> Result<f64, PricingError> {
        let sigma = self.try_volatility(strike)?;
        self.price_with_volatility(strike, sigma, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::option_price;

    #[test]
    fn atm_volatility_reads_curve_at_forward() {
        let curve = InterpolatedCurve::new(vec![(90.0, 0.4), (110.0, 0.2)]).unwrap();
        let smile = SmileInfo::new(100.0, 0.25, 0.0, Arc::new(curve));
        assert!((smile.atm_volatility() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn shifted_returns_new_instance() {
        let smile = SmileInfo::flat(100.0, 0.25, 0.0, 0.3);
        let down = smile.shifted(-0.1);
        assert!((down.volatility(100.0) - 0.2).abs() < 1e-12);
        assert!((smile.volatility(100.0) - 0.3).abs() < 1e-12);
        assert_eq!(down.forward(), 100.0);
    }

    #[test]
    fn try_volatility_rejects_non_positive() {
        let smile = SmileInfo::flat(100.0, 0.25, 0.0, 0.3).shifted(-0.5);
        assert!(matches!(
            smile.try_volatility(100.0),
            Err(PricingError::NoVolatility { .. })
        ));
        assert!(smile.option_price(100.0, OptionKind::Call).is_err());
    }

    #[test]
    fn from_quotes_recovers_volatilities() {
        let (f, t) = (100.0, 0.5);
        let quotes: Vec<OptionQuote> = [(80.0, 0.35, OptionKind::Put), (100.0, 0.30, OptionKind::Call), (120.0, 0.28, OptionKind::Call)]
            .iter()
            .map(|&(k, v, kind)| OptionQuote {
                strike: k,
                price: option_price(f, k, t, v, 0.0, kind),
                kind,
            })
            .collect();

        let smile = SmileInfo::from_quotes(f, t, 0.0, &quotes, &IvSolver::default()).unwrap();
        assert!((smile.volatility(80.0) - 0.35).abs() < 0.005);
        assert!((smile.volatility(100.0) - 0.30).abs() < 0.005);
        assert!((smile.volatility(120.0) - 0.28).abs() < 0.005);
    }

    #[test]
    fn from_quotes_fails_without_solvable_quotes() {
        let quotes = [OptionQuote {
            strike: 100.0,
            price: -1.0,
            kind: OptionKind::Call,
        }];
        let err = SmileInfo::from_quotes(100.0, 0.5, 0.0, &quotes, &IvSolver::default());
        assert!(matches!(err, Err(SmileError::NoSolvableQuotes { count: 1 })));
    }
}
