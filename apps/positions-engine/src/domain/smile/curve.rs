//! Strike to volatility curves.

use std::fmt::Debug;
use std::sync::Arc;

use super::SmileError;

/// A continuous strike to implied-volatility function with its first derivative.
pub trait VolCurve: Debug + Send + Sync {
    /// Implied volatility at `strike`.
    fn volatility(&self, strike: f64) -> f64;

    /// d(volatility)/d(strike) at `strike`.
    fn derivative(&self, strike: f64) -> f64;
}

/// Same volatility at every strike.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatCurve {
    sigma: f64,
}

impl FlatCurve {
    /// Flat curve at `sigma`.
    #[must_use]
    pub const fn new(sigma: f64) -> Self {
        Self { sigma }
    }
}

impl VolCurve for FlatCurve {
    fn volatility(&self, _strike: f64) -> f64 {
        self.sigma
    }

    fn derivative(&self, _strike: f64) -> f64 {
        0.0
    }
}

/// Piecewise-linear curve through `(strike, volatility)` points with flat
/// extrapolation beyond the outermost strikes.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedCurve {
    points: Vec<(f64, f64)>,
}

impl InterpolatedCurve {
    /// Build from unordered points.
    ///
    /// # Errors
    ///
    /// Empty input, a non-finite or non-positive coordinate, or duplicate strikes.
    pub fn new(mut points: Vec<(f64, f64)>) -> Result<Self, SmileError> {
        if points.is_empty() {
            return Err(SmileError::EmptyCurve);
        }
        for &(strike, volatility) in &points {
            if !strike.is_finite() || !volatility.is_finite() || strike <= 0.0 || volatility <= 0.0
            {
                return Err(SmileError::InvalidPoint { strike, volatility });
            }
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        if let Some(pair) = points.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(SmileError::DuplicateStrike { strike: pair[0].0 });
        }
        Ok(Self { points })
    }

    /// Points in strike order.
    #[must_use]
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Index `i` such that `points[i].0 <= strike < points[i + 1].0`, if inside.
    fn segment(&self, strike: f64) -> Option<usize> {
        let idx = self.points.partition_point(|p| p.0 <= strike);
        (idx > 0 && idx < self.points.len()).then(|| idx - 1)
    }
}

impl VolCurve for InterpolatedCurve {
    fn volatility(&self, strike: f64) -> f64 {
        let (first, last) = (self.points[0], self.points[self.points.len() - 1]);
        if strike <= first.0 {
            return first.1;
        }
        if strike >= last.0 {
            return last.1;
        }
        match self.segment(strike) {
            Some(i) => {
                let (k0, v0) = self.points[i];
                let (k1, v1) = self.points[i + 1];
                v0 + (v1 - v0) * (strike - k0) / (k1 - k0)
            }
            None => last.1,
        }
    }

    fn derivative(&self, strike: f64) -> f64 {
        match self.segment(strike) {
            Some(i) => {
                let (k0, v0) = self.points[i];
                let (k1, v1) = self.points[i + 1];
                (v1 - v0) / (k1 - k0)
            }
            None => 0.0,
        }
    }
}

/// Another curve moved up or down by a constant volatility shift.
#[derive(Debug, Clone)]
pub struct ShiftedCurve {
    inner: Arc<dyn VolCurve>,
    shift: f64,
}

impl ShiftedCurve {
    /// Shift `inner` by `shift` volatility points.
    #[must_use]
    pub fn new(inner: Arc<dyn VolCurve>, shift: f64) -> Self {
        Self { inner, shift }
    }

    /// The applied shift.
    #[must_use]
    pub const fn shift(&self) -> f64 {
        self.shift
    }
}

impl VolCurve for ShiftedCurve {
    fn volatility(&self, strike: f64) -> f64 {
        self.inner.volatility(strike) + self.shift
    }

    fn derivative(&self, strike: f64) -> f64 {
        self.inner.derivative(strike)
    }
}
