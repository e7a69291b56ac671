//! Position PnL aggregation.
//!
//! Floating PnL is `cash + pnl`:
//! - `cash` is what entering (and, if closed, exiting) cost or earned,
//!   commissions included
//! - `pnl` is the signed mark-to-market value of what is still open
//!
//! All functions are pure over the position list.

use std::ops::{Add, AddAssign};

use crate::domain::position::PositionSnapshot;
use crate::domain::shared::tolerance::is_zero;
use crate::domain::smile::SmileInfo;
use crate::pricing::{OptionKind, PricingError};

/// Cash and mark-to-market components of floating PnL.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProfitBreakdown {
    /// Settled cash flows.
    pub cash: f64,
    /// Value of open quantity at the valuation price.
    pub pnl: f64,
}

impl ProfitBreakdown {
    /// `cash + pnl`.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.cash + self.pnl
    }
}

impl Add for ProfitBreakdown {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            cash: self.cash + rhs.cash,
            pnl: self.pnl + rhs.pnl,
        }
    }
}

impl AddAssign for ProfitBreakdown {
    fn add_assign(&mut self, rhs: Self) {
        self.cash += rhs.cash;
        self.pnl += rhs.pnl;
    }
}

/// Signed sum of `sign(side) * |shares|`.
#[must_use]
pub fn total_qty(positions: &[PositionSnapshot]) -> f64 {
    positions.iter().map(PositionSnapshot::signed_shares).sum()
}

/// Cash flows of the positions entered by `bar`, and the signed quantity
/// still open at `bar`.
pub(crate) fn cash_and_open_qty(positions: &[PositionSnapshot], bar: usize) -> (f64, f64) {
    let mut cash = 0.0;
    let mut open = 0.0;
    for position in positions.iter().filter(|p| p.is_closed_or_active_for_bar(bar)) {
        let qty = position.signed_shares();
        cash -= qty * position.average_entry_price + position.entry_commission;
        match position.exit_price {
            Some(exit) if position.is_closed_by(bar) => {
                cash += qty * exit - position.exit_commission;
            }
            _ => open += qty,
        }
    }
    (cash, open)
}

/// Floating PnL of `positions` at `bar`, marking open quantity at `mark_price`.
#[must_use]
pub fn total_profit(positions: &[PositionSnapshot], bar: usize, mark_price: f64) -> ProfitBreakdown {
    let (cash, open) = cash_and_open_qty(positions, bar);
    ProfitBreakdown {
        cash,
        pnl: open * mark_price,
    }
}

/// Floating PnL of option positions, marking open quantity at the smile's
/// theoretical price for `strike`.
///
/// # Errors
///
/// `NoVolatility` when open quantity exists and the smile has no usable
/// volatility at `strike`.
pub fn option_profit(
    positions: &[PositionSnapshot],
    bar: usize,
    smile: &SmileInfo,
    strike: f64,
    kind: OptionKind,
) -> Result<ProfitBreakdown, PricingError> {
    let (cash, open) = cash_and_open_qty(positions, bar);
    let pnl = if is_zero(open) {
        0.0
    } else {
        open * smile.option_price(strike, kind)?
    };
    Ok(ProfitBreakdown { cash, pnl })
}

/// Positions of one strike of a series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrikePositions {
    /// Strike.
    pub strike: f64,
    /// Put positions.
    pub puts: Vec<PositionSnapshot>,
    /// Call positions.
    pub calls: Vec<PositionSnapshot>,
}

impl StrikePositions {
    /// Positions of `kind`.
    #[must_use]
    pub fn of_kind(&self, kind: OptionKind) -> &[PositionSnapshot] {
        match kind {
            OptionKind::Put => &self.puts,
            OptionKind::Call => &self.calls,
        }
    }

    /// True when neither leg holds a position.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty() && self.calls.is_empty()
    }
}

/// Put plus call PnL at one strike.
///
/// # Errors
///
/// Propagates `option_profit` failures; the pair is then not computable.
pub fn try_pair_pnl(
    pair: &StrikePositions,
    bar: usize,
    smile: &SmileInfo,
) -> Result<ProfitBreakdown, PricingError> {
    let puts = option_profit(&pair.puts, bar, smile, pair.strike, OptionKind::Put)?;
    let calls = option_profit(&pair.calls, bar, smile, pair.strike, OptionKind::Call)?;
    Ok(puts + calls)
}

/// PnL over every strike of a series.
///
/// # Errors
///
/// The first strike that is not computable.
pub fn try_options_pnl(
    pairs: &[StrikePositions],
    bar: usize,
    smile: &SmileInfo,
) -> Result<ProfitBreakdown, PricingError> {
    pairs.iter().try_fold(ProfitBreakdown::default(), |acc, pair| {
        Ok(acc + try_pair_pnl(pair, bar, smile)?)
    })
}
