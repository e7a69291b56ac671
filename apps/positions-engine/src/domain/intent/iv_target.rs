//! Volatility-quoted order intent.

use serde::{Deserialize, Serialize};

use crate::domain::security::SecurityIdentity;
use crate::domain::shared::{Side, round_to_lot};

/// How the quote volatility of an intent is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteMode {
    /// `entry_iv` is the volatility to quote at.
    #[default]
    AbsoluteIv,
    /// `entry_iv` is added to the smile volatility at the option's strike.
    SmileShift,
}

/// Volatility quote parameters of a `buy_volatility`/`sell_volatility` call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolQuote {
    /// Interpretation of `iv`.
    pub mode: QuoteMode,
    /// Absolute IV or IV shift.
    pub iv: f64,
    /// Extra price shift in price steps.
    pub price_shift: f64,
}

impl VolQuote {
    /// Quote at an absolute volatility.
    #[must_use]
    pub const fn absolute(iv: f64) -> Self {
        Self {
            mode: QuoteMode::AbsoluteIv,
            iv,
            price_shift: 0.0,
        }
    }

    /// Quote at the smile volatility plus `shift`.
    #[must_use]
    pub const fn smile_shift(shift: f64) -> Self {
        Self {
            mode: QuoteMode::SmileShift,
            iv: shift,
            price_shift: 0.0,
        }
    }

    /// Add a price shift in price steps.
    #[must_use]
    pub const fn with_price_shift(mut self, steps: f64) -> Self {
        self.price_shift = steps;
        self
    }
}

/// Pending instruction to reach a target quantity of one side in one security.
///
/// At most one intent exists per (security, side); a newer intent replaces the
/// older one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IvTarget {
    /// Owning security.
    pub security: SecurityIdentity,
    /// Direction of the exposure being built.
    pub side: Side,
    /// Signed target quantity (negative for shorts).
    pub target_shares: f64,
    /// Interpretation of `entry_iv`.
    pub quote_mode: QuoteMode,
    /// Absolute IV or IV shift, depending on `quote_mode`.
    pub entry_iv: f64,
    /// Extra price shift in price steps; positive is more aggressive.
    pub price_shift: f64,
    /// Signal name for the orders issued.
    pub signal_name: String,
    /// Free-text notes.
    #[serde(default)]
    pub notes: String,
}

impl IvTarget {
    /// Intent to reach `target_shares` on `side` of `security`, quoted per `quote`.
    #[must_use]
    pub fn new(
        security: SecurityIdentity,
        side: Side,
        target_shares: f64,
        quote: VolQuote,
        signal_name: impl Into<String>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            security,
            side,
            target_shares: side.signed(target_shares),
            quote_mode: quote.mode,
            entry_iv: quote.iv,
            price_shift: quote.price_shift,
            signal_name: signal_name.into(),
            notes: notes.into(),
        }
    }

    /// Quantity still needed, rounded down to whole lots.
    ///
    /// `current_shares` is the signed quantity currently held on this side.
    /// A non-positive result means the target is reached.
    #[must_use]
    pub fn remaining(&self, current_shares: f64, lot_size: f64) -> f64 {
        round_to_lot(self.target_shares.abs() - current_shares.abs(), lot_size)
    }

    /// Volatility to quote at, given the smile volatility at the strike.
    #[must_use]
    pub fn quote_volatility(&self, smile_iv: f64) -> f64 {
        match self.quote_mode {
            QuoteMode::AbsoluteIv => self.entry_iv,
            QuoteMode::SmileShift => smile_iv + self.entry_iv,
        }
    }

    /// Apply the price shift to a theoretical price.
    ///
    /// Longs pay up, shorts sell lower, for a positive shift.
    #[must_use]
    pub fn shifted_price(&self, theoretical: f64, price_step: f64) -> f64 {
        theoretical + self.side.sign() * self.price_shift * price_step
    }
}
