//! Results of manager calls.

use serde::Serialize;

use crate::domain::position::PositionId;

/// Why an order or intent call did nothing. None of these is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// New trading is globally blocked.
    TradingBlocked,
    /// `execute` has not confirmed every security's portfolio state.
    PortfolioNotReady,
    /// Bar history is still loading.
    BarsNotLoaded,
    /// The last bar is older than the staleness window.
    StaleBars,
    /// More than one stored virtual position of the side exists.
    DuplicateVirtualPositions,
    /// The host refused the order.
    HostRejected,
    /// A persisted list could not be read or written.
    StoreUnavailable,
}

impl SkipReason {
    /// Stable code for logs.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::TradingBlocked => "TRADING_BLOCKED",
            Self::PortfolioNotReady => "PORTFOLIO_NOT_READY",
            Self::BarsNotLoaded => "BARS_NOT_LOADED",
            Self::StaleBars => "STALE_BARS",
            Self::DuplicateVirtualPositions => "DUPLICATE_VIRTUAL_POSITIONS",
            Self::HostRejected => "HOST_REJECTED",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
        }
    }

    /// True when the same order may succeed on a later step.
    ///
    /// Host rejections and duplicate virtual positions need outside
    /// intervention, so retrying them every bar would only repeat the failure.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        !matches!(self, Self::DuplicateVirtualPositions | Self::HostRejected)
    }
}

/// What an order or intent call did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OrderOutcome {
    /// Zero quantity.
    NoOp,
    /// Nothing happened, for an expected reason.
    Skipped {
        /// Why.
        reason: SkipReason,
    },
    /// A new virtual position was opened.
    VirtualOpened {
        /// Live position.
        id: PositionId,
        /// Unsigned quantity.
        shares: f64,
        /// Entry price.
        price: f64,
    },
    /// An older virtual position was grown in place.
    VirtualMerged {
        /// Live position.
        id: PositionId,
        /// Unsigned quantity after the merge.
        shares: f64,
        /// Volume-weighted entry price.
        price: f64,
    },
    /// A same-bar virtual position was cancelled and recreated merged.
    VirtualReplaced {
        /// New live position.
        id: PositionId,
        /// Unsigned quantity after the merge.
        shares: f64,
        /// Volume-weighted entry price.
        price: f64,
    },
    /// A new real position was opened.
    RealOpened {
        /// Live position.
        id: PositionId,
        /// Unsigned quantity.
        shares: f64,
        /// Fill price.
        price: f64,
    },
    /// An existing real position was extended.
    RealExtended {
        /// Live position.
        id: PositionId,
        /// Unsigned quantity after the extension.
        shares: f64,
        /// Price the position was re-marked to (the incoming fill price).
        price: f64,
    },
    /// A volatility intent was stored.
    IntentQueued {
        /// Signed target quantity.
        target_shares: f64,
    },
}

impl OrderOutcome {
    /// Shorthand for `Skipped { reason }`.
    #[must_use]
    pub const fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }

    /// Skip reason, if skipped.
    #[must_use]
    pub const fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Skipped { reason } => Some(*reason),
            _ => None,
        }
    }

    /// True when a position was opened or changed.
    #[must_use]
    pub const fn is_filled(&self) -> bool {
        matches!(
            self,
            Self::VirtualOpened { .. }
                | Self::VirtualMerged { .. }
                | Self::VirtualReplaced { .. }
                | Self::RealOpened { .. }
                | Self::RealExtended { .. }
        )
    }
}

/// Optional maintenance performed at the end of `execute`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepRequest {
    /// Mirror real exposure into virtual positions.
    pub import_real_positions: bool,
    /// Drop every virtual position.
    pub drop_virtual_positions: bool,
}

/// Counters of one `execute` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Virtual positions recreated in the book.
    pub restored: usize,
    /// Records whose live position already existed.
    pub already_present: usize,
    /// Records skipped (unresolvable security or host rejection).
    pub restore_skipped: usize,
    /// Every security reported a ready portfolio.
    pub ready: bool,
    /// Pending orders taken from the queue and placed.
    pub pending_executed: usize,
    /// Pending orders left queued for a later step.
    pub pending_kept: usize,
    /// Pending orders discarded after a non-retryable skip.
    pub pending_dropped: usize,
    /// Intents that issued a filled order this step.
    pub intents_issued: usize,
    /// Intents removed because their target was reached.
    pub intents_satisfied: usize,
    /// Intents left queued without an order.
    pub intents_kept: usize,
    /// Virtual positions created from real exposure.
    pub imported: usize,
    /// Virtual records dropped.
    pub dropped: usize,
}
