//! Application Services
//!
//! Pure computations over position lists and smiles:
//! - [`pnl`]: floating PnL aggregation
//! - [`effective_iv`]: break-even volatility of a mixed option book

pub mod effective_iv;
pub mod pnl;

pub use effective_iv::{EffectiveIv, EffectiveIvError, EffectiveIvSolver};
pub use pnl::{
    ProfitBreakdown, StrikePositions, option_profit, total_profit, total_qty, try_options_pnl,
    try_pair_pnl,
};
