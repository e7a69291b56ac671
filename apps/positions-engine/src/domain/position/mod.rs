//! Position Context
//!
//! - [`PositionSnapshot`]: a copy of a live, host-owned position
//! - [`PositionRecord`]: the persisted snapshot used to recreate virtual positions
//! - [`TotalProfitAlgo`]: which positions take part in an aggregation

mod profit_algo;
mod record;
mod snapshot;

pub use profit_algo::TotalProfitAlgo;
pub use record::PositionRecord;
pub use snapshot::{PositionId, PositionSnapshot};
