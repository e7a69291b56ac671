//! Position subset selector for aggregations.

use serde::{Deserialize, Serialize};

use super::PositionSnapshot;

/// Selects which positions of a security participate in an aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalProfitAlgo {
    /// Real and virtual positions.
    #[default]
    AllPositions,
    /// Only positions backed by broker orders.
    RealPositions,
    /// Only simulated positions.
    VirtualPositions,
}

impl TotalProfitAlgo {
    /// True if `position` belongs to this subset.
    #[must_use]
    pub const fn includes(self, position: &PositionSnapshot) -> bool {
        match self {
            Self::AllPositions => true,
            Self::RealPositions => !position.is_virtual,
            Self::VirtualPositions => position.is_virtual,
        }
    }
}
