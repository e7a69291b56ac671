//! Position side value object.

use serde::{Deserialize, Serialize};

/// Direction of a position or an order intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// Long (bought) exposure.
    Long,
    /// Short (sold) exposure.
    Short,
}

impl Side {
    /// Both sides, long first.
    pub const BOTH: [Self; 2] = [Self::Long, Self::Short];

    /// Build a side from the host's `is_long` flag.
    #[must_use]
    pub const fn from_is_long(is_long: bool) -> Self {
        if is_long { Self::Long } else { Self::Short }
    }

    /// True for [`Side::Long`].
    #[must_use]
    pub const fn is_long(self) -> bool {
        matches!(self, Self::Long)
    }

    /// +1.0 for long, -1.0 for short.
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }

    /// The opposite side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }

    /// Apply this side's sign to an unsigned quantity.
    #[must_use]
    pub fn signed(self, qty: f64) -> f64 {
        self.sign() * qty.abs()
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}
