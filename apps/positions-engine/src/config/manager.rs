//! Position manager configuration.

use serde::{Deserialize, Serialize};

use crate::application::ports::ManagerKind;

/// Position manager settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Cache discriminator: which manager family owns the stored lists.
    #[serde(default)]
    pub kind: ManagerKind,
    /// Store lists under the trade name instead of the instance id.
    #[serde(default)]
    pub use_global_cache: bool,
    /// Simulate fills as virtual positions instead of sending real orders.
    #[serde(default = "default_true")]
    pub use_virtual_positions: bool,
    /// Extend an existing real position instead of opening a new one.
    #[serde(default = "default_true")]
    pub aggregate_positions: bool,
    /// Refuse real orders when the last bar is stale.
    #[serde(default = "default_true")]
    pub check_time: bool,
    /// A bar older than this many intervals is stale.
    #[serde(default = "default_stale_bar_multiplier")]
    pub stale_bar_multiplier: u32,
    /// Virtual positions are opened this many bars before the last bar.
    #[serde(default = "default_virtual_pos_shift")]
    pub virtual_pos_shift: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            kind: ManagerKind::default(),
            use_global_cache: false,
            use_virtual_positions: true,
            aggregate_positions: true,
            check_time: true,
            stale_bar_multiplier: default_stale_bar_multiplier(),
            virtual_pos_shift: default_virtual_pos_shift(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_stale_bar_multiplier() -> u32 {
    3
}

const fn default_virtual_pos_shift() -> usize {
    2
}
