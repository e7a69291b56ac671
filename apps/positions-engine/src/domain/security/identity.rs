//! Immutable key identifying a tradable instrument.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a tradable instrument.
///
/// Equality over all fields decides which stored positions and intents belong
/// to which live security. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityIdentity {
    /// Exchange or dataset name the instrument comes from.
    dataset: String,
    /// Short ticker.
    symbol: String,
    /// Full instrument name (unique within a dataset).
    full_name: String,
    /// Expiration, for derivatives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiration: Option<DateTime<Utc>>,
}

impl SecurityIdentity {
    /// Create an identity without expiration.
    #[must_use]
    pub fn new(
        dataset: impl Into<String>,
        symbol: impl Into<String>,
        full_name: impl Into<String>,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            symbol: symbol.into(),
            full_name: full_name.into(),
            expiration: None,
        }
    }

    /// Attach an expiration timestamp.
    #[must_use]
    pub const fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Dataset name.
    #[must_use]
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Ticker.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Full instrument name.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Expiration, if any.
    #[must_use]
    pub const fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    /// Case-insensitive comparison on the full name only.
    ///
    /// Used by intent cancellation, which addresses a security by name.
    #[must_use]
    pub fn full_name_matches(&self, full_name: &str) -> bool {
        self.full_name.eq_ignore_ascii_case(full_name)
    }
}

impl fmt::Display for SecurityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dataset, self.full_name)
    }
}
