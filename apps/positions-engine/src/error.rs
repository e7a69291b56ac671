//! Error types for the positions engine.
//!
//! Only [`PositionsError`] escapes a per-bar entry point, and only for
//! conditions that mean the reconciliation state machine itself is broken.
//! Expected conditions (blocked trading, portfolio not ready, stale bars)
//! are reported as [`crate::application::SkipReason`] values instead.

use thiserror::Error;

use crate::application::ports::CacheKey;
use crate::domain::security::SecurityIdentity;
use crate::domain::shared::Side;

/// Fatal errors surfaced to the host.
#[derive(Debug, Error)]
pub enum PositionsError {
    /// A live position disagrees with the direction the protocol guarantees.
    #[error("Invariant violation on {security}: {message}")]
    InvariantViolation {
        /// Security the violation was detected on.
        security: String,
        /// What was inconsistent.
        message: String,
    },

    /// A persisted list could not be read or written.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl PositionsError {
    /// Build an invariant violation.
    #[must_use]
    pub fn invariant(security: &SecurityIdentity, message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            security: security.to_string(),
            message: message.into(),
        }
    }

    /// Stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvariantViolation { .. } => "INVARIANT_VIOLATION",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }
}

/// Errors from encoding or decoding a persisted list.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Stored blob is not a valid list.
    #[error("Failed to decode {key}: {message}")]
    Decode {
        /// Key of the blob.
        key: String,
        /// Decoder message.
        message: String,
    },

    /// List could not be serialized.
    #[error("Failed to encode {key}: {message}")]
    Encode {
        /// Key of the blob.
        key: String,
        /// Encoder message.
        message: String,
    },
}

impl PersistenceError {
    pub(crate) fn decode(key: &CacheKey, err: &serde_json::Error) -> Self {
        Self::Decode {
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn encode(key: &CacheKey, err: &serde_json::Error) -> Self {
        Self::Encode {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

/// More than one stored virtual position of one direction for one security.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Found {count} {side} virtual positions for {security}; at most one is allowed")]
pub struct TooManyMatches {
    /// Security with duplicates.
    pub security: SecurityIdentity,
    /// Direction with duplicates.
    pub side: Side,
    /// Number of matches.
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{CacheOwner, ManagerKind, StoreKind};

    #[test]
    fn invariant_violation_display() {
        let id = SecurityIdentity::new("DS", "X", "X-FULL");
        let err = PositionsError::invariant(&id, "expected long position");
        assert_eq!(
            err.to_string(),
            "Invariant violation on DS:X-FULL: expected long position"
        );
        assert_eq!(err.code(), "INVARIANT_VIOLATION");
    }

    #[test]
    fn too_many_matches_display() {
        let err = TooManyMatches {
            security: SecurityIdentity::new("DS", "X", "X"),
            side: Side::Short,
            count: 2,
        };
        assert_eq!(
            err.to_string(),
            "Found 2 SHORT virtual positions for DS:X; at most one is allowed"
        );
    }

    #[test]
    fn persistence_error_wraps_into_positions_error() {
        let key = CacheKey::new(
            CacheOwner::Instance("1".to_string()),
            ManagerKind::OptionSeries,
            StoreKind::LongPositions,
        );
        let json_err = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let err: PositionsError = PersistenceError::decode(&key, &json_err).into();
        assert_eq!(err.code(), "PERSISTENCE_ERROR");
        assert!(err.to_string().contains("LongPositions"));
    }
}
