//! Security Resolver Port
//!
//! The single capability the reconciliation routine is parameterised over.
//! Option-chain and single-security callers supply different adapters.

use std::sync::Arc;

use super::Security;
use crate::domain::security::SecurityIdentity;
use crate::domain::smile::SmileInfo;
use crate::pricing::OptionKind;

/// Option terms needed to price a volatility quote.
#[derive(Debug, Clone)]
pub struct QuoteTerms {
    /// Strike.
    pub strike: f64,
    /// Call or put.
    pub kind: OptionKind,
    /// Current smile of the series.
    pub smile: SmileInfo,
}

/// Source-specific security lookup.
pub trait SecurityResolver {
    /// Resolve an identity the instrument universe did not contain.
    fn resolve_candidate(&self, identity: &SecurityIdentity) -> Option<Arc<dyn Security>>;

    /// Pricing terms for a volatility quote on `identity`, if it is an option
    /// this source knows and a smile is available.
    fn quote_terms(&self, _identity: &SecurityIdentity) -> Option<QuoteTerms> {
        None
    }
}
