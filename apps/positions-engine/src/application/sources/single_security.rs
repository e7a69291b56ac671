//! Single-security adapter.

use std::sync::Arc;

use crate::application::ports::{QuoteTerms, Security, SecurityResolver};
use crate::domain::security::SecurityIdentity;

/// Resolver over one security, optionally priced as an option.
#[derive(Debug, Clone)]
pub struct SingleSecuritySource {
    security: Arc<dyn Security>,
    terms: Option<QuoteTerms>,
}

impl SingleSecuritySource {
    /// Source over `security`.
    #[must_use]
    pub const fn new(security: Arc<dyn Security>) -> Self {
        Self {
            security,
            terms: None,
        }
    }

    /// Price volatility intents on this security with `terms`.
    #[must_use]
    pub fn with_quote_terms(mut self, terms: QuoteTerms) -> Self {
        self.terms = Some(terms);
        self
    }

    /// The security.
    #[must_use]
    pub const fn security(&self) -> &Arc<dyn Security> {
        &self.security
    }
}

impl SecurityResolver for SingleSecuritySource {
    fn resolve_candidate(&self, identity: &SecurityIdentity) -> Option<Arc<dyn Security>> {
        (self.security.identity() == identity).then(|| Arc::clone(&self.security))
    }

    fn quote_terms(&self, identity: &SecurityIdentity) -> Option<QuoteTerms> {
        if self.security.identity() == identity {
            self.terms.clone()
        } else {
            None
        }
    }
}
