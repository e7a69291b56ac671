//! Option series adapter.

use std::sync::Arc;

use crate::application::ports::{QuoteTerms, Security, SecurityResolver};
use crate::application::services::StrikePositions;
use crate::domain::position::TotalProfitAlgo;
use crate::domain::security::SecurityIdentity;
use crate::domain::smile::SmileInfo;
use crate::pricing::OptionKind;

/// Put and call of one strike. Either leg may be missing from the chain.
#[derive(Debug, Clone)]
pub struct StrikePair {
    /// Strike.
    pub strike: f64,
    /// Put security.
    pub put: Option<Arc<dyn Security>>,
    /// Call security.
    pub call: Option<Arc<dyn Security>>,
}

impl StrikePair {
    /// Pair with both legs.
    #[must_use]
    pub const fn new(strike: f64, put: Arc<dyn Security>, call: Arc<dyn Security>) -> Self {
        Self {
            strike,
            put: Some(put),
            call: Some(call),
        }
    }

    /// Leg of `kind`.
    #[must_use]
    pub const fn leg(&self, kind: OptionKind) -> Option<&Arc<dyn Security>> {
        match kind {
            OptionKind::Put => self.put.as_ref(),
            OptionKind::Call => self.call.as_ref(),
        }
    }
}

/// Underlying and strike pairs of one expiry, with the current smile.
#[derive(Debug, Clone)]
pub struct OptionSeries {
    underlying: Arc<dyn Security>,
    pairs: Vec<StrikePair>,
    smile: Option<SmileInfo>,
}

impl OptionSeries {
    /// Series over `pairs`, ordered by strike.
    #[must_use]
    pub fn new(underlying: Arc<dyn Security>, mut pairs: Vec<StrikePair>) -> Self {
        pairs.sort_by(|a, b| a.strike.total_cmp(&b.strike));
        Self {
            underlying,
            pairs,
            smile: None,
        }
    }

    /// Attach the current smile.
    #[must_use]
    pub fn with_smile(mut self, smile: SmileInfo) -> Self {
        self.smile = Some(smile);
        self
    }

    /// Underlying security.
    #[must_use]
    pub const fn underlying(&self) -> &Arc<dyn Security> {
        &self.underlying
    }

    /// Strike pairs, ascending.
    #[must_use]
    pub fn pairs(&self) -> &[StrikePair] {
        &self.pairs
    }

    /// Current smile.
    #[must_use]
    pub const fn smile(&self) -> Option<&SmileInfo> {
        self.smile.as_ref()
    }

    /// Underlying followed by every option leg.
    #[must_use]
    pub fn securities(&self) -> Vec<Arc<dyn Security>> {
        let mut out = vec![Arc::clone(&self.underlying)];
        for pair in &self.pairs {
            out.extend(pair.put.iter().cloned());
            out.extend(pair.call.iter().cloned());
        }
        out
    }

    /// Positions of every strike, restricted to `algo`.
    #[must_use]
    pub fn strike_positions(&self, algo: TotalProfitAlgo) -> Vec<StrikePositions> {
        let select = |leg: Option<&Arc<dyn Security>>| {
            leg.map(|sec| {
                sec.positions()
                    .into_iter()
                    .filter(|p| algo.includes(p))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
        };
        self.pairs
            .iter()
            .map(|pair| StrikePositions {
                strike: pair.strike,
                puts: select(pair.leg(OptionKind::Put)),
                calls: select(pair.leg(OptionKind::Call)),
            })
            .collect()
    }

    fn find_leg(&self, identity: &SecurityIdentity) -> Option<(&StrikePair, OptionKind)> {
        self.pairs.iter().find_map(|pair| {
            [OptionKind::Put, OptionKind::Call]
                .into_iter()
                .find(|kind| pair.leg(*kind).is_some_and(|sec| sec.identity() == identity))
                .map(|kind| (pair, kind))
        })
    }
}

impl SecurityResolver for OptionSeries {
    fn resolve_candidate(&self, identity: &SecurityIdentity) -> Option<Arc<dyn Security>> {
        if self.underlying.identity() == identity {
            return Some(Arc::clone(&self.underlying));
        }
        self.find_leg(identity)
            .and_then(|(pair, kind)| pair.leg(kind).cloned())
    }

    fn quote_terms(&self, identity: &SecurityIdentity) -> Option<QuoteTerms> {
        let smile = self.smile.as_ref()?;
        let (pair, kind) = self.find_leg(identity)?;
        Some(QuoteTerms {
            strike: pair.strike,
            kind,
            smile: smile.clone(),
        })
    }
}
