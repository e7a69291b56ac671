//! Positions Manager
//!
//! The position/risk state machine. A manager is cheap to build and may be
//! recreated every step: everything that must survive lives in the
//! key/value store, scoped by instance id (local) or trade name (global).
//!
//! Per step the host calls [`PositionsManager::execute`], which in order
//! 1. replays stored virtual positions into the live books,
//! 2. checks that every security reports a ready portfolio,
//! 3. drains queued fixed-price orders,
//! 4. drains volatility intents,
//! 5. optionally imports real exposure and drops virtual positions.
//!
//! Trading calls made before `execute` confirmed readiness are skipped.

mod intents;
mod maintenance;
mod outcome;
mod placement;
mod restore;

pub use outcome::{OrderOutcome, SkipReason, StepReport, StepRequest};

use std::sync::Arc;
use tracing::{error, info_span, warn};

use crate::application::ports::{
    CacheOwner, KeyValueStore, Security, SecurityResolver, TradingContext,
};
use crate::application::services::{
    EffectiveIv, EffectiveIvError, EffectiveIvSolver, total_profit, total_qty,
};
use crate::application::sources::OptionSeries;
use crate::application::stores::{
    IvTargetStore, PendingOrderStore, StoreScope, VirtualEntry, VirtualPositionStore,
};
use crate::config::{ManagerConfig, SolverConfig};
use crate::domain::intent::{IvTarget, PendingOrder};
use crate::domain::position::{PositionSnapshot, TotalProfitAlgo};
use crate::domain::security::SecurityIdentity;
use crate::domain::shared::Side;
use crate::error::{PersistenceError, PositionsError};
use crate::observability::span_names;

/// Position/risk state machine over one strategy instance.
pub struct PositionsManager<'a> {
    config: ManagerConfig,
    store: &'a dyn KeyValueStore,
    solver: EffectiveIvSolver,
    ready: bool,
}

impl<'a> PositionsManager<'a> {
    /// Manager persisting into `store`.
    #[must_use]
    pub fn new(config: ManagerConfig, store: &'a dyn KeyValueStore) -> Self {
        Self {
            config,
            store,
            solver: EffectiveIvSolver::default(),
            ready: false,
        }
    }

    /// Use `config` for the effective-IV search.
    #[must_use]
    pub fn with_solver(mut self, config: SolverConfig) -> Self {
        self.solver = EffectiveIvSolver::new(config);
        self
    }

    /// Settings.
    #[must_use]
    pub const fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// True once `execute` has seen every security ready.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Run one evaluation step.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` when the host returns a position whose direction
    /// contradicts the one requested. Every other condition is logged and
    /// counted in the report.
    pub fn execute(
        &mut self,
        ctx: &dyn TradingContext,
        resolver: &dyn SecurityResolver,
        request: StepRequest,
    ) -> Result<StepReport, PositionsError> {
        let _span = info_span!(
            span_names::STEP,
            instance = ctx.instance_id(),
            trade = ctx.trade_name(),
            global = self.config.use_global_cache,
        )
        .entered();

        let mut report = StepReport::default();
        self.restore_virtual_positions(ctx, resolver, &mut report)?;

        let not_ready: Vec<String> = ctx
            .securities()
            .iter()
            .filter(|sec| !sec.is_portfolio_ready())
            .map(|sec| sec.identity().to_string())
            .collect();
        self.ready = not_ready.is_empty();
        report.ready = self.ready;

        if self.ready {
            self.drain_pending_orders(ctx, resolver, &mut report)?;
            self.drain_intents(ctx, resolver, &mut report)?;
            if request.import_real_positions {
                report.imported = self.import_real_positions(ctx)?;
            }
        } else {
            warn!(securities = ?not_ready, "Portfolio not ready; order queues left untouched");
        }

        if request.drop_virtual_positions {
            report.dropped = self.drop_virtual_positions(ctx, resolver);
        }

        Ok(report)
    }

    /// Active positions of `security` at `bar` in the `algo` subset.
    #[must_use]
    pub fn get_active_for_bar(
        security: &dyn Security,
        bar: usize,
        algo: TotalProfitAlgo,
    ) -> Vec<PositionSnapshot> {
        security
            .positions()
            .into_iter()
            .filter(|p| algo.includes(p) && p.is_active_for_bar(bar))
            .collect()
    }

    /// Positions of `security` entered by `bar`, open or closed, in the `algo` subset.
    #[must_use]
    pub fn get_closed_or_active_for_bar(
        security: &dyn Security,
        bar: usize,
        algo: TotalProfitAlgo,
    ) -> Vec<PositionSnapshot> {
        security
            .positions()
            .into_iter()
            .filter(|p| algo.includes(p) && p.is_closed_or_active_for_bar(bar))
            .collect()
    }

    /// Net signed open quantity of `security` at `bar`.
    #[must_use]
    pub fn get_total_qty(security: &dyn Security, bar: usize, algo: TotalProfitAlgo) -> f64 {
        total_qty(&Self::get_active_for_bar(security, bar, algo))
    }

    /// Floating PnL (`cash + pnl`) of `security` at `bar`, marked at `price`.
    #[must_use]
    pub fn get_total_profit(
        security: &dyn Security,
        bar: usize,
        algo: TotalProfitAlgo,
        price: f64,
    ) -> f64 {
        total_profit(
            &Self::get_closed_or_active_for_bar(security, bar, algo),
            bar,
            price,
        )
        .total()
    }

    /// Break-even volatilities of the `algo` positions of `series`.
    ///
    /// # Errors
    ///
    /// `NoSmile` when the series carries no smile; otherwise the solver's errors.
    pub fn try_estimate_effective_iv(
        &self,
        series: &OptionSeries,
        bar: usize,
        algo: TotalProfitAlgo,
    ) -> Result<EffectiveIv, EffectiveIvError> {
        let smile = series.smile().ok_or(EffectiveIvError::NoSmile)?;
        let strikes = series.strike_positions(algo);
        let underlying: Vec<PositionSnapshot> = series
            .underlying()
            .positions()
            .into_iter()
            .filter(|p| algo.includes(p))
            .collect();
        self.solver.estimate(smile, &strikes, &underlying, bar)
    }

    /// Stored virtual positions of `side`.
    ///
    /// # Errors
    ///
    /// `Persistence` when the stored list cannot be decoded.
    pub fn virtual_positions(
        &self,
        ctx: &dyn TradingContext,
        side: Side,
    ) -> Result<Vec<VirtualEntry>, PositionsError> {
        Ok(self.virtual_store(ctx).load(side)?)
    }

    /// Stored volatility intents of `side`.
    ///
    /// # Errors
    ///
    /// `Persistence` when the stored list cannot be decoded.
    pub fn iv_targets(
        &self,
        ctx: &dyn TradingContext,
        side: Side,
    ) -> Result<Vec<IvTarget>, PositionsError> {
        Ok(self.intent_store(ctx).load(side)?)
    }

    /// Queued fixed-price orders.
    ///
    /// # Errors
    ///
    /// `Persistence` when the stored list cannot be decoded.
    pub fn pending_orders(&self, ctx: &dyn TradingContext) -> Result<Vec<PendingOrder>, PositionsError> {
        Ok(self.pending_store(ctx).peek()?)
    }

    fn scope(&self, ctx: &dyn TradingContext) -> StoreScope {
        let owner = if self.config.use_global_cache {
            CacheOwner::TradeName(ctx.trade_name().to_string())
        } else {
            CacheOwner::Instance(ctx.instance_id().to_string())
        };
        StoreScope::new(owner, self.config.kind)
    }

    fn virtual_store(&self, ctx: &dyn TradingContext) -> VirtualPositionStore<'a> {
        VirtualPositionStore::new(self.store, &self.scope(ctx))
    }

    fn intent_store(&self, ctx: &dyn TradingContext) -> IvTargetStore<'a> {
        IvTargetStore::new(self.store, &self.scope(ctx))
    }

    fn pending_store(&self, ctx: &dyn TradingContext) -> PendingOrderStore<'a> {
        PendingOrderStore::new(self.store, &self.scope(ctx))
    }
}

/// Live security for `identity`: the universe first, then the resolver.
fn resolve(
    ctx: &dyn TradingContext,
    resolver: &dyn SecurityResolver,
    identity: &SecurityIdentity,
) -> Option<Arc<dyn Security>> {
    ctx.securities()
        .into_iter()
        .find(|sec| sec.identity() == identity)
        .or_else(|| resolver.resolve_candidate(identity))
}

/// Open virtual positions of `side` in the book of `security`.
fn live_virtual(security: &dyn Security, side: Side) -> Vec<PositionSnapshot> {
    security
        .positions()
        .into_iter()
        .filter(|p| p.is_virtual && p.side == side && p.exit_bar.is_none())
        .collect()
}

/// Fail when the host returned a position of the wrong direction.
fn ensure_side(
    security: &dyn Security,
    position: &PositionSnapshot,
    expected: Side,
) -> Result<(), PositionsError> {
    if position.side == expected {
        return Ok(());
    }
    let err = PositionsError::invariant(
        security.identity(),
        format!("expected {expected} position, host returned {} {}", position.side, position.id),
    );
    error!(highlight = true, error = %err, "Position direction mismatch");
    Err(err)
}

/// Unwrap a store result, logging failures. Corrupt lists are left in place.
fn logged<T>(result: Result<T, PersistenceError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            error!(highlight = true, error = %e, "Position store unavailable");
            None
        }
    }
}
