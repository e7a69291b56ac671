//! Integration tests for the positions manager step protocol.
//!
//! Drives `PositionsManager` against the in-memory cache and the simulated
//! host, the way a handler would across several bars.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use std::sync::Arc;

use chrono::{TimeDelta, TimeZone, Utc};
use proptest::prelude::*;

use positions_engine::application::ports::{CacheOwner, HostError, OrderTicket, QuoteTerms, Security};
use positions_engine::application::stores::{StoreScope, VirtualEntry, VirtualPositionStore};
use positions_engine::domain::position::PositionId;
use positions_engine::domain::shared::round_to_step;
use positions_engine::infrastructure::cache::InMemoryCache;
use positions_engine::infrastructure::sim::{SimContext, SimSecurity};
use positions_engine::pricing::{OptionKind, option_price};
use positions_engine::{
    ManagerConfig, OrderOutcome, PendingOrder, PositionRecord, PositionSnapshot, PositionsError, PositionsManager,
    SecurityIdentity, Side, SingleSecuritySource, SkipReason, SmileInfo, StepRequest,
    TotalProfitAlgo, VolQuote,
};

// =============================================================================
// Fixtures
// =============================================================================

fn call_id() -> SecurityIdentity {
    SecurityIdentity::new("OPT", "C100", "SI-12.26 C100")
}

fn world() -> (SimContext, Arc<SimSecurity>, SingleSecuritySource) {
    let ctx = SimContext::new("mm-vol", "instance-1");
    let security = Arc::new(SimSecurity::new(call_id()));
    ctx.add_security(security.clone());
    let source = SingleSecuritySource::new(security.clone());
    (ctx, security, source)
}

fn quote_terms() -> QuoteTerms {
    QuoteTerms {
        strike: 100.0,
        kind: OptionKind::Call,
        smile: SmileInfo::flat(100.0, 0.25, 0.0, 0.3),
    }
}

fn ready_manager<'a>(
    cache: &'a InMemoryCache,
    config: ManagerConfig,
    ctx: &SimContext,
    source: &SingleSecuritySource,
) -> PositionsManager<'a> {
    let mut manager = PositionsManager::new(config, cache);
    let report = manager.execute(ctx, source, StepRequest::default()).unwrap();
    assert!(report.ready);
    manager
}

fn real_config() -> ManagerConfig {
    ManagerConfig {
        use_virtual_positions: false,
        ..ManagerConfig::default()
    }
}

// =============================================================================
// Readiness and gates
// =============================================================================

#[test]
fn orders_before_execute_are_skipped() {
    let (ctx, security, _) = world();
    let cache = InMemoryCache::new();
    let manager = PositionsManager::new(ManagerConfig::default(), &cache);

    let outcome = manager
        .buy_at_price(&ctx, security.as_ref(), 1.0, 10.0, "buy", "")
        .unwrap();

    assert_eq!(outcome.skip_reason(), Some(SkipReason::PortfolioNotReady));
    assert!(security.positions().is_empty());
}

#[test]
fn portfolio_not_ready_leaves_queues_untouched() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let mut manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);
    manager.queue_order(&ctx, PendingOrder::new(call_id(), Side::Long, 1.0, 5.0, "click"));

    security.set_portfolio_ready(false);
    let report = manager.execute(&ctx, &source, StepRequest::default()).unwrap();

    assert!(!report.ready);
    assert!(!manager.is_ready());
    assert_eq!(report.pending_executed, 0);
    assert_eq!(manager.pending_orders(&ctx).unwrap().len(), 1);
}

#[test]
fn zero_quantity_is_a_no_op() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);

    let outcome = manager
        .sell_at_price(&ctx, security.as_ref(), 0.0, 10.0, "sell", "")
        .unwrap();

    assert_eq!(outcome, OrderOutcome::NoOp);
    assert!(manager.virtual_positions(&ctx, Side::Short).unwrap().is_empty());
}

#[test]
fn blocked_trading_changes_nothing() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);
    ctx.set_trading_blocked(true);

    let buy = manager
        .buy_at_price(&ctx, security.as_ref(), 3.0, 10.0, "buy", "")
        .unwrap();
    let vol = manager
        .sell_volatility(&ctx, security.as_ref(), 2.0, VolQuote::absolute(0.3), "vol", "")
        .unwrap();

    assert_eq!(buy.skip_reason(), Some(SkipReason::TradingBlocked));
    assert_eq!(vol.skip_reason(), Some(SkipReason::TradingBlocked));
    assert!(security.positions().is_empty());
    assert!(manager.virtual_positions(&ctx, Side::Long).unwrap().is_empty());
    assert!(manager.iv_targets(&ctx, Side::Short).unwrap().is_empty());
}

// =============================================================================
// Virtual placement
// =============================================================================

#[test]
fn first_virtual_buy_opens_position_and_record() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);

    let outcome = manager
        .buy_at_price(&ctx, security.as_ref(), 10.0, 100.0, "entry", "first")
        .unwrap();

    assert!(matches!(
        outcome,
        OrderOutcome::VirtualOpened { shares, price, .. } if shares == 10.0 && price == 100.0
    ));
    let live = security.open_positions(Side::Long, true);
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].entry_bar, 8);

    let stored = manager.virtual_positions(&ctx, Side::Long).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].security, call_id());
    assert_eq!(stored[0].record.shares, 10.0);
    assert_eq!(stored[0].record.entry_bar, 8);
    assert_eq!(stored[0].record.notes, "first");
}

#[test]
fn later_fill_merges_at_volume_weighted_price() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let mut manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);
    manager
        .buy_at_price(&ctx, security.as_ref(), 10.0, 100.0, "entry", "")
        .unwrap();

    security.advance(1);
    let report = manager.execute(&ctx, &source, StepRequest::default()).unwrap();
    assert_eq!(report.already_present, 1);

    let outcome = manager
        .buy_at_price(&ctx, security.as_ref(), 5.0, 130.0, "add", "")
        .unwrap();

    assert!(matches!(
        outcome,
        OrderOutcome::VirtualMerged { shares, price, .. } if shares == 15.0 && (price - 110.0).abs() < 1e-9
    ));
    let live = security.open_positions(Side::Long, true);
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].abs_shares(), 15.0);
    assert!((live[0].average_entry_price - 110.0).abs() < 1e-9);

    let stored = manager.virtual_positions(&ctx, Side::Long).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].record.entry_bar, 8);
    assert_eq!(stored[0].record.signal_name, "entry");
    assert!((stored[0].record.entry_price - 110.0).abs() < 1e-9);
}

#[test]
fn same_bar_fill_replaces_position() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);
    manager
        .sell_at_price(&ctx, security.as_ref(), 4.0, 20.0, "short", "")
        .unwrap();

    let outcome = manager
        .sell_at_price(&ctx, security.as_ref(), 4.0, 30.0, "short", "")
        .unwrap();

    assert!(matches!(
        outcome,
        OrderOutcome::VirtualReplaced { shares, price, .. } if shares == 8.0 && (price - 25.0).abs() < 1e-9
    ));
    let live = security.open_positions(Side::Short, true);
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].shares, -8.0);
    assert_eq!(manager.virtual_positions(&ctx, Side::Short).unwrap().len(), 1);
}

#[test]
fn host_rejection_stores_nothing() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);
    security.set_rejection(Some("instrument halted"));

    let outcome = manager
        .buy_at_price(&ctx, security.as_ref(), 1.0, 10.0, "buy", "")
        .unwrap();

    assert_eq!(outcome.skip_reason(), Some(SkipReason::HostRejected));
    assert!(manager.virtual_positions(&ctx, Side::Long).unwrap().is_empty());
}

proptest! {
    #[test]
    fn negative_buy_equals_sell(qty in 1u32..500, price in 1u32..10_000) {
        let qty = f64::from(qty);
        let price = f64::from(price) / 100.0;

        let (ctx_a, sec_a, source_a) = world();
        let cache_a = InMemoryCache::new();
        let manager_a = ready_manager(&cache_a, ManagerConfig::default(), &ctx_a, &source_a);
        let bought = manager_a.buy_at_price(&ctx_a, sec_a.as_ref(), -qty, price, "s", "").unwrap();

        let (ctx_b, sec_b, source_b) = world();
        let cache_b = InMemoryCache::new();
        let manager_b = ready_manager(&cache_b, ManagerConfig::default(), &ctx_b, &source_b);
        let sold = manager_b.sell_at_price(&ctx_b, sec_b.as_ref(), qty, price, "s", "").unwrap();

        prop_assert_eq!(bought, sold);
        prop_assert_eq!(
            manager_a.virtual_positions(&ctx_a, Side::Short).unwrap(),
            manager_b.virtual_positions(&ctx_b, Side::Short).unwrap()
        );
        prop_assert!(manager_a.virtual_positions(&ctx_a, Side::Long).unwrap().is_empty());
    }
}

proptest! {
    #[test]
    fn merged_price_is_volume_weighted(
        fills in prop::collection::vec((1u32..50, 100u32..20_000, any::<bool>()), 1..8)
    ) {
        let (ctx, security, source) = world();
        let cache = InMemoryCache::new();
        let manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);

        let mut volume = 0.0;
        let mut notional = 0.0;
        for (qty, cents, next_bar) in fills {
            if next_bar {
                security.advance(1);
            }
            let qty = f64::from(qty);
            let price = f64::from(cents) / 100.0;
            let outcome = manager.buy_at_price(&ctx, security.as_ref(), qty, price, "fill", "").unwrap();
            prop_assert!(outcome.is_filled());
            volume += qty;
            notional += qty * price;
        }
        let expected = notional / volume;

        let stored = manager.virtual_positions(&ctx, Side::Long).unwrap();
        prop_assert_eq!(stored.len(), 1);
        prop_assert_eq!(stored[0].record.shares, volume);
        prop_assert!((stored[0].record.entry_price - expected).abs() < 1e-9 * expected);

        let live = security.open_positions(Side::Long, true);
        prop_assert_eq!(live.len(), 1);
        prop_assert_eq!(live[0].abs_shares(), volume);
        prop_assert!((live[0].average_entry_price - expected).abs() < 1e-9 * expected);
    }
}

#[test]
fn duplicate_records_abort_the_order() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let config = ManagerConfig::default();
    let scope = StoreScope::new(CacheOwner::Instance("instance-1".to_string()), config.kind);
    let store = VirtualPositionStore::new(&cache, &scope);
    for price in [10.0, 11.0] {
        let record = PositionRecord::new(3, Side::Long, 1.0, price, "seed", "");
        store.push(VirtualEntry::new(call_id(), record)).unwrap();
    }

    let mut manager = PositionsManager::new(config, &cache);
    let report = manager.execute(&ctx, &source, StepRequest::default()).unwrap();
    assert_eq!(report.restored, 1);
    assert_eq!(report.already_present, 1);

    let outcome = manager
        .buy_at_price(&ctx, security.as_ref(), 1.0, 12.0, "buy", "")
        .unwrap();

    assert_eq!(outcome.skip_reason(), Some(SkipReason::DuplicateVirtualPositions));
    assert_eq!(security.open_positions(Side::Long, true).len(), 1);
    assert_eq!(manager.virtual_positions(&ctx, Side::Long).unwrap().len(), 2);
}

// =============================================================================
// Restore
// =============================================================================

#[test]
fn restore_recreates_forgotten_positions_once() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let mut manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);
    manager
        .buy_at_price(&ctx, security.as_ref(), 3.0, 7.0, "entry", "")
        .unwrap();
    security.advance(5);
    assert_eq!(security.forget_virtual_positions(), 1);

    let first = manager.execute(&ctx, &source, StepRequest::default()).unwrap();
    let second = manager.execute(&ctx, &source, StepRequest::default()).unwrap();

    assert_eq!(first.restored, 1);
    assert_eq!(second.restored, 0);
    assert_eq!(second.already_present, 1);
    let live = security.open_positions(Side::Long, true);
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].entry_bar, 8);
    assert_eq!(live[0].abs_shares(), 3.0);
}

#[test]
fn restore_moves_recent_entries_back_in_history() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let mut manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);
    manager
        .buy_at_price(&ctx, security.as_ref(), 3.0, 7.0, "entry", "")
        .unwrap();
    security.forget_virtual_positions();

    let report = manager.execute(&ctx, &source, StepRequest::default()).unwrap();

    assert_eq!(report.restored, 1);
    let live = security.open_positions(Side::Long, true);
    assert_eq!(live[0].entry_bar, 7);
}

#[test]
fn fresh_manager_sees_stored_positions() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    {
        let manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);
        manager
            .sell_at_price(&ctx, security.as_ref(), 2.0, 15.0, "entry", "")
            .unwrap();
    }
    security.advance(3);
    security.forget_virtual_positions();

    let mut manager = PositionsManager::new(ManagerConfig::default(), &cache);
    let report = manager.execute(&ctx, &source, StepRequest::default()).unwrap();

    assert_eq!(report.restored, 1);
    assert_eq!(security.open_positions(Side::Short, true).len(), 1);
}

// =============================================================================
// Real placement
// =============================================================================

#[test]
fn real_orders_open_then_extend() {
    let (ctx, security, source) = world();
    let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
    ctx.set_now(now);
    security.set_last_bar_time(Some(now));
    let cache = InMemoryCache::new();
    let manager = ready_manager(&cache, real_config(), &ctx, &source);

    let opened = manager
        .buy_at_price(&ctx, security.as_ref(), 3.0, 10.0, "entry", "")
        .unwrap();
    let extended = manager
        .buy_at_price(&ctx, security.as_ref(), 2.0, 12.0, "add", "")
        .unwrap();

    assert!(matches!(opened, OrderOutcome::RealOpened { shares, .. } if shares == 3.0));
    assert!(matches!(
        extended,
        OrderOutcome::RealExtended { shares, price, .. } if shares == 5.0 && price == 12.0
    ));
    let live = security.open_positions(Side::Long, false);
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].entry_bar, 9);
    assert!(manager.virtual_positions(&ctx, Side::Long).unwrap().is_empty());
}

#[test]
fn real_orders_without_aggregation_open_new_positions() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let config = ManagerConfig {
        aggregate_positions: false,
        check_time: false,
        ..real_config()
    };
    let manager = ready_manager(&cache, config, &ctx, &source);

    manager.sell_at_price(&ctx, security.as_ref(), 1.0, 10.0, "a", "").unwrap();
    manager.sell_at_price(&ctx, security.as_ref(), 1.0, 11.0, "b", "").unwrap();

    assert_eq!(security.open_positions(Side::Short, false).len(), 2);
}

#[test]
fn stale_bars_block_real_orders() {
    let (ctx, security, source) = world();
    let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
    security.set_last_bar_time(Some(now));
    ctx.set_now(now + TimeDelta::minutes(10));
    let cache = InMemoryCache::new();
    let manager = ready_manager(&cache, real_config(), &ctx, &source);

    let outcome = manager
        .buy_at_price(&ctx, security.as_ref(), 1.0, 10.0, "buy", "")
        .unwrap();

    assert_eq!(outcome.skip_reason(), Some(SkipReason::StaleBars));
    assert!(security.positions().is_empty());
}

#[test]
fn missing_bar_time_is_stale_unless_unchecked() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let checked = ready_manager(&cache, real_config(), &ctx, &source);
    let unchecked = ready_manager(
        &cache,
        ManagerConfig {
            check_time: false,
            ..real_config()
        },
        &ctx,
        &source,
    );

    let skipped = checked.buy_at_price(&ctx, security.as_ref(), 1.0, 10.0, "b", "").unwrap();
    let filled = unchecked.buy_at_price(&ctx, security.as_ref(), 1.0, 10.0, "b", "").unwrap();

    assert_eq!(skipped.skip_reason(), Some(SkipReason::StaleBars));
    assert!(filled.is_filled());
}

#[test]
fn unloaded_bars_block_real_orders() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let manager = ready_manager(&cache, real_config(), &ctx, &source);
    security.set_bars_loaded(false);

    let outcome = manager
        .buy_at_price(&ctx, security.as_ref(), 1.0, 10.0, "buy", "")
        .unwrap();

    assert_eq!(outcome.skip_reason(), Some(SkipReason::BarsNotLoaded));
}

// =============================================================================
// Volatility intents
// =============================================================================

#[test]
fn newer_intent_replaces_older_one() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);

    manager
        .buy_volatility(&ctx, security.as_ref(), 3.0, VolQuote::absolute(0.3), "vol", "")
        .unwrap();
    let outcome = manager
        .buy_volatility(&ctx, security.as_ref(), 5.0, VolQuote::smile_shift(0.01), "vol", "")
        .unwrap();

    assert_eq!(outcome, OrderOutcome::IntentQueued { target_shares: 5.0 });
    let targets = manager.iv_targets(&ctx, Side::Long).unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].target_shares, 5.0);
    assert_eq!(targets[0].entry_iv, 0.01);
}

#[test]
fn negative_volatility_buy_queues_short_intent() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);

    let outcome = manager
        .buy_volatility(&ctx, security.as_ref(), -2.0, VolQuote::absolute(0.3), "vol", "")
        .unwrap();

    assert_eq!(outcome, OrderOutcome::IntentQueued { target_shares: -2.0 });
    assert!(manager.iv_targets(&ctx, Side::Long).unwrap().is_empty());
    assert_eq!(manager.iv_targets(&ctx, Side::Short).unwrap().len(), 1);
}

#[test]
fn intent_is_filled_then_retired() {
    let (ctx, security, source) = world();
    let source = source.with_quote_terms(quote_terms());
    let cache = InMemoryCache::new();
    let mut manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);
    manager
        .buy_volatility(&ctx, security.as_ref(), 5.0, VolQuote::absolute(0.25), "vol", "")
        .unwrap();

    let issued = manager.execute(&ctx, &source, StepRequest::default()).unwrap();

    assert_eq!(issued.intents_issued, 1);
    let live = security.open_positions(Side::Long, true);
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].abs_shares(), 5.0);
    let expected = round_to_step(option_price(100.0, 100.0, 0.25, 0.25, 0.0, OptionKind::Call), 0.01);
    assert!((live[0].average_entry_price - expected).abs() < 1e-9);

    security.advance(1);
    let retired = manager.execute(&ctx, &source, StepRequest::default()).unwrap();

    assert_eq!(retired.intents_satisfied, 1);
    assert!(manager.iv_targets(&ctx, Side::Long).unwrap().is_empty());
}

#[test]
fn intent_target_builds_on_current_exposure() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);
    manager
        .sell_at_price(&ctx, security.as_ref(), 4.0, 6.0, "short", "")
        .unwrap();
    security.advance(2);

    let outcome = manager
        .sell_volatility(&ctx, security.as_ref(), 3.0, VolQuote::absolute(0.3), "vol", "")
        .unwrap();

    assert_eq!(outcome, OrderOutcome::IntentQueued { target_shares: -7.0 });
}

#[test]
fn unpriceable_intent_stays_queued() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let mut manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);
    manager
        .sell_volatility(&ctx, security.as_ref(), 1.0, VolQuote::absolute(0.3), "vol", "")
        .unwrap();

    let report = manager.execute(&ctx, &source, StepRequest::default()).unwrap();

    assert_eq!(report.intents_kept, 1);
    assert_eq!(manager.iv_targets(&ctx, Side::Short).unwrap().len(), 1);
    assert!(security.positions().is_empty());
}

#[test]
fn cancellation_is_allowed_while_blocked() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);
    let quote = VolQuote::absolute(0.3);
    manager.buy_volatility(&ctx, security.as_ref(), 1.0, quote, "vol", "").unwrap();
    manager.sell_volatility(&ctx, security.as_ref(), 1.0, quote, "vol", "").unwrap();
    ctx.set_trading_blocked(true);

    assert_eq!(manager.cancel_volatility(&ctx, Side::Long, "si-12.26 c100"), 1);
    assert_eq!(manager.cancel_volatility(&ctx, Side::Long, "si-12.26 c100"), 0);
    assert_eq!(manager.drop_all_iv_targets(&ctx), 1);
    assert!(manager.iv_targets(&ctx, Side::Short).unwrap().is_empty());
}

// =============================================================================
// Pending orders
// =============================================================================

#[test]
fn queued_order_runs_on_next_step() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let mut manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);

    let queued = manager.queue_order(&ctx, PendingOrder::new(call_id(), Side::Long, 2.0, 50.0, "click"));
    assert_eq!(queued, Some(1));
    assert_eq!(ctx.recalc_requests().len(), 1);

    let report = manager.execute(&ctx, &source, StepRequest::default()).unwrap();

    assert_eq!(report.pending_executed, 1);
    assert!(manager.pending_orders(&ctx).unwrap().is_empty());
    assert_eq!(security.open_positions(Side::Long, true).len(), 1);
}

#[test]
fn order_for_unknown_security_is_kept() {
    let (ctx, _security, source) = world();
    let cache = InMemoryCache::new();
    let mut manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);
    let other = SecurityIdentity::new("OPT", "P90", "SI-12.26 P90");
    manager.queue_order(&ctx, PendingOrder::new(other, Side::Short, 1.0, 3.0, "click"));

    let report = manager.execute(&ctx, &source, StepRequest::default()).unwrap();

    assert_eq!(report.pending_kept, 1);
    assert_eq!(manager.pending_orders(&ctx).unwrap().len(), 1);
}

#[test]
fn blocked_queued_order_survives_until_unblocked() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let mut manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);
    manager.queue_order(&ctx, PendingOrder::new(call_id(), Side::Long, 2.0, 50.0, "click"));
    ctx.set_trading_blocked(true);

    let blocked = manager.execute(&ctx, &source, StepRequest::default()).unwrap();

    assert_eq!(blocked.pending_executed, 0);
    assert_eq!(blocked.pending_kept, 1);
    assert_eq!(manager.pending_orders(&ctx).unwrap().len(), 1);
    assert!(security.positions().is_empty());

    ctx.set_trading_blocked(false);
    let unblocked = manager.execute(&ctx, &source, StepRequest::default()).unwrap();

    assert_eq!(unblocked.pending_executed, 1);
    assert!(manager.pending_orders(&ctx).unwrap().is_empty());
    assert_eq!(security.open_positions(Side::Long, true).len(), 1);
}

#[test]
fn stale_queued_real_order_is_kept() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let mut manager = ready_manager(&cache, real_config(), &ctx, &source);
    manager.queue_order(&ctx, PendingOrder::new(call_id(), Side::Short, 1.0, 8.0, "click"));

    let report = manager.execute(&ctx, &source, StepRequest::default()).unwrap();

    assert_eq!(report.pending_kept, 1);
    assert_eq!(manager.pending_orders(&ctx).unwrap().len(), 1);
    assert!(security.positions().is_empty());
}

#[test]
fn rejected_queued_order_is_dropped_not_executed() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let mut manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);
    manager.queue_order(&ctx, PendingOrder::new(call_id(), Side::Long, 1.0, 5.0, "click"));
    security.set_rejection(Some("instrument halted"));

    let report = manager.execute(&ctx, &source, StepRequest::default()).unwrap();

    assert_eq!(report.pending_executed, 0);
    assert_eq!(report.pending_dropped, 1);
    assert!(manager.pending_orders(&ctx).unwrap().is_empty());
}

#[test]
fn orders_behind_a_failing_one_stay_queued() {
    let ctx = SimContext::new("mm-vol", "instance-1");
    let security = Arc::new(WrongSideHost(SimSecurity::new(call_id())));
    ctx.add_security(security.clone());
    let source = SingleSecuritySource::new(security.clone());
    let cache = InMemoryCache::new();
    let mut manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);
    manager.queue_order(&ctx, PendingOrder::new(call_id(), Side::Long, 1.0, 5.0, "first"));
    manager.queue_order(&ctx, PendingOrder::new(call_id(), Side::Long, 1.0, 6.0, "second"));

    let err = manager.execute(&ctx, &source, StepRequest::default()).unwrap_err();

    assert!(matches!(err, PositionsError::InvariantViolation { .. }));
    let left = manager.pending_orders(&ctx).unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].signal_name, "second");
}

// =============================================================================
// Maintenance
// =============================================================================

#[test]
fn import_mirrors_real_exposure() {
    let (ctx, security, source) = world();
    security.seed_position(PositionSnapshot::open(PositionId::new(0), Side::Long, 4.0, 10.0, 3));
    security.seed_position(PositionSnapshot::open(PositionId::new(0), Side::Long, 6.0, 20.0, 5));
    let cache = InMemoryCache::new();
    let mut manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);

    let report = manager
        .execute(
            &ctx,
            &source,
            StepRequest {
                import_real_positions: true,
                ..StepRequest::default()
            },
        )
        .unwrap();

    assert_eq!(report.imported, 1);
    let stored = manager.virtual_positions(&ctx, Side::Long).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].record.shares, 10.0);
    assert!((stored[0].record.entry_price - 16.0).abs() < 1e-9);
    assert!(manager.virtual_positions(&ctx, Side::Short).unwrap().is_empty());
    assert_eq!(security.open_positions(Side::Long, true).len(), 1);
}

#[test]
fn drop_clears_records_and_live_positions() {
    let (ctx, security, source) = world();
    let cache = InMemoryCache::new();
    let mut manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);
    manager.buy_at_price(&ctx, security.as_ref(), 1.0, 10.0, "b", "").unwrap();
    manager.sell_at_price(&ctx, security.as_ref(), 2.0, 12.0, "s", "").unwrap();

    let report = manager
        .execute(
            &ctx,
            &source,
            StepRequest {
                drop_virtual_positions: true,
                ..StepRequest::default()
            },
        )
        .unwrap();

    assert_eq!(report.dropped, 2);
    assert!(security.positions().is_empty());
    assert!(manager.virtual_positions(&ctx, Side::Long).unwrap().is_empty());
}

// =============================================================================
// Cache scope
// =============================================================================

#[test]
fn global_cache_is_shared_by_trade_name() {
    let cache = InMemoryCache::new();
    let security = Arc::new(SimSecurity::new(call_id()));
    let source = SingleSecuritySource::new(security.clone());
    let ctx_a = SimContext::new("mm-vol", "instance-a");
    let ctx_b = SimContext::new("mm-vol", "instance-b");
    ctx_a.add_security(security.clone());
    ctx_b.add_security(security.clone());

    let global = ManagerConfig {
        use_global_cache: true,
        ..ManagerConfig::default()
    };
    let writer = ready_manager(&cache, global.clone(), &ctx_a, &source);
    writer.buy_at_price(&ctx_a, security.as_ref(), 1.0, 10.0, "b", "").unwrap();

    let shared = PositionsManager::new(global, &cache);
    let local = PositionsManager::new(ManagerConfig::default(), &cache);
    assert_eq!(shared.virtual_positions(&ctx_b, Side::Long).unwrap().len(), 1);
    assert!(local.virtual_positions(&ctx_b, Side::Long).unwrap().is_empty());
}

// =============================================================================
// Queries
// =============================================================================

#[test]
fn totals_filter_by_algo() {
    let (ctx, security, source) = world();
    security.seed_position(PositionSnapshot::open(PositionId::new(0), Side::Short, 2.0, 50.0, 1));
    let cache = InMemoryCache::new();
    let manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);
    manager.buy_at_price(&ctx, security.as_ref(), 10.0, 100.0, "b", "").unwrap();
    let sec: &dyn Security = security.as_ref();

    assert_eq!(PositionsManager::get_total_qty(sec, 9, TotalProfitAlgo::AllPositions), 8.0);
    assert_eq!(PositionsManager::get_total_qty(sec, 9, TotalProfitAlgo::RealPositions), -2.0);
    assert_eq!(PositionsManager::get_total_qty(sec, 9, TotalProfitAlgo::VirtualPositions), 10.0);
    assert_eq!(PositionsManager::get_total_qty(sec, 5, TotalProfitAlgo::AllPositions), -2.0);

    let virtual_pnl =
        PositionsManager::get_total_profit(sec, 9, TotalProfitAlgo::VirtualPositions, 105.0);
    assert!((virtual_pnl - 50.0).abs() < 1e-9);
    assert_eq!(
        PositionsManager::get_active_for_bar(sec, 9, TotalProfitAlgo::AllPositions).len(),
        2
    );
}

// =============================================================================
// Invariant enforcement
// =============================================================================

/// Host that opens every virtual position on the wrong side.
#[derive(Debug)]
struct WrongSideHost(SimSecurity);

impl Security for WrongSideHost {
    fn identity(&self) -> &SecurityIdentity {
        self.0.identity()
    }
    fn bars_count(&self) -> usize {
        self.0.bars_count()
    }
    fn is_bars_loaded(&self) -> bool {
        self.0.is_bars_loaded()
    }
    fn is_portfolio_ready(&self) -> bool {
        self.0.is_portfolio_ready()
    }
    fn last_bar_time(&self) -> Option<chrono::DateTime<Utc>> {
        self.0.last_bar_time()
    }
    fn bar_interval(&self) -> TimeDelta {
        self.0.bar_interval()
    }
    fn lot_size(&self) -> f64 {
        self.0.lot_size()
    }
    fn price_step(&self) -> f64 {
        self.0.price_step()
    }
    fn positions(&self) -> Vec<PositionSnapshot> {
        self.0.positions()
    }
    fn make_virtual_position(&self, ticket: &OrderTicket) -> Result<PositionSnapshot, HostError> {
        let flipped = OrderTicket {
            side: ticket.side.opposite(),
            ..ticket.clone()
        };
        self.0.make_virtual_position(&flipped)
    }
    fn open_position(&self, ticket: &OrderTicket) -> Result<PositionSnapshot, HostError> {
        self.0.open_position(ticket)
    }
    fn change_position(
        &self,
        id: PositionId,
        bar: usize,
        new_signed_qty: f64,
        price: f64,
        notes: &str,
    ) -> Result<PositionSnapshot, HostError> {
        self.0.change_position(id, bar, new_signed_qty, price, notes)
    }
    fn cancel_virtual_position(&self, id: PositionId) -> Result<(), HostError> {
        self.0.cancel_virtual_position(id)
    }
}

#[test]
fn wrong_side_from_host_is_an_invariant_violation() {
    let ctx = SimContext::new("mm-vol", "instance-1");
    let security = Arc::new(WrongSideHost(SimSecurity::new(call_id())));
    ctx.add_security(security.clone());
    let source = SingleSecuritySource::new(security.clone());
    let cache = InMemoryCache::new();
    let manager = ready_manager(&cache, ManagerConfig::default(), &ctx, &source);

    let err = manager
        .buy_at_price(&ctx, security.as_ref(), 1.0, 10.0, "b", "")
        .unwrap_err();

    assert!(matches!(err, PositionsError::InvariantViolation { .. }));
    assert_eq!(err.code(), "INVARIANT_VIOLATION");
    assert!(manager.virtual_positions(&ctx, Side::Long).unwrap().is_empty());
}
