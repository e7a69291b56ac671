//! Volatility intents and the pending order queue.

use tracing::{debug, info, info_span, warn};

use super::placement::OrderRequest;
use super::{OrderOutcome, PositionsManager, SkipReason, StepReport, logged, resolve};
use crate::application::ports::{QuoteTerms, Security, SecurityResolver, TradingContext};
use crate::domain::intent::{IvTarget, PendingOrder, VolQuote};
use crate::domain::shared::tolerance::{is_negative, is_positive, is_valid_positive, is_zero};
use crate::domain::shared::{Side, round_to_step};
use crate::error::PositionsError;
use crate::observability::span_names;
use crate::pricing::PricingError;

impl PositionsManager<'_> {
    /// Queue an intent to hold `qty` more long contracts of `security`,
    /// quoted per `quote`. A negative quantity queues a short intent.
    ///
    /// Replaces any earlier long intent on the same security.
    ///
    /// # Errors
    ///
    /// Never fails today; the signature matches the other trading calls.
    pub fn buy_volatility(
        &self,
        ctx: &dyn TradingContext,
        security: &dyn Security,
        qty: f64,
        quote: VolQuote,
        signal_name: &str,
        notes: &str,
    ) -> Result<OrderOutcome, PositionsError> {
        Ok(self.queue_intent(ctx, security, Side::Long, qty, quote, signal_name, notes))
    }

    /// Queue an intent to hold `qty` more short contracts of `security`.
    /// A negative quantity queues a long intent.
    ///
    /// # Errors
    ///
    /// Never fails today; the signature matches the other trading calls.
    pub fn sell_volatility(
        &self,
        ctx: &dyn TradingContext,
        security: &dyn Security,
        qty: f64,
        quote: VolQuote,
        signal_name: &str,
        notes: &str,
    ) -> Result<OrderOutcome, PositionsError> {
        Ok(self.queue_intent(ctx, security, Side::Short, qty, quote, signal_name, notes))
    }

    #[allow(clippy::too_many_arguments)]
    fn queue_intent(
        &self,
        ctx: &dyn TradingContext,
        security: &dyn Security,
        side: Side,
        qty: f64,
        quote: VolQuote,
        signal_name: &str,
        notes: &str,
    ) -> OrderOutcome {
        if is_negative(qty) {
            return self.queue_intent(ctx, security, side.opposite(), -qty, quote, signal_name, notes);
        }
        if is_zero(qty) {
            return OrderOutcome::NoOp;
        }
        let id = security.identity();
        if ctx.is_trading_blocked() {
            warn!(highlight = true, security = %id, %side, qty, "Trading is blocked; volatility order skipped");
            return OrderOutcome::skipped(SkipReason::TradingBlocked);
        }

        let current = side_qty(security, side);
        let target = IvTarget::new(id.clone(), side, current.abs() + qty, quote, signal_name, notes);
        let target_shares = target.target_shares;
        if logged(self.intent_store(ctx).replace(target)).is_none() {
            return OrderOutcome::skipped(SkipReason::StoreUnavailable);
        }
        info!(security = %id, %side, current, target_shares, iv = quote.iv, mode = ?quote.mode, "Volatility intent queued");
        OrderOutcome::IntentQueued { target_shares }
    }

    /// Remove the `side` intents of the security named `full_name`
    /// (case-insensitive). Allowed while trading is blocked.
    pub fn cancel_volatility(&self, ctx: &dyn TradingContext, side: Side, full_name: &str) -> usize {
        let removed = logged(self.intent_store(ctx).cancel_by_name(side, full_name)).unwrap_or(0);
        info!(%side, full_name, removed, "Volatility intents cancelled");
        removed
    }

    /// Clear every long intent. Returns the prior count.
    pub fn drop_all_long_iv_targets(&self, ctx: &dyn TradingContext) -> usize {
        self.drop_iv_targets(ctx, Side::Long)
    }

    /// Clear every short intent. Returns the prior count.
    pub fn drop_all_short_iv_targets(&self, ctx: &dyn TradingContext) -> usize {
        self.drop_iv_targets(ctx, Side::Short)
    }

    /// Clear every intent of both sides. Returns the prior count.
    pub fn drop_all_iv_targets(&self, ctx: &dyn TradingContext) -> usize {
        self.drop_all_long_iv_targets(ctx) + self.drop_all_short_iv_targets(ctx)
    }

    fn drop_iv_targets(&self, ctx: &dyn TradingContext, side: Side) -> usize {
        let dropped = logged(self.intent_store(ctx).clear(side)).unwrap_or(0);
        if dropped > 0 {
            warn!(highlight = true, %side, dropped, "All volatility intents dropped");
        }
        dropped
    }

    /// Queue a fixed-price order for the next step and ask the host to
    /// recalculate. Returns the queue length, or `None` if the queue is
    /// unavailable.
    pub fn queue_order(&self, ctx: &dyn TradingContext, order: PendingOrder) -> Option<usize> {
        let security = order.security.clone();
        let queued = logged(self.pending_store(ctx).push(order))?;
        debug!(%security, queued, "Order queued");
        ctx.recalc("pending order queued");
        Some(queued)
    }

    pub(super) fn drain_pending_orders(
        &self,
        ctx: &dyn TradingContext,
        resolver: &dyn SecurityResolver,
        report: &mut StepReport,
    ) -> Result<(), PositionsError> {
        let queue = self.pending_store(ctx);
        let Some(orders) = logged(queue.take_all()) else {
            return Ok(());
        };
        let mut orders = orders.into_iter();
        while let Some(order) = orders.next() {
            let Some(security) = resolve(ctx, resolver, &order.security) else {
                warn!(security = %order.security, "Security of queued order not found; kept");
                report.pending_kept += 1;
                logged(queue.push(order));
                continue;
            };
            let placed = self.place(
                ctx,
                security.as_ref(),
                OrderRequest {
                    side: order.side,
                    qty: order.qty,
                    price: order.price,
                    signal_name: &order.signal_name,
                    notes: &order.notes,
                },
            );
            let outcome = match placed {
                Ok(outcome) => outcome,
                Err(e) => {
                    // Orders behind the failing one were never attempted.
                    for rest in orders {
                        logged(queue.push(rest));
                    }
                    return Err(e);
                }
            };
            match outcome.skip_reason() {
                None => report.pending_executed += 1,
                Some(reason) if reason.is_retryable() => {
                    debug!(security = %order.security, reason = reason.code(), "Queued order skipped; kept");
                    report.pending_kept += 1;
                    logged(queue.push(order));
                }
                Some(reason) => {
                    warn!(highlight = true, security = %order.security, reason = reason.code(), "Queued order dropped");
                    report.pending_dropped += 1;
                }
            }
        }
        Ok(())
    }

    pub(super) fn drain_intents(
        &self,
        ctx: &dyn TradingContext,
        resolver: &dyn SecurityResolver,
        report: &mut StepReport,
    ) -> Result<(), PositionsError> {
        let _span = info_span!(span_names::INTENTS).entered();
        let store = self.intent_store(ctx);

        for side in Side::BOTH {
            let Some(targets) = logged(store.load(side)) else {
                continue;
            };
            for target in targets {
                let Some(security) = resolve(ctx, resolver, &target.security) else {
                    warn!(security = %target.security, %side, "Security of volatility intent not found; kept");
                    report.intents_kept += 1;
                    continue;
                };
                let current = side_qty(security.as_ref(), side);
                let remaining = target.remaining(current, security.lot_size());
                if !is_positive(remaining) {
                    if logged(store.remove(side, &target.security)).is_some() {
                        info!(security = %target.security, %side, current, "Volatility target reached");
                        report.intents_satisfied += 1;
                    }
                    continue;
                }

                let price = resolver
                    .quote_terms(&target.security)
                    .ok_or_else(|| PricingError::InvalidInput {
                        message: "no quote terms".to_string(),
                    })
                    .and_then(|terms| intent_price(&target, &terms, security.price_step()));
                let price = match price {
                    Ok(price) => price,
                    Err(e) => {
                        warn!(security = %target.security, %side, error = %e, "Cannot price volatility intent; kept");
                        report.intents_kept += 1;
                        continue;
                    }
                };

                let outcome = self.place(
                    ctx,
                    security.as_ref(),
                    OrderRequest {
                        side,
                        qty: remaining,
                        price,
                        signal_name: &target.signal_name,
                        notes: &target.notes,
                    },
                )?;
                if outcome.is_filled() {
                    debug!(security = %target.security, %side, remaining, price, "Volatility intent order issued");
                    report.intents_issued += 1;
                } else {
                    report.intents_kept += 1;
                }
            }
        }
        Ok(())
    }
}

/// Signed open quantity of `side` in the book of `security` at its last bar.
fn side_qty(security: &dyn Security, side: Side) -> f64 {
    let bar = security.bars_count().saturating_sub(1);
    security
        .positions()
        .iter()
        .filter(|p| p.side == side && p.is_active_for_bar(bar))
        .map(|p| p.signed_shares())
        .sum()
}

/// Limit price of an intent: the option's value at the quote volatility,
/// shifted by the intent's price steps and rounded to the step.
fn intent_price(target: &IvTarget, terms: &QuoteTerms, price_step: f64) -> Result<f64, PricingError> {
    let smile_iv = terms.smile.try_volatility(terms.strike)?;
    let sigma = target.quote_volatility(smile_iv);
    if !is_valid_positive(sigma) {
        return Err(PricingError::NoVolatility {
            strike: terms.strike,
            value: sigma,
        });
    }
    let theoretical = terms.smile.price_with_volatility(terms.strike, sigma, terms.kind)?;
    let price = round_to_step(target.shifted_price(theoretical, price_step), price_step);
    if is_positive(price) {
        Ok(price)
    } else {
        Err(PricingError::InvalidInput {
            message: format!("non-positive limit price {price}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::intent::QuoteMode;
    use crate::domain::security::SecurityIdentity;
    use crate::domain::smile::SmileInfo;
    use crate::pricing::{OptionKind, option_price};

    fn target(mode: QuoteMode, iv: f64, shift: f64, side: Side) -> IvTarget {
        IvTarget::new(
            SecurityIdentity::new("DS", "C100", "C100"),
            side,
            1.0,
            VolQuote { mode, iv, price_shift: shift },
            "vol",
            "",
        )
    }

    fn terms() -> QuoteTerms {
        QuoteTerms {
            strike: 100.0,
            kind: OptionKind::Call,
            smile: SmileInfo::flat(100.0, 0.25, 0.0, 0.3),
        }
    }

    #[test]
    fn absolute_quote_prices_at_given_volatility() {
        let price = intent_price(&target(QuoteMode::AbsoluteIv, 0.4, 0.0, Side::Long), &terms(), 0.01).unwrap();
        let theo = option_price(100.0, 100.0, 0.25, 0.4, 0.0, OptionKind::Call);
        assert!((price - theo).abs() <= 0.005 + 1e-12);
    }

    #[test]
    fn smile_shift_and_price_shift_apply() {
        let long = intent_price(&target(QuoteMode::SmileShift, 0.0, 3.0, Side::Long), &terms(), 0.1).unwrap();
        let short = intent_price(&target(QuoteMode::SmileShift, 0.0, 3.0, Side::Short), &terms(), 0.1).unwrap();
        assert!((long - short - 0.6).abs() < 0.1 + 1e-9);
    }

    #[test]
    fn negative_quote_volatility_is_rejected() {
        let err = intent_price(&target(QuoteMode::SmileShift, -0.5, 0.0, Side::Long), &terms(), 0.01).unwrap_err();
        assert!(matches!(err, PricingError::NoVolatility { .. }));
    }
}
