//! Fixed-price order placement, virtual and real.

use tracing::{debug, info, warn};

use super::{OrderOutcome, PositionsManager, SkipReason, ensure_side, live_virtual, logged};
use crate::application::ports::{HostError, OrderTicket, Security, TradingContext};
use crate::application::stores::VirtualEntry;
use crate::domain::position::{PositionRecord, PositionSnapshot};
use crate::domain::shared::Side;
use crate::domain::shared::tolerance::{is_negative, is_zero};
use crate::error::PositionsError;

/// One order as seen by the placement protocol.
#[derive(Debug, Clone, Copy)]
pub(super) struct OrderRequest<'s> {
    pub side: Side,
    pub qty: f64,
    pub price: f64,
    pub signal_name: &'s str,
    pub notes: &'s str,
}

impl OrderRequest<'_> {
    fn ticket(&self, bar: usize, qty: f64, price: f64) -> OrderTicket {
        OrderTicket {
            bar,
            side: self.side,
            qty,
            price,
            signal_name: self.signal_name.to_string(),
            notes: self.notes.to_string(),
        }
    }
}

impl PositionsManager<'_> {
    /// Buy `qty` of `security` at `price`. A negative quantity sells.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` when the host returns a short position.
    pub fn buy_at_price(
        &self,
        ctx: &dyn TradingContext,
        security: &dyn Security,
        qty: f64,
        price: f64,
        signal_name: &str,
        notes: &str,
    ) -> Result<OrderOutcome, PositionsError> {
        self.place(
            ctx,
            security,
            OrderRequest {
                side: Side::Long,
                qty,
                price,
                signal_name,
                notes,
            },
        )
    }

    /// Sell `qty` of `security` at `price`. A negative quantity buys.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` when the host returns a long position.
    pub fn sell_at_price(
        &self,
        ctx: &dyn TradingContext,
        security: &dyn Security,
        qty: f64,
        price: f64,
        signal_name: &str,
        notes: &str,
    ) -> Result<OrderOutcome, PositionsError> {
        self.place(
            ctx,
            security,
            OrderRequest {
                side: Side::Short,
                qty,
                price,
                signal_name,
                notes,
            },
        )
    }

    pub(super) fn place(
        &self,
        ctx: &dyn TradingContext,
        security: &dyn Security,
        request: OrderRequest<'_>,
    ) -> Result<OrderOutcome, PositionsError> {
        if is_negative(request.qty) {
            return self.place(
                ctx,
                security,
                OrderRequest {
                    side: request.side.opposite(),
                    qty: -request.qty,
                    ..request
                },
            );
        }
        if is_zero(request.qty) {
            return Ok(OrderOutcome::NoOp);
        }
        let id = security.identity();
        if ctx.is_trading_blocked() {
            warn!(highlight = true, security = %id, side = %request.side, qty = request.qty, "Trading is blocked; order skipped");
            return Ok(OrderOutcome::skipped(SkipReason::TradingBlocked));
        }
        if !self.ready {
            warn!(security = %id, side = %request.side, qty = request.qty, "Portfolio not ready; order skipped");
            return Ok(OrderOutcome::skipped(SkipReason::PortfolioNotReady));
        }

        if self.config.use_virtual_positions {
            self.place_virtual(ctx, security, request)
        } else {
            self.place_real(ctx, security, request)
        }
    }

    fn place_virtual(
        &self,
        ctx: &dyn TradingContext,
        security: &dyn Security,
        request: OrderRequest<'_>,
    ) -> Result<OrderOutcome, PositionsError> {
        let side = request.side;
        let id = security.identity();
        let store = self.virtual_store(ctx);
        let bar = security
            .bars_count()
            .saturating_sub(self.config.virtual_pos_shift);

        let Some(found) = logged(store.find(side, id)) else {
            return Ok(OrderOutcome::skipped(SkipReason::StoreUnavailable));
        };
        let existing = match found {
            Ok(entry) => entry.map(|e| e.record),
            Err(e) => {
                warn!(highlight = true, error = %e, "Order aborted");
                return Ok(OrderOutcome::skipped(SkipReason::DuplicateVirtualPositions));
            }
        };

        let Some(old) = existing else {
            let ticket = request.ticket(bar, request.qty, request.price);
            let position = match security.make_virtual_position(&ticket) {
                Ok(position) => position,
                Err(e) => return Ok(host_rejected(security, &e)),
            };
            ensure_side(security, &position, side)?;
            if logged(store.push(VirtualEntry::new(id.clone(), PositionRecord::from_snapshot(&position))))
                .is_none()
            {
                return Ok(OrderOutcome::skipped(SkipReason::StoreUnavailable));
            }
            info!(security = %id, %side, qty = request.qty, price = request.price, bar, "Virtual position opened");
            return Ok(OrderOutcome::VirtualOpened {
                id: position.id,
                shares: position.abs_shares(),
                price: position.average_entry_price,
            });
        };

        let shares = old.shares + request.qty;
        let price = (old.entry_price * old.shares + request.price * request.qty) / shares;
        let live = live_virtual(security, side).into_iter().next();

        if old.entry_bar < bar {
            let position = match live {
                Some(position) => {
                    security.change_position(position.id, bar, side.signed(shares), price, request.notes)
                }
                None => {
                    debug!(security = %id, %side, "Stored virtual position missing from book; recreating");
                    security.make_virtual_position(&request.ticket(old.entry_bar, shares, price))
                }
            };
            let position = match position {
                Ok(position) => position,
                Err(e) => return Ok(host_rejected(security, &e)),
            };
            ensure_side(security, &position, side)?;

            let notes = if request.notes.is_empty() {
                old.notes.clone()
            } else {
                request.notes.to_string()
            };
            let record = PositionRecord::new(old.entry_bar, side, shares, price, old.signal_name.clone(), notes);
            if logged(store.upsert(VirtualEntry::new(id.clone(), record))).is_none() {
                return Ok(OrderOutcome::skipped(SkipReason::StoreUnavailable));
            }
            info!(security = %id, %side, shares, price, "Virtual position merged");
            return Ok(OrderOutcome::VirtualMerged {
                id: position.id,
                shares,
                price,
            });
        }

        // Opened at or after the placement bar: a restore artifact. Recreate it merged.
        if let Some(position) = live {
            if let Err(e) = security.cancel_virtual_position(position.id) {
                warn!(security = %id, position = %position.id, error = %e, "Failed to cancel virtual position");
            }
        }
        if logged(store.remove(side, id)).is_none() {
            return Ok(OrderOutcome::skipped(SkipReason::StoreUnavailable));
        }
        let position = match security.make_virtual_position(&request.ticket(bar, shares, price)) {
            Ok(position) => position,
            Err(e) => return Ok(host_rejected(security, &e)),
        };
        ensure_side(security, &position, side)?;
        if logged(store.push(VirtualEntry::new(id.clone(), PositionRecord::from_snapshot(&position))))
            .is_none()
        {
            return Ok(OrderOutcome::skipped(SkipReason::StoreUnavailable));
        }
        info!(security = %id, %side, shares, price, bar, "Virtual position replaced");
        Ok(OrderOutcome::VirtualReplaced {
            id: position.id,
            shares,
            price,
        })
    }

    fn place_real(
        &self,
        ctx: &dyn TradingContext,
        security: &dyn Security,
        request: OrderRequest<'_>,
    ) -> Result<OrderOutcome, PositionsError> {
        let side = request.side;
        let id = security.identity();
        if !security.is_bars_loaded() {
            warn!(highlight = true, security = %id, "Waiting for bar history to load; order skipped");
            return Ok(OrderOutcome::skipped(SkipReason::BarsNotLoaded));
        }
        if self.config.check_time && self.is_stale(ctx, security) {
            warn!(
                highlight = true,
                security = %id,
                last_bar = ?security.last_bar_time(),
                now = %ctx.now(),
                "Last bar is stale; order skipped"
            );
            return Ok(OrderOutcome::skipped(SkipReason::StaleBars));
        }

        let bar = security.bars_count().saturating_sub(1);
        if self.config.aggregate_positions {
            let matching: Vec<PositionSnapshot> = security
                .positions()
                .into_iter()
                .filter(|p| !p.is_virtual && p.side == side && p.is_active_for_bar(bar))
                .collect();
            if matching.len() > 1 {
                warn!(security = %id, %side, count = matching.len(), "Several real positions to aggregate into; using the first");
            }
            if let Some(old) = matching.first() {
                // Extension re-marks the position at the incoming fill price, not a weighted average.
                let shares = old.abs_shares() + request.qty;
                let position = match security.change_position(
                    old.id,
                    bar,
                    side.signed(shares),
                    request.price,
                    request.notes,
                ) {
                    Ok(position) => position,
                    Err(e) => return Ok(host_rejected(security, &e)),
                };
                ensure_side(security, &position, side)?;
                info!(security = %id, %side, shares, price = request.price, "Real position extended");
                return Ok(OrderOutcome::RealExtended {
                    id: position.id,
                    shares,
                    price: request.price,
                });
            }
        }

        let position = match security.open_position(&request.ticket(bar, request.qty, request.price)) {
            Ok(position) => position,
            Err(e) => return Ok(host_rejected(security, &e)),
        };
        ensure_side(security, &position, side)?;
        info!(security = %id, %side, qty = request.qty, price = request.price, "Real position opened");
        Ok(OrderOutcome::RealOpened {
            id: position.id,
            shares: position.abs_shares(),
            price: request.price,
        })
    }

    /// True when the last bar is missing or older than the staleness window.
    fn is_stale(&self, ctx: &dyn TradingContext, security: &dyn Security) -> bool {
        let Some(last) = security.last_bar_time() else {
            return true;
        };
        let multiplier = i32::try_from(self.config.stale_bar_multiplier).unwrap_or(i32::MAX);
        security
            .bar_interval()
            .checked_mul(multiplier)
            .is_some_and(|window| ctx.now() - last > window)
    }
}

fn host_rejected(security: &dyn Security, err: &HostError) -> OrderOutcome {
    warn!(highlight = true, security = %security.identity(), error = %err, "Host rejected order");
    OrderOutcome::skipped(SkipReason::HostRejected)
}
