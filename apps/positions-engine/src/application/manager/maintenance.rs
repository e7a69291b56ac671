//! Bulk operations over the virtual index: import of real exposure and drop.

use tracing::{info, warn};

use super::{PositionsManager, ensure_side, live_virtual, logged, resolve};
use crate::application::ports::{OrderTicket, Security, SecurityResolver, TradingContext};
use crate::application::stores::{VirtualEntry, VirtualPositionStore};
use crate::domain::position::PositionRecord;
use crate::domain::shared::Side;
use crate::domain::shared::tolerance::is_zero;
use crate::error::PositionsError;

impl PositionsManager<'_> {
    /// Mirror the active real exposure of every security holding real
    /// positions into the virtual index.
    ///
    /// Per side, existing virtual positions are cancelled and replaced by one
    /// virtual position carrying the net real quantity at its volume-weighted
    /// price. Returns the number of virtual positions created.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` when the host returns a position of the wrong side.
    pub fn import_real_positions(&self, ctx: &dyn TradingContext) -> Result<usize, PositionsError> {
        let store = self.virtual_store(ctx);
        let mut imported = 0;

        for security in ctx.securities() {
            let bar = security.bars_count().saturating_sub(1);
            let real: Vec<_> = security
                .positions()
                .into_iter()
                .filter(|p| !p.is_virtual && p.is_active_for_bar(bar))
                .collect();
            if real.is_empty() {
                continue;
            }
            for side in Side::BOTH {
                cancel_live_virtual(security.as_ref(), side);
                if logged(store.remove(side, security.identity())).is_none() {
                    continue;
                }

                let (shares, notional) = real
                    .iter()
                    .filter(|p| p.side == side)
                    .fold((0.0, 0.0), |(shares, notional), p| {
                        (shares + p.abs_shares(), notional + p.abs_shares() * p.average_entry_price)
                    });
                if is_zero(shares) {
                    continue;
                }
                let price = notional / shares;
                let ticket = OrderTicket {
                    bar: security.bars_count().saturating_sub(self.config.virtual_pos_shift),
                    side,
                    qty: shares,
                    price,
                    signal_name: "import".to_string(),
                    notes: String::new(),
                };
                let position = match security.make_virtual_position(&ticket) {
                    Ok(position) => position,
                    Err(e) => {
                        warn!(security = %security.identity(), %side, error = %e, "Failed to import real position");
                        continue;
                    }
                };
                ensure_side(security.as_ref(), &position, side)?;
                let entry = VirtualEntry::new(security.identity().clone(), PositionRecord::from_snapshot(&position));
                if logged(store.push(entry)).is_some() {
                    info!(security = %security.identity(), %side, shares, price, "Real exposure imported");
                    imported += 1;
                }
            }
        }
        Ok(imported)
    }

    /// Cancel the live virtual positions of every stored record and clear
    /// both lists. Returns the number of records dropped.
    pub fn drop_virtual_positions(
        &self,
        ctx: &dyn TradingContext,
        resolver: &dyn SecurityResolver,
    ) -> usize {
        let store = self.virtual_store(ctx);
        for side in Side::BOTH {
            for entry in logged(store.load(side)).unwrap_or_default() {
                if let Some(security) = resolve(ctx, resolver, &entry.security) {
                    cancel_live_virtual(security.as_ref(), side);
                }
            }
        }
        clear_all(&store)
    }
}

fn cancel_live_virtual(security: &dyn Security, side: Side) {
    for position in live_virtual(security, side) {
        if let Err(e) = security.cancel_virtual_position(position.id) {
            warn!(security = %security.identity(), position = %position.id, error = %e, "Failed to cancel virtual position");
        }
    }
}

fn clear_all(store: &VirtualPositionStore<'_>) -> usize {
    let Some((long, short)) = logged(store.clear()) else {
        return 0;
    };
    if long + short > 0 {
        warn!(highlight = true, long, short, "Virtual positions dropped");
    }
    long + short
}
