//! Replay of stored virtual positions into the live books.

use tracing::{debug, info_span, warn};

use super::{PositionsManager, StepReport, ensure_side, live_virtual, logged, resolve};
use crate::application::ports::{OrderTicket, SecurityResolver, TradingContext};
use crate::domain::shared::Side;
use crate::error::PositionsError;
use crate::observability::span_names;

impl PositionsManager<'_> {
    /// Recreate every stored virtual position missing from its book.
    ///
    /// Records whose security cannot be resolved, or that the host rejects,
    /// are skipped without affecting the rest. A record that already has a
    /// live virtual position of its side is left alone, so restoring twice
    /// is harmless.
    pub(super) fn restore_virtual_positions(
        &self,
        ctx: &dyn TradingContext,
        resolver: &dyn SecurityResolver,
        report: &mut StepReport,
    ) -> Result<(), PositionsError> {
        let _span = info_span!(span_names::RESTORE).entered();
        let store = self.virtual_store(ctx);
        let shift = self.config.virtual_pos_shift;

        for side in Side::BOTH {
            let Some(entries) = logged(store.load(side)) else {
                continue;
            };
            let mut offset = 0_usize;
            for entry in entries {
                let Some(security) = resolve(ctx, resolver, &entry.security) else {
                    warn!(security = %entry.security, %side, "Security of stored virtual position not found; skipped");
                    report.restore_skipped += 1;
                    continue;
                };
                if !live_virtual(security.as_ref(), side).is_empty() {
                    report.already_present += 1;
                    continue;
                }

                let record = &entry.record;
                let bars = security.bars_count();
                let bar = if record.entry_bar + shift < bars {
                    record.entry_bar
                } else {
                    offset += 1;
                    bars.saturating_sub(shift + offset)
                };
                let ticket = OrderTicket {
                    bar,
                    side: record.side,
                    qty: record.shares,
                    price: record.entry_price,
                    signal_name: record.signal_name.clone(),
                    notes: record.notes.clone(),
                };
                match security.make_virtual_position(&ticket) {
                    Ok(position) => {
                        ensure_side(security.as_ref(), &position, side)?;
                        debug!(security = %entry.security, %side, bar, shares = record.shares, "Virtual position restored");
                        report.restored += 1;
                    }
                    Err(e) => {
                        warn!(security = %entry.security, %side, error = %e, "Failed to restore virtual position");
                        report.restore_skipped += 1;
                    }
                }
            }
        }
        Ok(())
    }
}
