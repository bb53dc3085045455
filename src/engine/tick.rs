//! Per-block tick processing.
//!
//! Runs exactly once per block boundary, inside one transaction: walks the
//! capsule store in id order applying overdue expirations, then expires
//! pending transfers whose approval window has elapsed. All reads use the
//! block time the host supplies, never the wall clock.

use tracing::debug;

use crate::engine::{BlockContext, CapsuleEngine};
use crate::types::capsule_types::{CapsuleKind, CapsuleStatus};
use crate::types::error::Result;
use crate::types::event_types::Event;
use crate::types::transfer_types::PendingTransferStatus;

impl CapsuleEngine {
    /// Applies all block-boundary transitions for this block.
    pub fn process_block_tick(&self, ctx: &BlockContext) -> Result<()> {
        let mut txn = self.store().begin();
        let mut events = Vec::new();

        for mut capsule in txn.capsules_in_id_order()? {
            if capsule.status != CapsuleStatus::Active {
                continue;
            }
            if capsule.kind != CapsuleKind::DeadMansSwitch {
                continue;
            }
            let Some(expires_at) = capsule.expires_at else {
                continue;
            };
            if ctx.time < expires_at {
                continue;
            }
            capsule.status = CapsuleStatus::Expired;
            capsule.updated_at = ctx.time;
            txn.put_capsule(&capsule)?;
            events.push(Event::CapsuleExpired {
                capsule_id: capsule.id,
                owner: capsule.owner.clone(),
                block_time: ctx.time,
            });
        }

        let mut stats = txn.get_transfer_stats()?;
        let mut stats_dirty = false;
        for mut pending in txn.pending_transfers()? {
            if pending.status != PendingTransferStatus::Pending {
                continue;
            }
            if ctx.time < pending.expires_at {
                continue;
            }
            pending.status = PendingTransferStatus::Expired;
            txn.put_pending_transfer(&pending)?;
            stats.pending_transfers = stats.pending_transfers.saturating_sub(1);
            stats_dirty = true;
            events.push(Event::PendingTransferResolved {
                transfer_id: pending.transfer_id.clone(),
                capsule_id: pending.capsule_id,
                status: PendingTransferStatus::Expired,
                block_time: ctx.time,
            });
        }
        if stats_dirty {
            txn.put_transfer_stats(&stats)?;
        }

        let work = events.len();
        txn.commit();
        self.record_events(events);
        if work > 0 {
            debug!(height = ctx.height, transitions = work, "block tick applied");
        }
        Ok(())
    }
}
