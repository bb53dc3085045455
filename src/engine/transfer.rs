//! Ownership transfers: direct, batch and the approval flow.

use tracing::info;

use crate::engine::{authorization, BlockContext, CapsuleEngine};
use crate::storage::StoreTxn;
use crate::types::capsule_types::{validate_address, Capsule, CapsuleStatus};
use crate::types::error::{CapsuleError, Result};
use crate::types::event_types::Event;
use crate::types::message_types::{
    ApproveTransfer, ApproveTransferResponse, BatchTransfer, BatchTransferResponse,
    TransferCapsule,
};
use crate::types::transfer_types::{
    FailedTransfer, PendingTransfer, PendingTransferStatus, TransferHistory, TransferKind,
    TransferStats,
};

impl CapsuleEngine {
    /// Directly re-owns a capsule; sender must be the current owner.
    pub fn transfer_capsule(&self, ctx: &BlockContext, msg: TransferCapsule) -> Result<()> {
        msg.validate_basic()?;
        let mut txn = self.store().begin();
        let mut events = Vec::new();

        let capsule = txn.get_capsule(msg.capsule_id)?;
        authorization::require_owner(&capsule, &msg.from, "transfer")?;
        if capsule.status != CapsuleStatus::Active {
            return Err(CapsuleError::already_terminal(capsule.status));
        }

        let mut stats = txn.get_transfer_stats()?;
        complete_transfer(
            &mut txn,
            ctx,
            capsule,
            &msg.to,
            TransferKind::Direct,
            &mut stats,
            &mut events,
        )?;
        txn.put_transfer_stats(&stats)?;

        txn.commit();
        self.record_events(events);
        info!(capsule_id = msg.capsule_id, from = %msg.from, to = %msg.to, "capsule transferred");
        Ok(())
    }

    /// Processes up to 100 transfers in one message. Items fail
    /// independently; the message itself succeeds and reports per-item
    /// outcomes. Any transfer fee is debited once from the sender.
    pub fn batch_transfer(
        &self,
        ctx: &BlockContext,
        msg: BatchTransfer,
    ) -> Result<BatchTransferResponse> {
        msg.validate_basic()?;
        let params = self.params_snapshot();
        let mut txn = self.store().begin();
        let mut events = Vec::new();
        let mut stats = txn.get_transfer_stats()?;

        let mut transferred = Vec::new();
        let mut pending = Vec::new();
        let mut failed = Vec::new();

        for item in &msg.transfers {
            let outcome = process_batch_item(
                &mut txn,
                ctx,
                &msg.from,
                item,
                msg.needs_approval,
                params.pending_approval_window_secs,
                &mut stats,
                &mut events,
            );
            match outcome {
                Ok(BatchOutcome::Transferred) => transferred.push(item.capsule_id),
                Ok(BatchOutcome::Pending(transfer_id)) => pending.push(transfer_id),
                Err(err) => failed.push(FailedTransfer {
                    capsule_id: item.capsule_id,
                    code: err.code().to_string(),
                    reason: err.to_string(),
                }),
            }
        }

        txn.put_transfer_stats(&stats)?;

        if let Some(fee) = &msg.transfer_fee {
            if !fee.is_zero() {
                self.accounting()
                    .debit(&msg.from, fee)
                    .map_err(|e| CapsuleError::fee_debit_failed(e.to_string()))?;
            }
        }

        txn.commit();
        self.record_events(events);
        info!(
            from = %msg.from,
            transferred = transferred.len(),
            pending = pending.len(),
            failed = failed.len(),
            "batch transfer processed"
        );
        Ok(BatchTransferResponse {
            transferred,
            pending,
            failed,
        })
    }

    /// Resolves a pending transfer. Approval re-owns the capsule; rejection
    /// and expiry leave it untouched.
    pub fn approve_transfer(
        &self,
        ctx: &BlockContext,
        msg: ApproveTransfer,
    ) -> Result<ApproveTransferResponse> {
        msg.validate_basic()?;
        let mut txn = self.store().begin();
        let mut events = Vec::new();

        let mut pending = txn.get_pending_transfer(&msg.transfer_id)?;
        if pending.capsule_id != msg.capsule_id {
            return Err(CapsuleError::TransferNotFound {
                transfer_id: msg.transfer_id.clone(),
            });
        }
        if pending.status.is_terminal() {
            return Err(CapsuleError::already_terminal(pending.status));
        }
        if ctx.time >= pending.expires_at {
            return Err(CapsuleError::PendingTransferExpired {
                transfer_id: msg.transfer_id.clone(),
            });
        }
        authorization::require_approver(&pending, &msg.approver)?;

        let mut stats = txn.get_transfer_stats()?;
        if msg.approved {
            let capsule = txn.get_capsule(pending.capsule_id)?;
            if capsule.owner != pending.from {
                return Err(CapsuleError::unauthorized(
                    "capsule changed hands since the transfer was requested",
                ));
            }
            if capsule.status != CapsuleStatus::Active {
                return Err(CapsuleError::already_terminal(capsule.status));
            }
            complete_transfer(
                &mut txn,
                ctx,
                capsule,
                &pending.to,
                TransferKind::Approved,
                &mut stats,
                &mut events,
            )?;
            pending.status = PendingTransferStatus::Approved;
        } else {
            pending.status = PendingTransferStatus::Rejected;
            stats.rejected_transfers += 1;
        }
        stats.pending_transfers = stats.pending_transfers.saturating_sub(1);

        txn.put_pending_transfer(&pending)?;
        txn.put_transfer_stats(&stats)?;

        events.push(Event::PendingTransferResolved {
            transfer_id: pending.transfer_id.clone(),
            capsule_id: pending.capsule_id,
            status: pending.status,
            block_time: ctx.time,
        });
        txn.commit();
        self.record_events(events);
        info!(
            transfer_id = %msg.transfer_id,
            approved = msg.approved,
            "pending transfer resolved"
        );
        Ok(ApproveTransferResponse {
            approved: msg.approved,
        })
    }
}

enum BatchOutcome {
    Transferred,
    Pending(String),
}

#[allow(clippy::too_many_arguments)]
fn process_batch_item(
    txn: &mut StoreTxn<'_>,
    ctx: &BlockContext,
    from: &str,
    item: &crate::types::message_types::BatchTransferItem,
    needs_approval: bool,
    approval_window_secs: u64,
    stats: &mut TransferStats,
    events: &mut Vec<Event>,
) -> Result<BatchOutcome> {
    validate_address(&item.to)?;
    if item.to == from {
        return Err(CapsuleError::invalid_address("transfer to the current owner"));
    }
    let capsule = txn.get_capsule(item.capsule_id)?;
    authorization::require_owner(&capsule, from, "transfer")?;
    if capsule.status != CapsuleStatus::Active {
        return Err(CapsuleError::already_terminal(capsule.status));
    }

    if needs_approval {
        let seq = stats.next_sequence();
        let transfer_id = format!("pending-{}-{}-{}", item.capsule_id, ctx.height, seq);
        let pending = PendingTransfer {
            transfer_id: transfer_id.clone(),
            capsule_id: item.capsule_id,
            from: from.to_string(),
            to: item.to.clone(),
            requested_at: ctx.time,
            expires_at: ctx.time + approval_window_secs,
            message: item.message.clone().unwrap_or_default(),
            needs_approval: true,
            status: PendingTransferStatus::Pending,
        };
        txn.insert_pending_transfer_new(&pending)?;
        stats.pending_transfers += 1;
        events.push(Event::PendingTransferCreated {
            transfer_id: transfer_id.clone(),
            capsule_id: item.capsule_id,
            from: from.to_string(),
            to: item.to.clone(),
            expires_at: pending.expires_at,
            block_time: ctx.time,
        });
        Ok(BatchOutcome::Pending(transfer_id))
    } else {
        complete_transfer(
            txn,
            ctx,
            capsule,
            &item.to,
            TransferKind::Batch,
            stats,
            events,
        )?;
        Ok(BatchOutcome::Transferred)
    }
}

/// Applies an ownership change: capsule record, owner index, history entry
/// and statistics, plus the transfer event.
fn complete_transfer(
    txn: &mut StoreTxn<'_>,
    ctx: &BlockContext,
    mut capsule: Capsule,
    to: &str,
    kind: TransferKind,
    stats: &mut TransferStats,
    events: &mut Vec<Event>,
) -> Result<String> {
    let from = capsule.owner.clone();
    let capsule_id = capsule.id;

    capsule.owner = to.to_string();
    capsule.updated_at = ctx.time;
    txn.put_capsule(&capsule)?;
    txn.unindex_owner(&from, capsule_id);
    txn.index_owner(to, capsule_id);

    let seq = stats.next_sequence();
    let transfer_id = format!("transfer-{}-{}-{}", capsule_id, ctx.height, seq);
    txn.insert_transfer_history_new(&TransferHistory {
        transfer_id: transfer_id.clone(),
        capsule_id,
        from: from.clone(),
        to: to.to_string(),
        kind,
        committed_at: ctx.time,
        block_height: ctx.height,
        status: PendingTransferStatus::Approved,
    })?;

    stats.total_transfers += 1;
    stats.completed_transfers += 1;
    if kind == TransferKind::Batch {
        stats.batch_transfers += 1;
    }
    stats.last_transfer_at = Some(ctx.time);

    events.push(Event::CapsuleTransferred {
        capsule_id,
        from,
        to: to.to_string(),
        block_time: ctx.time,
    });
    Ok(transfer_id)
}
