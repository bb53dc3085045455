//! Ownership transfer and emergency action records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a completed transfer was effected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferKind {
    Direct,
    Batch,
    Approved,
}

impl TransferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferKind::Direct => "direct",
            TransferKind::Batch => "batch",
            TransferKind::Approved => "approved",
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a transfer awaiting recipient approval.
///
/// `Approved`, `Rejected` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingTransferStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl PendingTransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingTransferStatus::Pending => "pending",
            PendingTransferStatus::Approved => "approved",
            PendingTransferStatus::Rejected => "rejected",
            PendingTransferStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PendingTransferStatus::Pending)
    }
}

impl fmt::Display for PendingTransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transfer that re-owns the capsule only once the recipient approves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransfer {
    pub transfer_id: String,
    pub capsule_id: u64,
    pub from: String,
    pub to: String,
    pub requested_at: u64,
    /// Past this block time the tick processor marks the transfer expired.
    pub expires_at: u64,
    pub message: String,
    pub needs_approval: bool,
    pub status: PendingTransferStatus,
}

/// Immutable record of a committed ownership change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferHistory {
    pub transfer_id: String,
    pub capsule_id: u64,
    pub from: String,
    pub to: String,
    pub kind: TransferKind,
    pub committed_at: u64,
    pub block_height: u64,
    pub status: PendingTransferStatus,
}

/// Singleton counters maintained on every committed transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStats {
    pub total_transfers: u64,
    /// Currently open pending transfers.
    pub pending_transfers: u64,
    pub completed_transfers: u64,
    pub rejected_transfers: u64,
    pub batch_transfers: u64,
    pub last_transfer_at: Option<u64>,
    /// Monotonic allocator for transfer record identifiers.
    pub sequence: u64,
}

impl TransferStats {
    /// Hands out the next unique transfer sequence number.
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

/// Per-item failure reported by a batch transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTransfer {
    pub capsule_id: u64,
    /// Stable error code of the failure.
    pub code: String,
    pub reason: String,
}

/// The kinds of destructive emergency action the engine records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmergencyActionKind {
    VoidCondition,
}

impl EmergencyActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyActionKind::VoidCondition => "void_condition",
        }
    }
}

/// Append-only audit record of an irreversible emergency action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyAction {
    pub action_id: String,
    pub capsule_id: u64,
    pub actor: String,
    pub kind: EmergencyActionKind,
    pub reason: String,
    pub confirmation_code: String,
    pub committed_at: u64,
    pub block_height: u64,
    pub irreversible: bool,
}
