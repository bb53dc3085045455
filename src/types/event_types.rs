//! Events emitted on the success path of committed transactions.
//!
//! Events are queued inside the transaction and surface only on commit;
//! rollback discards them.

use serde::{Deserialize, Serialize};

use crate::types::capsule_types::CapsuleKind;
use crate::types::transfer_types::PendingTransferStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    CapsuleCreated {
        capsule_id: u64,
        owner: String,
        recipient: Option<String>,
        kind: CapsuleKind,
        plaintext_digest: [u8; 32],
        block_time: u64,
    },
    CapsuleOpened {
        capsule_id: u64,
        accessor: String,
        block_time: u64,
    },
    CapsuleTransferred {
        capsule_id: u64,
        from: String,
        to: String,
        block_time: u64,
    },
    CapsuleCancelled {
        capsule_id: u64,
        owner: String,
        reason: String,
        block_time: u64,
    },
    CapsuleExpired {
        capsule_id: u64,
        owner: String,
        block_time: u64,
    },
    ShareDistributed {
        capsule_id: u64,
        custodian_id: String,
        share_index: u32,
        block_time: u64,
    },
    EmergencyConditionVoided {
        capsule_id: u64,
        actor: String,
        action_id: String,
        block_time: u64,
    },
    PendingTransferCreated {
        transfer_id: String,
        capsule_id: u64,
        from: String,
        to: String,
        expires_at: u64,
        block_time: u64,
    },
    PendingTransferResolved {
        transfer_id: String,
        capsule_id: u64,
        status: PendingTransferStatus,
        block_time: u64,
    },
}
