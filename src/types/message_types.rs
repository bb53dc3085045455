//! Typed messages consumed by the engine and their responses.
//!
//! Wire encoding is the host's concern; these are the already-decoded forms.
//! Every message carries the sender identity, validated against the
//! operation's owner/accessor field by the engine. `validate_basic` performs
//! the stateless checks a message can fail without touching state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::conditions::UnlockCondition;
use crate::types::capsule_types::{validate_address, CapsuleKind};
use crate::types::error::{CapsuleError, Result};
use crate::types::params::Coin;
use crate::types::transfer_types::FailedTransfer;

/// Maximum sub-transfers accepted in one batch message.
pub const MAX_BATCH_TRANSFERS: usize = 100;

/// Maximum metadata entries accepted on creation.
pub const MAX_METADATA_ENTRIES: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCapsule {
    pub owner: String,
    pub recipient: Option<String>,
    pub kind: CapsuleKind,
    pub plaintext: Vec<u8>,
    pub threshold: u32,
    pub total_shares: u32,
    pub unlock_time: Option<u64>,
    pub condition_ref: Option<String>,
    /// Optional typed condition body registered under `condition_ref`.
    pub condition: Option<UnlockCondition>,
    pub required_sigs: Option<u32>,
    pub authorized_signers: Vec<String>,
    pub inactivity_period_secs: Option<u64>,
    pub grace_period_secs: Option<u64>,
    pub expires_at: Option<u64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl CreateCapsule {
    pub fn validate_basic(&self) -> Result<()> {
        validate_address(&self.owner)?;
        if let Some(recipient) = &self.recipient {
            validate_address(recipient)?;
        }
        for signer in &self.authorized_signers {
            validate_address(signer)?;
        }
        if self.metadata.len() > MAX_METADATA_ENTRIES {
            return Err(CapsuleError::bad_metadata(format!(
                "at most {} metadata entries allowed",
                MAX_METADATA_ENTRIES
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCapsuleResponse {
    pub capsule_id: u64,
}

/// A share as presented by an opener; `bytes` is the wire-encoded share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentedShare {
    pub share_index: u32,
    pub bytes: Vec<u8>,
}

/// A signature presented in support of a multi-sig open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentedSignature {
    pub signer: String,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenCapsule {
    pub accessor: String,
    pub capsule_id: u64,
    pub shares: Vec<PresentedShare>,
    pub signatures: Vec<PresentedSignature>,
    /// Opaque extra parameters forwarded to predicate evaluation.
    pub condition_proof: BTreeMap<String, String>,
}

impl OpenCapsule {
    pub fn validate_basic(&self) -> Result<()> {
        validate_address(&self.accessor)?;
        for sig in &self.signatures {
            validate_address(&sig.signer)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenCapsuleResponse {
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchActivity {
    pub owner: String,
    pub capsule_id: u64,
}

impl TouchActivity {
    pub fn validate_basic(&self) -> Result<()> {
        validate_address(&self.owner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelCapsule {
    pub owner: String,
    pub capsule_id: u64,
    pub reason: Option<String>,
}

impl CancelCapsule {
    pub fn validate_basic(&self) -> Result<()> {
        validate_address(&self.owner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCapsule {
    pub from: String,
    pub to: String,
    pub capsule_id: u64,
}

impl TransferCapsule {
    pub fn validate_basic(&self) -> Result<()> {
        validate_address(&self.from)?;
        validate_address(&self.to)?;
        if self.from == self.to {
            return Err(CapsuleError::invalid_address(
                "transfer to the current owner",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTransferItem {
    pub capsule_id: u64,
    pub to: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTransfer {
    pub from: String,
    pub transfers: Vec<BatchTransferItem>,
    pub transfer_fee: Option<Coin>,
    /// When set, items create pending transfers awaiting recipient approval.
    pub needs_approval: bool,
}

impl BatchTransfer {
    pub fn validate_basic(&self) -> Result<()> {
        validate_address(&self.from)?;
        if self.transfers.is_empty() {
            return Err(CapsuleError::bad_metadata("empty batch transfer"));
        }
        if self.transfers.len() > MAX_BATCH_TRANSFERS {
            return Err(CapsuleError::bad_metadata(format!(
                "batch exceeds {} transfers",
                MAX_BATCH_TRANSFERS
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTransferResponse {
    /// Capsules whose ownership changed in this message.
    pub transferred: Vec<u64>,
    /// Transfer ids of pending approvals created by this message.
    pub pending: Vec<String>,
    pub failed: Vec<FailedTransfer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveTransfer {
    pub approver: String,
    pub transfer_id: String,
    pub capsule_id: u64,
    pub approved: bool,
}

impl ApproveTransfer {
    pub fn validate_basic(&self) -> Result<()> {
        validate_address(&self.approver)?;
        if self.transfer_id.is_empty() {
            return Err(CapsuleError::TransferNotFound {
                transfer_id: String::new(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveTransferResponse {
    pub approved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyVoidCondition {
    pub owner: String,
    pub capsule_id: u64,
    pub reason: String,
    pub confirmation_code: String,
}

impl EmergencyVoidCondition {
    pub fn validate_basic(&self) -> Result<()> {
        validate_address(&self.owner)?;
        if self.reason.trim().is_empty() {
            return Err(CapsuleError::bad_metadata(
                "emergency void requires a reason",
            ));
        }
        Ok(())
    }
}
