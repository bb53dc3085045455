//! Core capsule record types.
//!
//! A capsule is a persistent record holding an encrypted payload binding and
//! the typed conditions under which it may be opened. Everything here is
//! plain persisted data; lifecycle logic lives in the engine.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::conditions::UnlockCondition;
use crate::crypto::AeadAlgorithm;
use crate::payload::PayloadBinding;
use crate::types::error::{CapsuleError, Result};

/// Maximum length accepted for account identifiers.
pub const MAX_ADDRESS_LEN: usize = 90;

/// Checks that an account identifier is well-formed.
///
/// Identifiers are opaque to the engine; this only enforces shape: lowercase
/// ASCII alphanumerics plus `-` and `_`, starting with a letter, between 3
/// and [`MAX_ADDRESS_LEN`] characters.
pub fn validate_address(address: &str) -> Result<()> {
    let ok = address.len() >= 3
        && address.len() <= MAX_ADDRESS_LEN
        && address.starts_with(|c: char| c.is_ascii_lowercase())
        && address
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(CapsuleError::invalid_address(address))
    }
}

/// The kind of a capsule, fixing which unlock predicate gates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapsuleKind {
    /// Always openable by the owner.
    Safe,
    /// Openable once block time reaches `unlock_time`.
    TimeLock,
    /// Gated by a registered condition contract.
    Conditional,
    /// Gated by a quorum of authorized signatures.
    MultiSig,
    /// Released to the recipient after owner inactivity.
    DeadMansSwitch,
}

impl CapsuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapsuleKind::Safe => "safe",
            CapsuleKind::TimeLock => "time_lock",
            CapsuleKind::Conditional => "conditional",
            CapsuleKind::MultiSig => "multi_sig",
            CapsuleKind::DeadMansSwitch => "dead_mans_switch",
        }
    }
}

impl fmt::Display for CapsuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a capsule.
///
/// `Unlocked`, `Expired` and `Cancelled` are terminal: no status transition
/// ever leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapsuleStatus {
    Active,
    Unlocked,
    Expired,
    Cancelled,
}

impl CapsuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapsuleStatus::Active => "active",
            CapsuleStatus::Unlocked => "unlocked",
            CapsuleStatus::Expired => "expired",
            CapsuleStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, CapsuleStatus::Active)
    }
}

impl fmt::Display for CapsuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A time capsule: encrypted payload metadata plus unlock conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capsule {
    /// Monotonically assigned identifier; never reused.
    pub id: u64,
    pub owner: String,
    pub recipient: Option<String>,
    pub kind: CapsuleKind,
    pub status: CapsuleStatus,

    /// Where the ciphertext lives, with its nonce.
    pub payload: PayloadBinding,
    /// blake3 digest of the original plaintext, checked after decryption.
    pub plaintext_digest: [u8; 32],
    pub algorithm: AeadAlgorithm,
    /// Ciphertext format version, carried for forward compatibility.
    pub ciphertext_version: u8,
    /// Original plaintext length in bytes.
    pub plaintext_size: u64,

    /// Minimum shares required to reconstruct the key.
    pub threshold: u32,
    /// Number of shares produced at creation.
    pub total_shares: u32,
    /// Custodian identifiers, one per share, in share-index order.
    pub share_holders: Vec<String>,

    pub unlock_time: Option<u64>,
    pub condition_ref: Option<String>,
    pub required_sigs: Option<u32>,
    pub authorized_signers: Vec<String>,
    pub inactivity_period_secs: Option<u64>,
    pub grace_period_secs: Option<u64>,
    pub last_activity_at: Option<u64>,
    /// Optional hard expiry applied by the tick processor.
    pub expires_at: Option<u64>,

    pub created_at: u64,
    pub updated_at: u64,

    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl Capsule {
    /// Structural validation of a capsule record.
    ///
    /// Mirrors the data-model invariants: address shapes, threshold bounds,
    /// custodian count, and the kind-specific required fields.
    pub fn validate(&self) -> Result<()> {
        if self.id == 0 {
            return Err(CapsuleError::internal_invariant("capsule id zero"));
        }
        validate_address(&self.owner)?;
        if let Some(recipient) = &self.recipient {
            validate_address(recipient)?;
        }
        if self.total_shares == 0 {
            return Err(CapsuleError::invalid_threshold(
                "total shares must be at least 1",
            ));
        }
        if self.threshold == 0 {
            return Err(CapsuleError::ThresholdZero);
        }
        if self.threshold > self.total_shares {
            return Err(CapsuleError::ThresholdTooLarge {
                threshold: self.threshold,
                total: self.total_shares,
            });
        }
        if self.share_holders.len() != self.total_shares as usize {
            return Err(CapsuleError::internal_invariant(format!(
                "capsule {}: {} share holders recorded, expected {}",
                self.id,
                self.share_holders.len(),
                self.total_shares
            )));
        }

        match self.kind {
            CapsuleKind::Safe => {}
            CapsuleKind::TimeLock => {
                let unlock_time = self.unlock_time.ok_or_else(|| {
                    CapsuleError::invalid_timelock("time-locked capsule missing unlock time")
                })?;
                if unlock_time <= self.created_at {
                    return Err(CapsuleError::invalid_timelock(
                        "unlock time must be strictly after creation",
                    ));
                }
            }
            CapsuleKind::Conditional => {
                if self.condition_ref.as_deref().unwrap_or("").is_empty()
                    && self.status == CapsuleStatus::Active
                {
                    return Err(CapsuleError::invalid_kind(
                        "conditional capsule missing condition reference",
                    ));
                }
            }
            CapsuleKind::MultiSig => {
                let required = self.required_sigs.unwrap_or(0);
                if required == 0 {
                    return Err(CapsuleError::invalid_threshold(
                        "multi-sig capsule must require at least one signature",
                    ));
                }
                if self.authorized_signers.is_empty() {
                    return Err(CapsuleError::invalid_kind(
                        "multi-sig capsule missing authorized signers",
                    ));
                }
                if required as usize > self.authorized_signers.len() {
                    return Err(CapsuleError::invalid_threshold(
                        "required signatures exceed authorized signer count",
                    ));
                }
            }
            CapsuleKind::DeadMansSwitch => {
                if self.inactivity_period_secs.unwrap_or(0) == 0 {
                    return Err(CapsuleError::invalid_kind(
                        "dead man's switch capsule missing inactivity period",
                    ));
                }
                if self.recipient.is_none() {
                    return Err(CapsuleError::invalid_kind(
                        "dead man's switch capsule missing recipient",
                    ));
                }
                if self.last_activity_at.is_none() {
                    return Err(CapsuleError::internal_invariant(
                        "dead man's switch capsule missing activity record",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Records owner activity on a dead man's switch capsule.
    pub fn touch_activity(&mut self, block_time: u64) {
        if self.kind == CapsuleKind::DeadMansSwitch {
            self.last_activity_at = Some(block_time);
            self.updated_at = block_time;
        }
    }
}

/// One Shamir share held by a custodian, keyed by `(capsule_id, share_index)`.
///
/// Created in the same transaction as its capsule, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyShareRecord {
    pub capsule_id: u64,
    pub share_index: u32,
    pub custodian_id: String,
    /// The share in wire encoding; opaque to everyone but the combiner.
    pub share_bytes: Vec<u8>,
    pub created_at: u64,
}

/// A registered unlock condition, addressable by `condition_ref`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionContract {
    pub address: String,
    pub condition: UnlockCondition,
    pub created_by: String,
    pub created_at: u64,
}

/// Aggregate capsule statistics returned by the stats query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapsuleStats {
    pub total_capsules: u64,
    pub active_capsules: u64,
    pub unlocked_capsules: u64,
    pub expired_capsules: u64,
    pub cancelled_capsules: u64,
    /// Sum of original plaintext sizes across all capsules.
    pub total_bytes_stored: u64,
    pub kind_distribution: BTreeMap<String, u64>,
    pub status_distribution: BTreeMap<String, u64>,
}
