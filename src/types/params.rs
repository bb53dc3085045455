//! Governance-mutable engine parameters.

use serde::{Deserialize, Serialize};

use crate::types::capsule_types::CapsuleKind;
use crate::types::error::{CapsuleError, Result};

/// Absolute ceiling on plaintext size, regardless of parameters.
pub const MAX_PLAINTEXT_CEILING: u64 = 100 * 1024 * 1024;

/// Hard upper bound on shares per capsule the field encoding supports.
pub const ABSOLUTE_MAX_SHARES: u32 = 255;

/// A fee amount in the host's accounting denomination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn zero(denom: impl Into<String>) -> Self {
        Self::new(denom, 0)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

/// Engine parameters with the v1 defaults.
///
/// All values are mutable via governance; the engine reads them at message
/// time, never caches them across transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineParams {
    /// Maximum accepted plaintext size in bytes.
    pub max_plaintext_size: u64,
    /// Maximum lifetime of a capsule in seconds.
    pub max_capsule_duration_secs: u64,
    pub min_threshold: u32,
    pub max_shares: u32,
    pub creation_fee: Coin,
    pub maintenance_fee: Coin,
    pub min_inactivity_secs: u64,
    pub max_inactivity_secs: u64,
    pub allowed_kinds: Vec<CapsuleKind>,
    /// Ciphertexts at or below this size are stored inline.
    pub inline_threshold: u64,
    /// Approval window for pending transfers, in seconds.
    pub pending_approval_window_secs: u64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            max_plaintext_size: 1024 * 1024,
            max_capsule_duration_secs: 365 * 24 * 60 * 60,
            min_threshold: 2,
            max_shares: 10,
            creation_fee: Coin::new("stake", 100_000),
            maintenance_fee: Coin::new("stake", 10_000),
            min_inactivity_secs: 30 * 24 * 60 * 60,
            max_inactivity_secs: 365 * 24 * 60 * 60,
            allowed_kinds: vec![
                CapsuleKind::Safe,
                CapsuleKind::TimeLock,
                CapsuleKind::Conditional,
                CapsuleKind::MultiSig,
                CapsuleKind::DeadMansSwitch,
            ],
            inline_threshold: 1024 * 1024,
            pending_approval_window_secs: 7 * 24 * 60 * 60,
        }
    }
}

impl EngineParams {
    pub fn validate(&self) -> Result<()> {
        if self.max_plaintext_size == 0 {
            return Err(CapsuleError::bad_metadata("max plaintext size cannot be zero"));
        }
        if self.max_plaintext_size > MAX_PLAINTEXT_CEILING {
            return Err(CapsuleError::PayloadTooLarge {
                size: self.max_plaintext_size,
                max: MAX_PLAINTEXT_CEILING,
            });
        }
        if self.min_threshold == 0 {
            return Err(CapsuleError::ThresholdZero);
        }
        if self.max_shares == 0 || self.max_shares > ABSOLUTE_MAX_SHARES {
            return Err(CapsuleError::invalid_threshold(format!(
                "max shares must be in 1..={}",
                ABSOLUTE_MAX_SHARES
            )));
        }
        if self.min_threshold > self.max_shares {
            return Err(CapsuleError::invalid_threshold(
                "minimum threshold exceeds maximum shares",
            ));
        }
        if self.min_inactivity_secs == 0 || self.min_inactivity_secs > self.max_inactivity_secs {
            return Err(CapsuleError::bad_metadata(
                "inactivity bounds must satisfy 0 < min <= max",
            ));
        }
        if self.allowed_kinds.is_empty() {
            return Err(CapsuleError::invalid_kind("no capsule kinds allowed"));
        }
        if self.inline_threshold > self.max_plaintext_size.max(MAX_PLAINTEXT_CEILING) {
            return Err(CapsuleError::bad_metadata("inline threshold out of range"));
        }
        if self.pending_approval_window_secs == 0 {
            return Err(CapsuleError::bad_metadata(
                "pending approval window cannot be zero",
            ));
        }
        Ok(())
    }

    pub fn kind_allowed(&self, kind: CapsuleKind) -> bool {
        self.allowed_kinds.contains(&kind)
    }
}
