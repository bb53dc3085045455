use std::{error::Error, fmt::Display};

use serde::{Deserialize, Serialize};

/// Convenience alias used throughout the crate.
pub type Result<T, E = CapsuleError> = std::result::Result<T, E>;

/// Structured diagnostic attached to `ConditionNotMet` errors.
///
/// Predicates report why they failed in machine-readable form so the host
/// can surface actionable feedback (e.g. time remaining until unlock)
/// without parsing error strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDiagnostic {
    /// Short human-readable reason.
    pub reason: String,
    /// Seconds remaining until a time-based predicate would pass.
    pub remaining_secs: Option<u64>,
    /// Additional valid signatures required by a multi-sig predicate.
    pub missing_signatures: Option<u32>,
}

impl ConditionDiagnostic {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            remaining_secs: None,
            missing_signatures: None,
        }
    }

    pub fn with_remaining(reason: impl Into<String>, remaining_secs: u64) -> Self {
        Self {
            reason: reason.into(),
            remaining_secs: Some(remaining_secs),
            missing_signatures: None,
        }
    }

    pub fn with_missing_signatures(reason: impl Into<String>, missing: u32) -> Self {
        Self {
            reason: reason.into(),
            remaining_secs: None,
            missing_signatures: Some(missing),
        }
    }
}

/// Comprehensive error type for capsule engine operations.
///
/// A single enumeration covers every failure the engine can surface so that
/// propagation stays uniform across modules. Each variant carries a stable
/// machine-readable code (see [`CapsuleError::code`]); hosts key on codes,
/// not on display strings.
#[derive(Debug)]
pub enum CapsuleError {
    /// An account identifier failed well-formedness validation.
    InvalidAddress { address: String },

    /// The capsule kind is unknown or not allowed by parameters.
    InvalidKind { context: String },

    /// Threshold/share-count parameters are out of range.
    InvalidThreshold { context: String },

    /// A time-lock parameter is structurally invalid (e.g. not in the future).
    InvalidTimelock { context: String },

    /// Plaintext exceeds the configured or hard size limit.
    PayloadTooLarge { size: u64, max: u64 },

    /// Free-form metadata failed validation.
    BadMetadata { context: String },

    /// Secret-sharing threshold of zero.
    ThresholdZero,

    /// Secret-sharing threshold exceeds the share count.
    ThresholdTooLarge { threshold: u32, total: u32 },

    /// Secret exceeds the 32-byte sharing capacity.
    SecretTooLarge { len: usize },

    /// Two presented shares carry the same x coordinate.
    DuplicateShareX { x: String },

    /// A share coordinate is zero or not a canonical field element.
    ShareOutOfField { context: String },

    /// Capsule lookup failed.
    CapsuleNotFound { id: u64 },

    /// Share record lookup failed.
    ShareNotFound { capsule_id: u64, index: u32 },

    /// Pending transfer or history lookup failed.
    TransferNotFound { transfer_id: String },

    /// Condition contract lookup failed.
    ConditionContractNotFound { address: String },

    /// The accessor is not permitted to perform the operation.
    Unauthorized { context: String },

    /// The record is in a terminal status and admits no further transitions.
    AlreadyTerminal { status: String },

    /// The operation does not apply to this capsule kind.
    WrongKind { context: String },

    /// The pending transfer's approval window has elapsed.
    PendingTransferExpired { transfer_id: String },

    /// The unlock predicate evaluated to false.
    ConditionNotMet { diagnostic: ConditionDiagnostic },

    /// Fewer than threshold-many usable shares were presented.
    InsufficientShares { needed: u32, got: u32 },

    /// A presented share is malformed or references the wrong capsule.
    InvalidShare { context: String },

    /// AEAD authentication failed during decryption.
    DecryptionFailure,

    /// A stored digest did not match recomputed data.
    IntegrityViolation { context: String },

    /// External blob store I/O failed.
    BlobIo {
        context: String,
        source: Option<Box<dyn Error + Send + Sync>>,
    },

    /// The accounting collaborator refused the fee debit.
    FeeDebitFailed { context: String },

    /// A unique repository key was inserted twice.
    KeyConflict { context: String },

    /// Encoding or decoding of a persisted value failed.
    Serialization {
        context: String,
        source: Option<Box<dyn Error + Send + Sync>>,
    },

    /// Underlying store failure.
    Storage {
        context: String,
        source: Option<Box<dyn Error + Send + Sync>>,
    },

    /// Corrupted state detected; unrecoverable, aborts the block.
    InternalInvariant { context: String },
}

impl CapsuleError {
    pub fn invalid_address(address: impl Into<String>) -> Self {
        CapsuleError::InvalidAddress {
            address: address.into(),
        }
    }

    pub fn invalid_kind(context: impl Into<String>) -> Self {
        CapsuleError::InvalidKind {
            context: context.into(),
        }
    }

    pub fn invalid_threshold(context: impl Into<String>) -> Self {
        CapsuleError::InvalidThreshold {
            context: context.into(),
        }
    }

    pub fn invalid_timelock(context: impl Into<String>) -> Self {
        CapsuleError::InvalidTimelock {
            context: context.into(),
        }
    }

    pub fn bad_metadata(context: impl Into<String>) -> Self {
        CapsuleError::BadMetadata {
            context: context.into(),
        }
    }

    pub fn unauthorized(context: impl Into<String>) -> Self {
        CapsuleError::Unauthorized {
            context: context.into(),
        }
    }

    pub fn already_terminal(status: impl std::fmt::Display) -> Self {
        CapsuleError::AlreadyTerminal {
            status: status.to_string(),
        }
    }

    pub fn wrong_kind(context: impl Into<String>) -> Self {
        CapsuleError::WrongKind {
            context: context.into(),
        }
    }

    pub fn condition_not_met(diagnostic: ConditionDiagnostic) -> Self {
        CapsuleError::ConditionNotMet { diagnostic }
    }

    pub fn invalid_share(context: impl Into<String>) -> Self {
        CapsuleError::InvalidShare {
            context: context.into(),
        }
    }

    pub fn share_out_of_field(context: impl Into<String>) -> Self {
        CapsuleError::ShareOutOfField {
            context: context.into(),
        }
    }

    pub fn integrity_violation(context: impl Into<String>) -> Self {
        CapsuleError::IntegrityViolation {
            context: context.into(),
        }
    }

    pub fn blob_io<E>(context: impl Into<String>, source: Option<E>) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        CapsuleError::BlobIo {
            context: context.into(),
            source: source.map(|e| Box::new(e) as Box<dyn Error + Send + Sync>),
        }
    }

    pub fn fee_debit_failed(context: impl Into<String>) -> Self {
        CapsuleError::FeeDebitFailed {
            context: context.into(),
        }
    }

    pub fn key_conflict(context: impl Into<String>) -> Self {
        CapsuleError::KeyConflict {
            context: context.into(),
        }
    }

    pub fn serialization<E>(context: impl Into<String>, source: Option<E>) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        CapsuleError::Serialization {
            context: context.into(),
            source: source.map(|e| Box::new(e) as Box<dyn Error + Send + Sync>),
        }
    }

    pub fn storage<E>(context: impl Into<String>, source: Option<E>) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        CapsuleError::Storage {
            context: context.into(),
            source: source.map(|e| Box::new(e) as Box<dyn Error + Send + Sync>),
        }
    }

    pub fn internal_invariant(context: impl Into<String>) -> Self {
        CapsuleError::InternalInvariant {
            context: context.into(),
        }
    }

    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            CapsuleError::InvalidAddress { .. } => "invalid_address",
            CapsuleError::InvalidKind { .. } => "invalid_kind",
            CapsuleError::InvalidThreshold { .. } => "invalid_threshold",
            CapsuleError::InvalidTimelock { .. } => "invalid_timelock",
            CapsuleError::PayloadTooLarge { .. } => "payload_too_large",
            CapsuleError::BadMetadata { .. } => "bad_metadata",
            CapsuleError::ThresholdZero => "threshold_zero",
            CapsuleError::ThresholdTooLarge { .. } => "threshold_too_large",
            CapsuleError::SecretTooLarge { .. } => "secret_too_large",
            CapsuleError::DuplicateShareX { .. } => "duplicate_share_x",
            CapsuleError::ShareOutOfField { .. } => "share_out_of_field",
            CapsuleError::CapsuleNotFound { .. } => "capsule_not_found",
            CapsuleError::ShareNotFound { .. } => "share_not_found",
            CapsuleError::TransferNotFound { .. } => "transfer_not_found",
            CapsuleError::ConditionContractNotFound { .. } => "condition_contract_not_found",
            CapsuleError::Unauthorized { .. } => "unauthorized",
            CapsuleError::AlreadyTerminal { .. } => "already_terminal",
            CapsuleError::WrongKind { .. } => "wrong_kind",
            CapsuleError::PendingTransferExpired { .. } => "pending_transfer_expired",
            CapsuleError::ConditionNotMet { .. } => "condition_not_met",
            CapsuleError::InsufficientShares { .. } => "insufficient_shares",
            CapsuleError::InvalidShare { .. } => "invalid_share",
            CapsuleError::DecryptionFailure => "decryption_failure",
            CapsuleError::IntegrityViolation { .. } => "integrity_violation",
            CapsuleError::BlobIo { .. } => "blob_io_error",
            CapsuleError::FeeDebitFailed { .. } => "fee_debit_failed",
            CapsuleError::KeyConflict { .. } => "key_conflict",
            CapsuleError::Serialization { .. } => "serialization",
            CapsuleError::Storage { .. } => "storage",
            CapsuleError::InternalInvariant { .. } => "internal_invariant",
        }
    }

    /// True when the error indicates corrupted state and must abort the block.
    pub fn aborts_block(&self) -> bool {
        matches!(self, CapsuleError::InternalInvariant { .. })
    }
}

impl Display for CapsuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapsuleError::InvalidAddress { address } => {
                write!(f, "invalid address: {}", address)
            }
            CapsuleError::InvalidKind { context } => write!(f, "invalid capsule kind: {}", context),
            CapsuleError::InvalidThreshold { context } => {
                write!(f, "invalid threshold: {}", context)
            }
            CapsuleError::InvalidTimelock { context } => write!(f, "invalid timelock: {}", context),
            CapsuleError::PayloadTooLarge { size, max } => {
                write!(f, "payload of {} bytes exceeds maximum {}", size, max)
            }
            CapsuleError::BadMetadata { context } => write!(f, "invalid metadata: {}", context),
            CapsuleError::ThresholdZero => write!(f, "threshold must be at least 1"),
            CapsuleError::ThresholdTooLarge { threshold, total } => write!(
                f,
                "threshold {} cannot exceed total shares {}",
                threshold, total
            ),
            CapsuleError::SecretTooLarge { len } => {
                write!(f, "secret of {} bytes exceeds the 32-byte field capacity", len)
            }
            CapsuleError::DuplicateShareX { x } => {
                write!(f, "duplicate share x coordinate: {}", x)
            }
            CapsuleError::ShareOutOfField { context } => {
                write!(f, "share coordinate outside the field: {}", context)
            }
            CapsuleError::CapsuleNotFound { id } => write!(f, "capsule {} not found", id),
            CapsuleError::ShareNotFound { capsule_id, index } => {
                write!(f, "share {} of capsule {} not found", index, capsule_id)
            }
            CapsuleError::TransferNotFound { transfer_id } => {
                write!(f, "transfer {} not found", transfer_id)
            }
            CapsuleError::ConditionContractNotFound { address } => {
                write!(f, "condition contract {} not found", address)
            }
            CapsuleError::Unauthorized { context } => write!(f, "unauthorized: {}", context),
            CapsuleError::AlreadyTerminal { status } => {
                write!(f, "record is terminal with status {}", status)
            }
            CapsuleError::WrongKind { context } => {
                write!(f, "operation not valid for this capsule kind: {}", context)
            }
            CapsuleError::PendingTransferExpired { transfer_id } => {
                write!(f, "pending transfer {} has expired", transfer_id)
            }
            CapsuleError::ConditionNotMet { diagnostic } => {
                write!(f, "unlock condition not met: {}", diagnostic.reason)?;
                if let Some(secs) = diagnostic.remaining_secs {
                    write!(f, " ({} seconds remaining)", secs)?;
                }
                if let Some(missing) = diagnostic.missing_signatures {
                    write!(f, " ({} more signatures required)", missing)?;
                }
                Ok(())
            }
            CapsuleError::InsufficientShares { needed, got } => {
                write!(f, "need {} shares, got {}", needed, got)
            }
            CapsuleError::InvalidShare { context } => write!(f, "invalid share: {}", context),
            CapsuleError::DecryptionFailure => write!(f, "decryption failed"),
            CapsuleError::IntegrityViolation { context } => {
                write!(f, "integrity violation: {}", context)
            }
            CapsuleError::BlobIo { context, source } => {
                write!(f, "blob store error: {}", context)?;
                if let Some(s) = source {
                    write!(f, " - caused by: {}", s)?;
                }
                Ok(())
            }
            CapsuleError::FeeDebitFailed { context } => {
                write!(f, "fee debit failed: {}", context)
            }
            CapsuleError::KeyConflict { context } => {
                write!(f, "repository key conflict: {}", context)
            }
            CapsuleError::Serialization { context, source } => {
                write!(f, "serialization error: {}", context)?;
                if let Some(s) = source {
                    write!(f, " - caused by: {}", s)?;
                }
                Ok(())
            }
            CapsuleError::Storage { context, source } => {
                write!(f, "storage error: {}", context)?;
                if let Some(s) = source {
                    write!(f, " - caused by: {}", s)?;
                }
                Ok(())
            }
            CapsuleError::InternalInvariant { context } => {
                write!(f, "internal invariant violated: {}", context)
            }
        }
    }
}

impl Error for CapsuleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CapsuleError::BlobIo { source, .. }
            | CapsuleError::Serialization { source, .. }
            | CapsuleError::Storage { source, .. } => {
                source.as_ref().map(|s| s.as_ref() as &(dyn Error))
            }
            _ => None,
        }
    }
}

impl From<bincode::Error> for CapsuleError {
    fn from(error: bincode::Error) -> Self {
        CapsuleError::serialization("bincode codec failure", Some(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(CapsuleError::DecryptionFailure.code(), "decryption_failure");
        assert_eq!(
            CapsuleError::invalid_address("not-an-address").code(),
            "invalid_address"
        );
        assert_eq!(
            CapsuleError::PayloadTooLarge { size: 2, max: 1 }.code(),
            "payload_too_large"
        );
    }

    #[test]
    fn only_invariant_errors_abort_the_block() {
        assert!(CapsuleError::internal_invariant("broken index").aborts_block());
        assert!(!CapsuleError::DecryptionFailure.aborts_block());
        assert!(!CapsuleError::CapsuleNotFound { id: 9 }.aborts_block());
    }

    #[test]
    fn condition_diagnostic_renders_remaining_time() {
        let err = CapsuleError::condition_not_met(ConditionDiagnostic::with_remaining(
            "capsule unlocks later",
            30,
        ));
        let rendered = err.to_string();
        assert!(rendered.contains("30 seconds remaining"));
    }
}
