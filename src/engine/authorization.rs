//! Authorization decisions.
//!
//! Pure functions of the record, the requested operation and the accessor.
//! Predicate evaluation is a separate gate: being permitted to attempt an
//! open never implies the unlock condition holds, and owners do not open
//! non-safe capsules merely by owning them.

use crate::types::capsule_types::{Capsule, CapsuleKind};
use crate::types::error::{CapsuleError, Result};
use crate::types::transfer_types::PendingTransfer;

/// May `accessor` attempt to open this capsule?
///
/// `post_void` marks a conditional capsule whose contract was emergency
/// voided; those are openable by the owner alone.
pub fn authorize_open(capsule: &Capsule, accessor: &str, post_void: bool) -> Result<()> {
    if post_void {
        return if capsule.owner == accessor {
            Ok(())
        } else {
            Err(CapsuleError::unauthorized(
                "only the owner may open a voided capsule",
            ))
        };
    }

    let permitted = match capsule.kind {
        CapsuleKind::Safe => capsule.owner == accessor,
        CapsuleKind::TimeLock | CapsuleKind::Conditional => {
            capsule.owner == accessor || capsule.recipient.as_deref() == Some(accessor)
        }
        CapsuleKind::MultiSig => capsule.authorized_signers.iter().any(|s| s == accessor),
        CapsuleKind::DeadMansSwitch => capsule.recipient.as_deref() == Some(accessor),
    };

    if permitted {
        Ok(())
    } else {
        Err(CapsuleError::unauthorized(format!(
            "{} may not open capsule {}",
            accessor, capsule.id
        )))
    }
}

/// Owner-only operations: transfer, cancel, touch-activity, emergency void.
pub fn require_owner(capsule: &Capsule, sender: &str, operation: &str) -> Result<()> {
    if capsule.owner == sender {
        Ok(())
    } else {
        Err(CapsuleError::unauthorized(format!(
            "only the owner may {} capsule {}",
            operation, capsule.id
        )))
    }
}

/// Only the intended recipient resolves a pending transfer.
pub fn require_approver(pending: &PendingTransfer, approver: &str) -> Result<()> {
    if pending.to == approver {
        Ok(())
    } else {
        Err(CapsuleError::unauthorized(format!(
            "only {} may resolve transfer {}",
            pending.to, pending.transfer_id
        )))
    }
}
