//! State audit: verifies the cross-collection invariants the engine is
//! supposed to preserve after every committed transaction.
//!
//! Hosts run this at upgrade boundaries or in test harnesses; a failure
//! means corrupted state and surfaces as `InternalInvariant`, which aborts
//! the block.

use crate::engine::CapsuleEngine;
use crate::storage::{prefix_key, StorePrefix};
use crate::types::error::{CapsuleError, Result};

impl CapsuleEngine {
    /// Walks the full state and checks every structural invariant:
    /// per-capsule validity, exact share-record counts, and owner-index
    /// consistency in both directions.
    pub fn audit_invariants(&self) -> Result<()> {
        let txn = self.store().begin();

        let capsules = txn.capsules_in_id_order()?;
        for capsule in &capsules {
            capsule.validate().map_err(|e| {
                CapsuleError::internal_invariant(format!(
                    "capsule {} fails validation: {}",
                    capsule.id, e
                ))
            })?;

            let shares = txn.key_shares_for_capsule(capsule.id)?;
            if shares.len() != capsule.total_shares as usize {
                return Err(CapsuleError::internal_invariant(format!(
                    "capsule {}: {} share records, expected {}",
                    capsule.id,
                    shares.len(),
                    capsule.total_shares
                )));
            }
            for (i, share) in shares.iter().enumerate() {
                if share.share_index != i as u32 || share.capsule_id != capsule.id {
                    return Err(CapsuleError::internal_invariant(format!(
                        "capsule {}: share record {} mis-keyed",
                        capsule.id, i
                    )));
                }
            }

            if !txn.owner_index_contains(&capsule.owner, capsule.id) {
                return Err(CapsuleError::internal_invariant(format!(
                    "capsule {} missing from the owner index of {}",
                    capsule.id, capsule.owner
                )));
            }
        }

        // reverse direction: every index entry points at a live capsule
        // with the matching owner
        for (key, _) in txn.iter_prefix(&prefix_key(StorePrefix::OwnerIndex)) {
            let (owner, id) = decode_owner_index_key(&key)?;
            let capsule = txn.try_get_capsule(id)?.ok_or_else(|| {
                CapsuleError::internal_invariant(format!(
                    "owner index of {} references missing capsule {}",
                    owner, id
                ))
            })?;
            if capsule.owner != owner {
                return Err(CapsuleError::internal_invariant(format!(
                    "capsule {} indexed under {} but owned by {}",
                    id, owner, capsule.owner
                )));
            }
        }

        Ok(())
    }
}

fn decode_owner_index_key(key: &[u8]) -> Result<(String, u64)> {
    let malformed = || CapsuleError::internal_invariant("malformed owner index key");
    if key.len() < 3 {
        return Err(malformed());
    }
    let len = u16::from_be_bytes([key[1], key[2]]) as usize;
    if key.len() != 3 + len + 8 {
        return Err(malformed());
    }
    let owner = std::str::from_utf8(&key[3..3 + len])
        .map_err(|_| malformed())?
        .to_string();
    let mut be = [0u8; 8];
    be.copy_from_slice(&key[3 + len..]);
    Ok((owner, u64::from_be_bytes(be)))
}
