//! Read-only query surface.
//!
//! Queries run on a consistent snapshot (a read-only transaction) and never
//! mutate state or emit events.

use serde::{Deserialize, Serialize};

use crate::engine::CapsuleEngine;
use crate::types::capsule_types::{
    Capsule, CapsuleKind, CapsuleStats, CapsuleStatus, ConditionContract, KeyShareRecord,
};
use crate::types::error::Result;
use crate::types::params::EngineParams;
use crate::types::transfer_types::{
    EmergencyAction, PendingTransfer, TransferHistory, TransferStats,
};

/// Offset/limit pagination for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 100,
        }
    }
}

/// Combined statistics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub capsules: CapsuleStats,
    pub transfers: TransferStats,
}

impl CapsuleEngine {
    pub fn get_params(&self) -> EngineParams {
        self.params_snapshot()
    }

    pub fn get_capsule(&self, id: u64) -> Result<Capsule> {
        self.store().begin().get_capsule(id)
    }

    pub fn list_capsules(&self, page: PageRequest) -> Result<Vec<Capsule>> {
        let all = self.store().begin().capsules_in_id_order()?;
        Ok(paginate(all, page))
    }

    pub fn list_capsules_by_owner(&self, owner: &str, page: PageRequest) -> Result<Vec<Capsule>> {
        let txn = self.store().begin();
        let mut capsules = Vec::new();
        for id in txn.capsule_ids_by_owner(owner) {
            capsules.push(txn.get_capsule(id)?);
        }
        Ok(paginate(capsules, page))
    }

    pub fn list_capsules_by_kind(&self, kind: CapsuleKind) -> Result<Vec<Capsule>> {
        Ok(self
            .store()
            .begin()
            .capsules_in_id_order()?
            .into_iter()
            .filter(|c| c.kind == kind)
            .collect())
    }

    pub fn list_capsules_by_status(&self, status: CapsuleStatus) -> Result<Vec<Capsule>> {
        Ok(self
            .store()
            .begin()
            .capsules_in_id_order()?
            .into_iter()
            .filter(|c| c.status == status)
            .collect())
    }

    /// Aggregate statistics over every capsule plus the transfer counters.
    pub fn stats(&self) -> Result<EngineStats> {
        let txn = self.store().begin();
        let mut capsules = CapsuleStats::default();
        for capsule in txn.capsules_in_id_order()? {
            capsules.total_capsules += 1;
            capsules.total_bytes_stored += capsule.plaintext_size;
            *capsules
                .kind_distribution
                .entry(capsule.kind.as_str().to_string())
                .or_insert(0) += 1;
            *capsules
                .status_distribution
                .entry(capsule.status.as_str().to_string())
                .or_insert(0) += 1;
            match capsule.status {
                CapsuleStatus::Active => capsules.active_capsules += 1,
                CapsuleStatus::Unlocked => capsules.unlocked_capsules += 1,
                CapsuleStatus::Expired => capsules.expired_capsules += 1,
                CapsuleStatus::Cancelled => capsules.cancelled_capsules += 1,
            }
        }
        Ok(EngineStats {
            capsules,
            transfers: txn.get_transfer_stats()?,
        })
    }

    pub fn list_key_shares(&self, capsule_id: u64) -> Result<Vec<KeyShareRecord>> {
        self.store().begin().key_shares_for_capsule(capsule_id)
    }

    pub fn get_condition_contract(&self, address: &str) -> Result<ConditionContract> {
        self.store().begin().get_condition_contract(address)
    }

    pub fn list_condition_contracts(&self) -> Result<Vec<ConditionContract>> {
        self.store().begin().condition_contracts()
    }

    pub fn get_pending_transfer(&self, transfer_id: &str) -> Result<PendingTransfer> {
        self.store().begin().get_pending_transfer(transfer_id)
    }

    pub fn list_transfer_history(&self) -> Result<Vec<TransferHistory>> {
        self.store().begin().transfer_history_entries()
    }

    pub fn list_emergency_actions(&self) -> Result<Vec<EmergencyAction>> {
        self.store().begin().emergency_actions()
    }
}

fn paginate(capsules: Vec<Capsule>, page: PageRequest) -> Vec<Capsule> {
    capsules
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}
