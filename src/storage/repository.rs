//! Typed collection accessors over a store transaction.
//!
//! Values are bincode-encoded; keys come from the encoders in the parent
//! module. These methods stay mechanical: lookups, ordered walks and the
//! counter. Anything resembling a business rule belongs in the engine.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::storage::{
    capsule_key, condition_contract_key, counter_key, emergency_action_key, key_share_key,
    key_share_prefix, owner_index_key, owner_index_prefix, pending_transfer_key, prefix_key,
    transfer_history_key, transfer_stats_key, StorePrefix, StoreTxn,
};
use crate::types::capsule_types::{Capsule, ConditionContract, KeyShareRecord};
use crate::types::error::{CapsuleError, Result};
use crate::types::transfer_types::{
    EmergencyAction, PendingTransfer, TransferHistory, TransferStats,
};

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

impl StoreTxn<'_> {
    // counter

    /// Next id the counter will hand out, without consuming it.
    pub fn peek_next_capsule_id(&self) -> Result<u64> {
        match self.get_raw(&counter_key()) {
            Some(bytes) => decode(&bytes),
            None => Ok(1),
        }
    }

    /// Consumes and returns the next capsule id.
    pub fn next_capsule_id(&mut self) -> Result<u64> {
        let id = self.peek_next_capsule_id()?;
        self.set_raw(counter_key(), encode(&(id + 1))?);
        Ok(id)
    }

    // capsules

    pub fn try_get_capsule(&self, id: u64) -> Result<Option<Capsule>> {
        match self.get_raw(&capsule_key(id)) {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get_capsule(&self, id: u64) -> Result<Capsule> {
        self.try_get_capsule(id)?
            .ok_or(CapsuleError::CapsuleNotFound { id })
    }

    pub fn put_capsule(&mut self, capsule: &Capsule) -> Result<()> {
        self.set_raw(capsule_key(capsule.id), encode(capsule)?);
        Ok(())
    }

    pub fn insert_capsule_new(&mut self, capsule: &Capsule) -> Result<()> {
        self.insert_raw_new(capsule_key(capsule.id), encode(capsule)?)
    }

    /// All capsules, ascending by id.
    pub fn capsules_in_id_order(&self) -> Result<Vec<Capsule>> {
        self.iter_prefix(&prefix_key(StorePrefix::Capsule))
            .iter()
            .map(|(_, v)| decode(v))
            .collect()
    }

    // owner index

    pub fn index_owner(&mut self, owner: &str, id: u64) {
        self.set_raw(owner_index_key(owner, id), Vec::new());
    }

    pub fn unindex_owner(&mut self, owner: &str, id: u64) {
        self.delete_raw(owner_index_key(owner, id));
    }

    pub fn owner_index_contains(&self, owner: &str, id: u64) -> bool {
        self.contains(&owner_index_key(owner, id))
    }

    /// Capsule ids indexed under `owner`, ascending.
    pub fn capsule_ids_by_owner(&self, owner: &str) -> Vec<u64> {
        let prefix = owner_index_prefix(owner);
        self.iter_prefix(&prefix)
            .iter()
            .filter_map(|(key, _)| {
                let tail = &key[prefix.len()..];
                if tail.len() != 8 {
                    return None;
                }
                let mut be = [0u8; 8];
                be.copy_from_slice(tail);
                Some(u64::from_be_bytes(be))
            })
            .collect()
    }

    // key shares

    pub fn insert_key_share_new(&mut self, share: &KeyShareRecord) -> Result<()> {
        self.insert_raw_new(
            key_share_key(share.capsule_id, share.share_index),
            encode(share)?,
        )
    }

    pub fn get_key_share(&self, capsule_id: u64, index: u32) -> Result<KeyShareRecord> {
        match self.get_raw(&key_share_key(capsule_id, index)) {
            Some(bytes) => decode(&bytes),
            None => Err(CapsuleError::ShareNotFound { capsule_id, index }),
        }
    }

    /// Share records of one capsule, ascending by share index.
    pub fn key_shares_for_capsule(&self, capsule_id: u64) -> Result<Vec<KeyShareRecord>> {
        self.iter_prefix(&key_share_prefix(capsule_id))
            .iter()
            .map(|(_, v)| decode(v))
            .collect()
    }

    // condition contracts

    pub fn get_condition_contract(&self, address: &str) -> Result<ConditionContract> {
        match self.get_raw(&condition_contract_key(address)) {
            Some(bytes) => decode(&bytes),
            None => Err(CapsuleError::ConditionContractNotFound {
                address: address.to_string(),
            }),
        }
    }

    pub fn put_condition_contract(&mut self, contract: &ConditionContract) -> Result<()> {
        self.set_raw(
            condition_contract_key(&contract.address),
            encode(contract)?,
        );
        Ok(())
    }

    pub fn condition_contracts(&self) -> Result<Vec<ConditionContract>> {
        self.iter_prefix(&prefix_key(StorePrefix::ConditionContract))
            .iter()
            .map(|(_, v)| decode(v))
            .collect()
    }

    // transfer history

    pub fn insert_transfer_history_new(&mut self, entry: &TransferHistory) -> Result<()> {
        self.insert_raw_new(transfer_history_key(&entry.transfer_id), encode(entry)?)
    }

    pub fn transfer_history_entries(&self) -> Result<Vec<TransferHistory>> {
        self.iter_prefix(&prefix_key(StorePrefix::TransferHistory))
            .iter()
            .map(|(_, v)| decode(v))
            .collect()
    }

    // pending transfers

    pub fn get_pending_transfer(&self, transfer_id: &str) -> Result<PendingTransfer> {
        match self.get_raw(&pending_transfer_key(transfer_id)) {
            Some(bytes) => decode(&bytes),
            None => Err(CapsuleError::TransferNotFound {
                transfer_id: transfer_id.to_string(),
            }),
        }
    }

    pub fn put_pending_transfer(&mut self, transfer: &PendingTransfer) -> Result<()> {
        self.set_raw(
            pending_transfer_key(&transfer.transfer_id),
            encode(transfer)?,
        );
        Ok(())
    }

    pub fn insert_pending_transfer_new(&mut self, transfer: &PendingTransfer) -> Result<()> {
        self.insert_raw_new(
            pending_transfer_key(&transfer.transfer_id),
            encode(transfer)?,
        )
    }

    pub fn pending_transfers(&self) -> Result<Vec<PendingTransfer>> {
        self.iter_prefix(&prefix_key(StorePrefix::PendingTransfer))
            .iter()
            .map(|(_, v)| decode(v))
            .collect()
    }

    // transfer stats singleton

    pub fn get_transfer_stats(&self) -> Result<TransferStats> {
        match self.get_raw(&transfer_stats_key()) {
            Some(bytes) => decode(&bytes),
            None => Ok(TransferStats::default()),
        }
    }

    pub fn put_transfer_stats(&mut self, stats: &TransferStats) -> Result<()> {
        self.set_raw(transfer_stats_key(), encode(stats)?);
        Ok(())
    }

    // emergency actions

    pub fn insert_emergency_action_new(&mut self, action: &EmergencyAction) -> Result<()> {
        self.insert_raw_new(emergency_action_key(&action.action_id), encode(action)?)
    }

    pub fn emergency_actions(&self) -> Result<Vec<EmergencyAction>> {
        self.iter_prefix(&prefix_key(StorePrefix::EmergencyAction))
            .iter()
            .map(|(_, v)| decode(v))
            .collect()
    }
}
