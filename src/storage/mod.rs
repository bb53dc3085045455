//! Transactional, prefix-partitioned ordered key-value state.
//!
//! Every logical collection owns a one-byte prefix tag; keys are encoded
//! with big-endian integers and length-prefixed strings so iteration order
//! is identical across implementations and replays. A transaction sees its
//! own writes, iterates the merged view in lexicographic key order, and
//! either commits atomically or vanishes without trace on drop.
//!
//! The store embeds no business logic; it only knows bytes, prefixes and
//! transactions.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::types::error::{CapsuleError, Result};

pub mod repository;

/// Prefix tags, one per logical collection.
///
/// The gaps in the numbering are deliberate: tags are part of the persisted
/// key encoding and never renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StorePrefix {
    Capsule = 0,
    OwnerIndex = 1,
    KeyShare = 3,
    Counter = 4,
    TransferHistory = 6,
    PendingTransfer = 7,
    TransferStats = 8,
    ConditionContract = 9,
    EmergencyAction = 10,
}

impl StorePrefix {
    pub fn tag(self) -> u8 {
        self as u8
    }
}

fn push_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u16).to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
}

pub fn capsule_key(id: u64) -> Vec<u8> {
    let mut key = vec![StorePrefix::Capsule.tag()];
    key.extend_from_slice(&id.to_be_bytes());
    key
}

pub fn owner_index_key(owner: &str, id: u64) -> Vec<u8> {
    let mut key = vec![StorePrefix::OwnerIndex.tag()];
    push_string(&mut key, owner);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

pub fn owner_index_prefix(owner: &str) -> Vec<u8> {
    let mut key = vec![StorePrefix::OwnerIndex.tag()];
    push_string(&mut key, owner);
    key
}

pub fn key_share_key(capsule_id: u64, share_index: u32) -> Vec<u8> {
    let mut key = vec![StorePrefix::KeyShare.tag()];
    key.extend_from_slice(&capsule_id.to_be_bytes());
    key.extend_from_slice(&share_index.to_be_bytes());
    key
}

pub fn key_share_prefix(capsule_id: u64) -> Vec<u8> {
    let mut key = vec![StorePrefix::KeyShare.tag()];
    key.extend_from_slice(&capsule_id.to_be_bytes());
    key
}

pub fn counter_key() -> Vec<u8> {
    vec![StorePrefix::Counter.tag()]
}

pub fn transfer_history_key(transfer_id: &str) -> Vec<u8> {
    let mut key = vec![StorePrefix::TransferHistory.tag()];
    push_string(&mut key, transfer_id);
    key
}

pub fn pending_transfer_key(transfer_id: &str) -> Vec<u8> {
    let mut key = vec![StorePrefix::PendingTransfer.tag()];
    push_string(&mut key, transfer_id);
    key
}

pub fn transfer_stats_key() -> Vec<u8> {
    vec![StorePrefix::TransferStats.tag()]
}

pub fn condition_contract_key(address: &str) -> Vec<u8> {
    let mut key = vec![StorePrefix::ConditionContract.tag()];
    push_string(&mut key, address);
    key
}

pub fn emergency_action_key(action_id: &str) -> Vec<u8> {
    let mut key = vec![StorePrefix::EmergencyAction.tag()];
    push_string(&mut key, action_id);
    key
}

pub fn prefix_key(prefix: StorePrefix) -> Vec<u8> {
    vec![prefix.tag()]
}

/// The persistent ordered byte map behind all collections.
#[derive(Default)]
pub struct StateStore {
    inner: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a transaction. Dropping it without [`StoreTxn::commit`] rolls
    /// back every buffered write.
    pub fn begin(&self) -> StoreTxn<'_> {
        StoreTxn {
            store: self,
            writes: BTreeMap::new(),
        }
    }

    /// Canonical byte serialization of the full state, for replay
    /// comparison and genesis export. Identical state yields identical
    /// bytes.
    pub fn snapshot_bytes(&self) -> Vec<u8> {
        let inner = self.inner.read();
        bincode::serialize(&*inner).expect("ordered byte map serialization cannot fail")
    }

    pub fn entry_count(&self) -> usize {
        self.inner.read().len()
    }
}

/// A read-your-writes transaction over the state store.
pub struct StoreTxn<'a> {
    store: &'a StateStore,
    /// Buffered writes; `None` marks a deletion.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl StoreTxn<'_> {
    pub fn get_raw(&self, key: &[u8]) -> Option<Vec<u8>> {
        if let Some(buffered) = self.writes.get(key) {
            return buffered.clone();
        }
        self.store.inner.read().get(key).cloned()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.get_raw(key).is_some()
    }

    pub fn set_raw(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    /// Inserts a key that must not already be visible; surfaces
    /// `KeyConflict` otherwise.
    pub fn insert_raw_new(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        if self.contains(&key) {
            return Err(CapsuleError::key_conflict(format!(
                "key {} already present",
                hex::encode(&key)
            )));
        }
        self.writes.insert(key, Some(value));
        Ok(())
    }

    pub fn delete_raw(&mut self, key: Vec<u8>) {
        self.writes.insert(key, None);
    }

    /// All visible entries under `prefix`, in lexicographic key order,
    /// merging the base map with this transaction's buffered writes.
    pub fn iter_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        {
            let inner = self.store.inner.read();
            for (key, value) in inner.range(prefix.to_vec()..) {
                if !key.starts_with(prefix) {
                    break;
                }
                merged.insert(key.clone(), value.clone());
            }
        }
        for (key, value) in &self.writes {
            if !key.starts_with(prefix) {
                continue;
            }
            match value {
                Some(v) => {
                    merged.insert(key.clone(), v.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        merged.into_iter().collect()
    }

    /// Applies all buffered writes atomically.
    pub fn commit(self) {
        let mut inner = self.store.inner.write();
        for (key, value) in self.writes {
            match value {
                Some(v) => {
                    inner.insert(key, v);
                }
                None => {
                    inner.remove(&key);
                }
            }
        }
    }
}
