//! Host collaborator interfaces.
//!
//! The engine is embedded in a larger state machine that owns token
//! accounting, blob storage, oracle data and signature verification. Those
//! collaborators are reached exclusively through the traits here, so hosts
//! swap implementations without touching the state machine. Every trait is
//! object-safe and synchronous: collaborator calls happen inside the
//! deterministic transaction path.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::types::error::{CapsuleError, Result};
use crate::types::params::Coin;

/// Token accounting: the engine only debits fees, never holds balances.
pub trait Accounting: Send + Sync {
    /// Debits `amount` from `account` into the module account.
    fn debit(&self, account: &str, amount: &Coin) -> Result<()>;

    /// Pays `amount` out of the module account to `account`.
    fn transfer(&self, account: &str, amount: &Coin) -> Result<()>;
}

/// Metadata attached to an external blob at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetadata {
    pub capsule_id: u64,
    pub content_len: u64,
    pub created_at: u64,
}

/// Content-addressed external blob storage.
///
/// Implementations own their timeout policy (30 s bounded by default); a
/// failed or timed-out call surfaces as `BlobIoError` and is never retried
/// inside the transaction.
pub trait BlobStore: Send + Sync {
    fn put(&self, bytes: &[u8], metadata: &BlobMetadata) -> Result<String>;
    fn get(&self, blob_id: &str) -> Result<Vec<u8>>;
    fn pin(&self, blob_id: &str) -> Result<()>;
    fn unpin(&self, blob_id: &str) -> Result<()>;
}

/// A value read from a named oracle feed; stable within a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OracleValue {
    Int(i64),
    Text(String),
}

/// Read-only oracle access supplied by the host.
pub trait OracleReader: Send + Sync {
    fn read(&self, name: &str) -> Result<OracleValue>;
}

/// Semantic validation of emergency confirmation codes.
///
/// The engine checks the structural shape of a code; everything beyond that
/// is host policy.
pub trait ConfirmationValidator: Send + Sync {
    fn validate(&self, code: &str, capsule_id: u64, owner: &str) -> bool;
}

/// Verifies one signature over a canonical open message.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, signer: &str, message: &[u8], signature: &[u8]) -> bool;
}

/// Deterministic assignment of custodians to share indexes.
pub trait CustodianSelector: Send + Sync {
    fn select(&self, capsule_id: u64, total_shares: u32) -> Vec<String>;
}

/// v1 custodian assignment: synthetic identifiers `custodian-<i>`.
///
/// Real deployments plug in a selector over the validator set; replay only
/// requires that selection be a pure function of block state.
#[derive(Debug, Default, Clone)]
pub struct PlaceholderCustodians;

impl CustodianSelector for PlaceholderCustodians {
    fn select(&self, _capsule_id: u64, total_shares: u32) -> Vec<String> {
        (0..total_shares).map(|i| format!("custodian-{}", i)).collect()
    }
}

/// Accounting double that records every debit; used by hosts without fees
/// and by the test suite.
#[derive(Debug, Default)]
pub struct RecordingAccounting {
    debits: Mutex<Vec<(String, Coin)>>,
}

impl RecordingAccounting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debits(&self) -> Vec<(String, Coin)> {
        self.debits.lock().clone()
    }
}

impl Accounting for RecordingAccounting {
    fn debit(&self, account: &str, amount: &Coin) -> Result<()> {
        self.debits.lock().push((account.to_string(), amount.clone()));
        Ok(())
    }

    fn transfer(&self, _account: &str, _amount: &Coin) -> Result<()> {
        Ok(())
    }
}

/// Fixed-table oracle for hosts that inject values per block.
#[derive(Debug, Default)]
pub struct StaticOracle {
    values: BTreeMap<String, OracleValue>,
}

impl StaticOracle {
    pub fn new(values: BTreeMap<String, OracleValue>) -> Self {
        Self { values }
    }

    pub fn set(&mut self, name: impl Into<String>, value: OracleValue) {
        self.values.insert(name.into(), value);
    }
}

impl OracleReader for StaticOracle {
    fn read(&self, name: &str) -> Result<OracleValue> {
        self.values.get(name).cloned().ok_or_else(|| {
            CapsuleError::blob_io(
                format!("oracle feed {} unavailable", name),
                None::<std::convert::Infallible>,
            )
        })
    }
}

/// MAC-based signature verifier: a signature is valid iff it equals the
/// keyed digest of (signer, message) under a shared secret.
///
/// Stands in for a real scheme during testing without accepting arbitrary
/// bytes the way a pure stub would.
#[derive(Debug, Clone)]
pub struct KeyedSignatureVerifier {
    secret: [u8; 32],
}

impl KeyedSignatureVerifier {
    pub fn new(secret: [u8; 32]) -> Self {
        Self { secret }
    }

    /// Produces the signature `verify` will accept; test-side counterpart.
    pub fn sign(&self, signer: &str, message: &[u8]) -> Vec<u8> {
        let mut hasher = blake3::Hasher::new_keyed(&self.secret);
        hasher.update(signer.as_bytes());
        hasher.update(message);
        hasher.finalize().as_bytes().to_vec()
    }
}

impl SignatureVerifier for KeyedSignatureVerifier {
    fn verify(&self, signer: &str, message: &[u8], signature: &[u8]) -> bool {
        constant_time_eq::constant_time_eq(&self.sign(signer, message), signature)
    }
}

/// Confirmation-code validator keyed by a module secret.
///
/// The expected code is `EMERGENCY_VOID_<id>_<mac>` where `<mac>` is the
/// first 16 hex characters of the keyed digest of (capsule id, owner).
#[derive(Debug, Clone)]
pub struct HmacConfirmationValidator {
    module_secret: [u8; 32],
}

impl HmacConfirmationValidator {
    pub fn new(module_secret: [u8; 32]) -> Self {
        Self { module_secret }
    }

    pub fn expected_code(&self, capsule_id: u64, owner: &str) -> String {
        let mut hasher = blake3::Hasher::new_keyed(&self.module_secret);
        hasher.update(&capsule_id.to_be_bytes());
        hasher.update(owner.as_bytes());
        let mac = hex::encode(&hasher.finalize().as_bytes()[..8]);
        format!("EMERGENCY_VOID_{}_{}", capsule_id, mac)
    }
}

impl ConfirmationValidator for HmacConfirmationValidator {
    fn validate(&self, code: &str, capsule_id: u64, owner: &str) -> bool {
        constant_time_eq::constant_time_eq(
            code.as_bytes(),
            self.expected_code(capsule_id, owner).as_bytes(),
        )
    }
}
