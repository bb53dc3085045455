#![allow(dead_code)]

//! Shared test host: an engine wired to in-memory collaborators.

use std::sync::Arc;

use chronovault::engine::{CapsuleEngine, EngineConfig};
use chronovault::interfaces::{
    HmacConfirmationValidator, KeyedSignatureVerifier, OracleValue, PlaceholderCustodians,
    RecordingAccounting, StaticOracle,
};
use chronovault::payload::MemoryBlobStore;
use chronovault::types::capsule_types::CapsuleKind;
use chronovault::types::message_types::{CreateCapsule, OpenCapsule, PresentedShare};
use chronovault::types::params::{Coin, EngineParams};

pub struct TestHost {
    pub engine: CapsuleEngine,
    pub accounting: Arc<RecordingAccounting>,
    pub blobs: Arc<MemoryBlobStore>,
    pub verifier: Arc<KeyedSignatureVerifier>,
    pub confirmation: Arc<HmacConfirmationValidator>,
}

pub fn test_params() -> EngineParams {
    EngineParams {
        // tests exercise short inactivity windows
        min_inactivity_secs: 1,
        creation_fee: Coin::new("stake", 100),
        ..Default::default()
    }
}

pub fn host() -> TestHost {
    host_with(test_params(), [7u8; 32])
}

pub fn host_with(params: EngineParams, entropy_seed: [u8; 32]) -> TestHost {
    let accounting = Arc::new(RecordingAccounting::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let verifier = Arc::new(KeyedSignatureVerifier::new([5u8; 32]));
    let confirmation = Arc::new(HmacConfirmationValidator::new([6u8; 32]));

    let mut oracle = StaticOracle::default();
    oracle.set("policy-42", OracleValue::Int(0));

    let engine = CapsuleEngine::new(
        EngineConfig {
            entropy_seed,
            params,
        },
        blobs.clone(),
        accounting.clone(),
        Arc::new(oracle),
        confirmation.clone(),
        verifier.clone(),
        Arc::new(PlaceholderCustodians),
    )
    .unwrap();

    TestHost {
        engine,
        accounting,
        blobs,
        verifier,
        confirmation,
    }
}

/// A minimal create message; tests override the fields they exercise.
pub fn base_create(owner: &str, kind: CapsuleKind) -> CreateCapsule {
    CreateCapsule {
        owner: owner.to_string(),
        recipient: None,
        kind,
        plaintext: b"hello".to_vec(),
        threshold: 2,
        total_shares: 3,
        unlock_time: None,
        condition_ref: None,
        condition: None,
        required_sigs: None,
        authorized_signers: vec![],
        inactivity_period_secs: None,
        grace_period_secs: None,
        expires_at: None,
        title: None,
        description: None,
        tags: vec![],
        metadata: Default::default(),
    }
}

/// Presents the persisted shares of a capsule, as a custodian quorum would.
pub fn shares_for(engine: &CapsuleEngine, capsule_id: u64) -> Vec<PresentedShare> {
    engine
        .list_key_shares(capsule_id)
        .unwrap()
        .into_iter()
        .map(|record| PresentedShare {
            share_index: record.share_index,
            bytes: record.share_bytes,
        })
        .collect()
}

pub fn open_msg(accessor: &str, capsule_id: u64, shares: Vec<PresentedShare>) -> OpenCapsule {
    OpenCapsule {
        accessor: accessor.to_string(),
        capsule_id,
        shares,
        signatures: vec![],
        condition_proof: Default::default(),
    }
}

/// Canonical message a multi-sig opener signs.
pub fn open_message(capsule_id: u64, block_height: u64) -> Vec<u8> {
    let mut msg = Vec::new();
    msg.extend_from_slice(&capsule_id.to_be_bytes());
    msg.extend_from_slice(b"open");
    msg.extend_from_slice(&block_height.to_be_bytes());
    msg
}
