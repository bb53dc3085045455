//! The capsule state machine.
//!
//! `CapsuleEngine` drives every lifecycle transition: creation, opening,
//! transfers, cancellation, activity touches, emergency voids and the
//! per-block tick. Each incoming message runs inside one repository
//! transaction; the transaction commits iff the handler succeeds, and every
//! event queued along the way reaches the engine log only on commit.
//!
//! The engine is single-threaded cooperative: the host orders messages and
//! calls handlers to completion, one at a time. All randomness is derived
//! from the configured entropy seed so that replaying an identical message
//! stream with identical block times reproduces byte-identical state.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::interfaces::{
    Accounting, BlobStore, ConfirmationValidator, CustodianSelector, OracleReader,
    SignatureVerifier,
};
use crate::payload::PayloadStore;
use crate::storage::StateStore;
use crate::types::error::Result;
use crate::types::event_types::Event;
use crate::types::params::EngineParams;

pub mod authorization;
pub mod invariants;
pub mod lifecycle;
pub mod queries;
pub mod tick;
pub mod transfer;

/// The ambient block context the host supplies with every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockContext {
    /// Block time in seconds; all predicates read this, never wall clock.
    pub time: u64,
    pub height: u64,
}

impl BlockContext {
    pub fn new(time: u64, height: u64) -> Self {
        Self { time, height }
    }
}

/// Static engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Seed for all derived per-capsule randomness. Part of configuration,
    /// never persisted; replicas must share it to replay identically.
    pub entropy_seed: [u8; 32],
    pub params: EngineParams,
}

/// The transactional capsule state machine.
pub struct CapsuleEngine {
    store: StateStore,
    params: RwLock<EngineParams>,
    payload_store: PayloadStore,
    accounting: Arc<dyn Accounting>,
    oracle: Arc<dyn OracleReader>,
    confirmation: Arc<dyn ConfirmationValidator>,
    signature_verifier: Arc<dyn SignatureVerifier>,
    custodians: Arc<dyn CustodianSelector>,
    entropy_seed: [u8; 32],
    event_log: Mutex<Vec<Event>>,
}

impl CapsuleEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: EngineConfig,
        blob_store: Arc<dyn BlobStore>,
        accounting: Arc<dyn Accounting>,
        oracle: Arc<dyn OracleReader>,
        confirmation: Arc<dyn ConfirmationValidator>,
        signature_verifier: Arc<dyn SignatureVerifier>,
        custodians: Arc<dyn CustodianSelector>,
    ) -> Result<Self> {
        config.params.validate()?;
        Ok(Self {
            store: StateStore::new(),
            params: RwLock::new(config.params),
            payload_store: PayloadStore::new(blob_store),
            accounting,
            oracle,
            confirmation,
            signature_verifier,
            custodians,
            entropy_seed: config.entropy_seed,
            event_log: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn store(&self) -> &StateStore {
        &self.store
    }

    pub(crate) fn params_snapshot(&self) -> EngineParams {
        self.params.read().clone()
    }

    pub(crate) fn payload_store(&self) -> &PayloadStore {
        &self.payload_store
    }

    pub(crate) fn accounting(&self) -> &dyn Accounting {
        self.accounting.as_ref()
    }

    pub(crate) fn oracle(&self) -> &dyn OracleReader {
        self.oracle.as_ref()
    }

    pub(crate) fn confirmation(&self) -> &dyn ConfirmationValidator {
        self.confirmation.as_ref()
    }

    pub(crate) fn signature_verifier(&self) -> &dyn SignatureVerifier {
        self.signature_verifier.as_ref()
    }

    pub(crate) fn custodians(&self) -> &dyn CustodianSelector {
        self.custodians.as_ref()
    }

    pub(crate) fn entropy_seed(&self) -> &[u8; 32] {
        &self.entropy_seed
    }

    /// Appends events from a committed transaction to the engine log.
    pub(crate) fn record_events(&self, events: Vec<Event>) {
        self.event_log.lock().extend(events);
    }

    /// Every event emitted by committed transactions, in order.
    pub fn event_log(&self) -> Vec<Event> {
        self.event_log.lock().clone()
    }

    /// Canonical byte serialization of the full repository state.
    pub fn snapshot_bytes(&self) -> Vec<u8> {
        self.store.snapshot_bytes()
    }

    /// Replaces the engine parameters (governance path).
    pub fn set_params(&self, params: EngineParams) -> Result<()> {
        params.validate()?;
        *self.params.write() = params;
        Ok(())
    }
}
