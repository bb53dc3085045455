//! chronovault: a deterministic, transactional time-capsule storage engine.
//!
//! Payloads are AEAD-encrypted under per-capsule keys, the keys are split
//! into threshold shares held by custodians, and release is gated by typed
//! unlock predicates (time locks, inactivity windows, signature quorums,
//! oracle comparisons and boolean composites). The engine is designed to be
//! embedded in a replicated state machine: every mutation is a transaction
//! driven by a typed message, every read is a pure function of persisted
//! state, and identical message streams replay to byte-identical state.

pub mod conditions;
pub mod crypto;
pub mod engine;
pub mod interfaces;
pub mod payload;
pub mod storage;
pub mod types;

// Re-export the main entry points for easier access
pub use engine::queries::{EngineStats, PageRequest};
pub use engine::{BlockContext, CapsuleEngine, EngineConfig};
pub use types::error::{CapsuleError, ConditionDiagnostic, Result};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
