//! Domain types, messages, events, parameters and the unified error enum.

pub mod capsule_types;
pub mod error;
pub mod event_types;
pub mod message_types;
pub mod params;
pub mod transfer_types;

pub use capsule_types::{
    validate_address, Capsule, CapsuleKind, CapsuleStats, CapsuleStatus, ConditionContract,
    KeyShareRecord,
};
pub use error::{CapsuleError, ConditionDiagnostic, Result};
pub use event_types::Event;
pub use params::{Coin, EngineParams, MAX_PLAINTEXT_CEILING};
pub use transfer_types::{
    EmergencyAction, EmergencyActionKind, FailedTransfer, PendingTransfer, PendingTransferStatus,
    TransferHistory, TransferKind, TransferStats,
};
