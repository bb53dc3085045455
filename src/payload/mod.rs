//! Hybrid payload storage.
//!
//! Small ciphertexts are stored inline in the capsule record; large ones go
//! to the external content-addressed blob store, with only the blob id and
//! the ciphertext digest kept inline. Both arms carry the AEAD nonce. The
//! read path always verifies the external ciphertext digest before handing
//! bytes to the cipher.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crypto;
use crate::interfaces::{BlobMetadata, BlobStore};
use crate::types::error::{CapsuleError, Result};

/// Where a capsule's ciphertext lives; exactly one arm per capsule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadBinding {
    Inline {
        ciphertext: Vec<u8>,
        nonce: Vec<u8>,
    },
    External {
        blob_id: String,
        ciphertext_digest: [u8; 32],
        nonce: Vec<u8>,
    },
}

impl PayloadBinding {
    pub fn nonce(&self) -> &[u8] {
        match self {
            PayloadBinding::Inline { nonce, .. } => nonce,
            PayloadBinding::External { nonce, .. } => nonce,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, PayloadBinding::Inline { .. })
    }
}

/// Routes ciphertexts between inline storage and the blob store.
pub struct PayloadStore {
    blob_store: Arc<dyn BlobStore>,
}

impl PayloadStore {
    pub fn new(blob_store: Arc<dyn BlobStore>) -> Self {
        Self { blob_store }
    }

    /// Stores a ciphertext, choosing the arm by original plaintext size.
    pub fn store(
        &self,
        ciphertext: Vec<u8>,
        nonce: Vec<u8>,
        plaintext_size: u64,
        inline_threshold: u64,
        metadata: &BlobMetadata,
    ) -> Result<PayloadBinding> {
        if plaintext_size <= inline_threshold {
            debug!(size = plaintext_size, "storing capsule payload inline");
            return Ok(PayloadBinding::Inline { ciphertext, nonce });
        }
        let ciphertext_digest = crypto::hash(&ciphertext);
        let blob_id = self.blob_store.put(&ciphertext, metadata)?;
        self.blob_store.pin(&blob_id)?;
        debug!(size = plaintext_size, %blob_id, "stored capsule payload externally");
        Ok(PayloadBinding::External {
            blob_id,
            ciphertext_digest,
            nonce,
        })
    }

    /// Returns ciphertext bytes for either arm, verifying the external
    /// digest before releasing them.
    pub fn load(&self, binding: &PayloadBinding) -> Result<Vec<u8>> {
        match binding {
            PayloadBinding::Inline { ciphertext, .. } => Ok(ciphertext.clone()),
            PayloadBinding::External {
                blob_id,
                ciphertext_digest,
                ..
            } => {
                let bytes = self.blob_store.get(blob_id)?;
                if !crypto::verify_integrity(&bytes, ciphertext_digest) {
                    return Err(CapsuleError::integrity_violation(format!(
                        "blob {} does not match its recorded ciphertext digest",
                        blob_id
                    )));
                }
                Ok(bytes)
            }
        }
    }
}

/// In-memory content-addressed blob store.
///
/// Blob ids are the hex digest of the content, so replays produce identical
/// identifiers. Serves as the test double and as a reference for real
/// backends.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
    pins: RwLock<BTreeMap<String, u32>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, bytes: &[u8], _metadata: &BlobMetadata) -> Result<String> {
        let blob_id = hex::encode(crypto::hash(bytes));
        self.blobs.write().insert(blob_id.clone(), bytes.to_vec());
        Ok(blob_id)
    }

    fn get(&self, blob_id: &str) -> Result<Vec<u8>> {
        self.blobs.read().get(blob_id).cloned().ok_or_else(|| {
            CapsuleError::blob_io(
                format!("blob {} not found", blob_id),
                None::<std::convert::Infallible>,
            )
        })
    }

    fn pin(&self, blob_id: &str) -> Result<()> {
        *self.pins.write().entry(blob_id.to_string()).or_insert(0) += 1;
        Ok(())
    }

    fn unpin(&self, blob_id: &str) -> Result<()> {
        let mut pins = self.pins.write();
        match pins.get_mut(blob_id) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                pins.remove(blob_id);
            }
            None => {}
        }
        Ok(())
    }
}
