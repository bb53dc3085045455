//! Cryptographic primitives: AEAD payload encryption, integrity hashing,
//! key zeroization and entropy derivation.
//!
//! The payload AEAD is AES-256-GCM with 12-byte nonces; every ciphertext
//! carries a version tag for forward compatibility. Digests are 256-bit
//! blake3. Key material lives in [`SecretKey`], which overwrites itself on
//! every exit path, including panics.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::types::error::{CapsuleError, Result};

pub mod field;
pub mod shamir;

/// Symmetric key length in bytes.
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Version tag stored alongside every ciphertext.
pub const CIPHERTEXT_VERSION: u8 = 1;

/// Identifier of the authenticated-encryption scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AeadAlgorithm {
    Aes256Gcm,
}

impl AeadAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            AeadAlgorithm::Aes256Gcm => "aes-256-gcm",
        }
    }
}

/// A 32-byte symmetric key, zeroized on drop.
///
/// Keys are never logged, serialized or persisted; the only durable trace
/// of a key is its threshold shares.
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        SecretKey(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl Zeroize for SecretKey {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// Ciphertext with the metadata required to decrypt it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub algorithm: AeadAlgorithm,
    pub version: u8,
}

/// Generates a fresh key from the supplied randomness source.
pub fn generate_key(rng: &mut (impl RngCore + CryptoRng)) -> SecretKey {
    let mut bytes = [0u8; KEY_LEN];
    rng.fill_bytes(&mut bytes);
    SecretKey(bytes)
}

/// Generates a fresh key from the operating system's entropy source,
/// refusing rather than degrading when it is unavailable.
pub fn generate_key_os() -> Result<SecretKey> {
    let mut bytes = [0u8; KEY_LEN];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|_| CapsuleError::internal_invariant("system randomness unavailable"))?;
    Ok(SecretKey(bytes))
}

/// Encrypts `plaintext` under `key` with a fresh nonce drawn from `rng`.
pub fn encrypt(
    plaintext: &[u8],
    key: &SecretKey,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<EncryptedPayload> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CapsuleError::internal_invariant("aead seal failed"))?;
    Ok(EncryptedPayload {
        ciphertext,
        nonce: nonce.to_vec(),
        algorithm: AeadAlgorithm::Aes256Gcm,
        version: CIPHERTEXT_VERSION,
    })
}

/// Decrypts a ciphertext, failing on any authentication mismatch.
pub fn decrypt(
    ciphertext: &[u8],
    nonce: &[u8],
    key: &SecretKey,
    algorithm: AeadAlgorithm,
    version: u8,
) -> Result<Vec<u8>> {
    if version != CIPHERTEXT_VERSION {
        return Err(CapsuleError::serialization(
            format!("unsupported ciphertext version {}", version),
            None::<std::convert::Infallible>,
        ));
    }
    let AeadAlgorithm::Aes256Gcm = algorithm;
    if nonce.len() != NONCE_LEN {
        return Err(CapsuleError::DecryptionFailure);
    }
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CapsuleError::DecryptionFailure)
}

/// 256-bit digest of `data`.
pub fn hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Constant-time comparison of `data`'s digest against `expected`.
pub fn verify_integrity(data: &[u8], expected: &[u8; 32]) -> bool {
    constant_time_eq::constant_time_eq(&hash(data), expected)
}

/// Derives a deterministic 32-byte entropy seed from an engine seed and a
/// domain-separated set of context parts.
///
/// Replaying identical inputs yields identical seeds, which keeps every
/// derived key, nonce and polynomial coefficient replay-stable.
pub fn derive_entropy_seed(seed: &[u8; 32], domain: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_keyed(seed);
    hasher.update(domain.as_bytes());
    for part in parts {
        hasher.update(&(part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn encrypt_decrypt_round_trip() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let key = generate_key(&mut rng);
        let sealed = encrypt(b"attack at dawn", &key, &mut rng).unwrap();
        let opened = decrypt(
            &sealed.ciphertext,
            &sealed.nonce,
            &key,
            sealed.algorithm,
            sealed.version,
        )
        .unwrap();
        assert_eq!(opened, b"attack at dawn");
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let key = generate_key(&mut rng);
        let mut sealed = encrypt(b"payload", &key, &mut rng).unwrap();
        sealed.ciphertext[0] ^= 0x01;
        let result = decrypt(
            &sealed.ciphertext,
            &sealed.nonce,
            &key,
            sealed.algorithm,
            sealed.version,
        );
        assert!(matches!(result, Err(CapsuleError::DecryptionFailure)));
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let key = generate_key(&mut rng);
        let other = generate_key(&mut rng);
        let sealed = encrypt(b"payload", &key, &mut rng).unwrap();
        assert!(decrypt(
            &sealed.ciphertext,
            &sealed.nonce,
            &other,
            sealed.algorithm,
            sealed.version,
        )
        .is_err());
    }

    #[test]
    fn unknown_version_is_refused() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let key = generate_key(&mut rng);
        let sealed = encrypt(b"payload", &key, &mut rng).unwrap();
        assert!(decrypt(&sealed.ciphertext, &sealed.nonce, &key, sealed.algorithm, 2).is_err());
    }

    #[test]
    fn integrity_verification() {
        let digest = hash(b"data");
        assert!(verify_integrity(b"data", &digest));
        assert!(!verify_integrity(b"datb", &digest));
    }

    #[test]
    fn entropy_seed_is_deterministic_and_domain_separated() {
        let seed = [9u8; 32];
        let a = derive_entropy_seed(&seed, "create", &[b"x", b"y"]);
        let b = derive_entropy_seed(&seed, "create", &[b"x", b"y"]);
        let c = derive_entropy_seed(&seed, "other", &[b"x", b"y"]);
        let d = derive_entropy_seed(&seed, "create", &[b"xy", b""]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    proptest! {
        // encrypt-then-decrypt is the identity on arbitrary plaintexts
        #[test]
        fn aead_identity(plaintext in proptest::collection::vec(any::<u8>(), 0..4096), seed in any::<u64>()) {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let key = generate_key(&mut rng);
            let sealed = encrypt(&plaintext, &key, &mut rng).unwrap();
            let opened = decrypt(
                &sealed.ciphertext,
                &sealed.nonce,
                &key,
                sealed.algorithm,
                sealed.version,
            ).unwrap();
            prop_assert_eq!(opened, plaintext);
        }
    }
}
