//! Shamir threshold sharing over F_p.
//!
//! A secret of at most 32 bytes becomes the constant term of a random
//! polynomial of degree threshold-1; share i is the point (i+1, f(i+1)).
//! Any threshold-many distinct shares recombine the secret by Lagrange
//! interpolation at x = 0; fewer carry no information about it.
//!
//! Wire format per share: `[be_u16 len_x][x][be_u16 len_y][y]` with
//! minimal-length big-endian integer bytes. Deserialization rejects x = 0
//! and any coordinate at or above the field prime.

use rand::{CryptoRng, RngCore};

use crate::crypto::field::FieldElement;
use crate::types::error::{CapsuleError, Result};

/// Largest secret the field can carry.
pub const MAX_SECRET_LEN: usize = 32;

/// One point on the sharing polynomial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub x: FieldElement,
    pub y: FieldElement,
}

impl Share {
    /// The share's small-integer x coordinate, when it has one.
    ///
    /// Shares produced by [`split`] always do (x = index + 1).
    pub fn index_hint(&self) -> Option<u32> {
        let bytes = self.x.to_be_bytes();
        if bytes[..28].iter().any(|&b| b != 0) {
            return None;
        }
        Some(u32::from_be_bytes([bytes[28], bytes[29], bytes[30], bytes[31]]))
    }

    /// Serializes to the length-prefixed wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let x = self.x.to_minimal_be_bytes();
        let y = self.y.to_minimal_be_bytes();
        let mut out = Vec::with_capacity(4 + x.len() + y.len());
        out.extend_from_slice(&(x.len() as u16).to_be_bytes());
        out.extend_from_slice(&x);
        out.extend_from_slice(&(y.len() as u16).to_be_bytes());
        out.extend_from_slice(&y);
        out
    }

    /// Parses the wire format, rejecting non-canonical coordinates.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let (x_bytes, rest) = read_field(data)?;
        let (y_bytes, rest) = read_field(rest)?;
        if !rest.is_empty() {
            return Err(CapsuleError::invalid_share("trailing bytes after share"));
        }
        let x = FieldElement::from_be_bytes(x_bytes)
            .ok_or_else(|| CapsuleError::share_out_of_field("x coordinate not below prime"))?;
        let y = FieldElement::from_be_bytes(y_bytes)
            .ok_or_else(|| CapsuleError::share_out_of_field("y coordinate not below prime"))?;
        if x.is_zero() {
            return Err(CapsuleError::share_out_of_field("x coordinate is zero"));
        }
        Ok(Share { x, y })
    }
}

fn read_field(data: &[u8]) -> Result<(&[u8], &[u8])> {
    if data.len() < 2 {
        return Err(CapsuleError::invalid_share("share truncated"));
    }
    let len = u16::from_be_bytes([data[0], data[1]]) as usize;
    if data.len() < 2 + len {
        return Err(CapsuleError::invalid_share("share truncated"));
    }
    Ok((&data[2..2 + len], &data[2 + len..]))
}

/// Splits `secret` into `total_shares` shares, any `threshold` of which
/// reconstruct it.
pub fn split(
    secret: &[u8],
    threshold: u32,
    total_shares: u32,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<Vec<Share>> {
    if threshold == 0 {
        return Err(CapsuleError::ThresholdZero);
    }
    if total_shares == 0 {
        return Err(CapsuleError::invalid_threshold("total shares must be at least 1"));
    }
    if threshold > total_shares {
        return Err(CapsuleError::ThresholdTooLarge {
            threshold,
            total: total_shares,
        });
    }
    if secret.len() > MAX_SECRET_LEN {
        return Err(CapsuleError::SecretTooLarge { len: secret.len() });
    }
    let constant = FieldElement::from_be_bytes(secret)
        .ok_or(CapsuleError::SecretTooLarge { len: secret.len() })?;

    let mut coefficients = Vec::with_capacity(threshold as usize);
    coefficients.push(constant);
    for _ in 1..threshold {
        coefficients.push(FieldElement::random(rng));
    }

    let mut shares = Vec::with_capacity(total_shares as usize);
    for i in 0..total_shares {
        let x = FieldElement::from_u64(u64::from(i) + 1);
        let y = evaluate_polynomial(&coefficients, &x);
        shares.push(Share { x, y });
    }
    Ok(shares)
}

/// Reconstructs the sharing polynomial's constant term from the given
/// shares, returned as exactly 32 big-endian bytes.
///
/// The fixed width preserves secrets whose leading bytes are zero; callers
/// holding variable-length secrets strip the padding themselves.
pub fn combine(shares: &[Share]) -> Result<[u8; 32]> {
    if shares.is_empty() {
        return Err(CapsuleError::InsufficientShares { needed: 1, got: 0 });
    }
    for (i, a) in shares.iter().enumerate() {
        for b in &shares[i + 1..] {
            if a.x == b.x {
                return Err(CapsuleError::DuplicateShareX {
                    x: hex::encode(a.x.to_minimal_be_bytes()),
                });
            }
        }
    }

    // Lagrange interpolation at x = 0
    let mut secret = FieldElement::ZERO;
    for (i, share) in shares.iter().enumerate() {
        let mut numerator = FieldElement::ONE;
        let mut denominator = FieldElement::ONE;
        for (j, other) in shares.iter().enumerate() {
            if i == j {
                continue;
            }
            numerator = numerator.mul(&other.x.neg());
            denominator = denominator.mul(&share.x.sub(&other.x));
        }
        let denom_inv = denominator
            .invert()
            .ok_or_else(|| CapsuleError::internal_invariant("zero Lagrange denominator"))?;
        let basis = numerator.mul(&denom_inv);
        secret = secret.add(&share.y.mul(&basis));
    }
    Ok(secret.to_be_bytes())
}

fn evaluate_polynomial(coefficients: &[FieldElement], x: &FieldElement) -> FieldElement {
    // Horner's method
    let mut acc = FieldElement::ZERO;
    for coeff in coefficients.iter().rev() {
        acc = acc.mul(x).add(coeff);
    }
    acc
}
