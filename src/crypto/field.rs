//! Prime field arithmetic for threshold secret sharing.
//!
//! Implements F_p with p = 2^256 - 2^32 - 977 (the secp256k1 field prime).
//! Elements are four 64-bit little-endian limbs held in canonical reduced
//! form; all operations stay closed over the field. Reduction exploits
//! 2^256 ≡ 2^32 + 977 (mod p), so a 512-bit product folds back into range
//! with two passes and a single conditional subtraction.
//!
//! The module is consumed only by the Shamir layer; parameter validation
//! (thresholds, share identifiers) happens there, not here.

use rand::{CryptoRng, RngCore};

/// p = 2^256 - 2^32 - 977, little-endian limbs.
const P: [u64; 4] = [
    0xFFFF_FFFE_FFFF_FC2F,
    0xFFFF_FFFF_FFFF_FFFF,
    0xFFFF_FFFF_FFFF_FFFF,
    0xFFFF_FFFF_FFFF_FFFF,
];

/// p - 2, the Fermat inversion exponent.
const P_MINUS_2: [u64; 4] = [
    0xFFFF_FFFE_FFFF_FC2D,
    0xFFFF_FFFF_FFFF_FFFF,
    0xFFFF_FFFF_FFFF_FFFF,
    0xFFFF_FFFF_FFFF_FFFF,
];

/// 2^256 mod p = 2^32 + 977.
const FOLD: u64 = 0x1_0000_03D1;

#[inline]
fn adc(a: u64, b: u64, carry: u64) -> (u64, u64) {
    let t = (a as u128) + (b as u128) + (carry as u128);
    (t as u64, (t >> 64) as u64)
}

#[inline]
fn sbb(a: u64, b: u64, borrow: u64) -> (u64, u64) {
    let (x, b1) = a.overflowing_sub(b);
    let (y, b2) = x.overflowing_sub(borrow);
    (y, (b1 as u64) | (b2 as u64))
}

#[inline]
fn lt(a: &[u64; 4], b: &[u64; 4]) -> bool {
    for i in (0..4).rev() {
        if a[i] != b[i] {
            return a[i] < b[i];
        }
    }
    false
}

#[inline]
fn sub_limbs(a: &[u64; 4], b: &[u64; 4]) -> ([u64; 4], u64) {
    let mut r = [0u64; 4];
    let mut borrow = 0;
    for i in 0..4 {
        let (v, bo) = sbb(a[i], b[i], borrow);
        r[i] = v;
        borrow = bo;
    }
    (r, borrow)
}

/// An element of F_p in canonical reduced form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldElement([u64; 4]);

impl FieldElement {
    pub const ZERO: Self = FieldElement([0, 0, 0, 0]);
    pub const ONE: Self = FieldElement([1, 0, 0, 0]);

    pub fn from_u64(n: u64) -> Self {
        FieldElement([n, 0, 0, 0])
    }

    /// Parses up to 32 big-endian bytes. Values at or above p are rejected
    /// rather than reduced, so every element has one encoding.
    pub fn from_be_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > 32 {
            return None;
        }
        let mut padded = [0u8; 32];
        padded[32 - bytes.len()..].copy_from_slice(bytes);
        let mut limbs = [0u64; 4];
        for i in 0..4 {
            let start = 32 - (i + 1) * 8;
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&padded[start..start + 8]);
            limbs[i] = u64::from_be_bytes(chunk);
        }
        if lt(&limbs, &P) {
            Some(FieldElement(limbs))
        } else {
            None
        }
    }

    /// Canonical fixed-width big-endian encoding.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for i in 0..4 {
            let start = 32 - (i + 1) * 8;
            out[start..start + 8].copy_from_slice(&self.0[i].to_be_bytes());
        }
        out
    }

    /// Minimal-length big-endian encoding (no leading zero bytes; empty for
    /// zero), the integer form used on the share wire format.
    pub fn to_minimal_be_bytes(&self) -> Vec<u8> {
        let full = self.to_be_bytes();
        let first = full.iter().position(|&b| b != 0).unwrap_or(32);
        full[first..].to_vec()
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0, 0]
    }

    /// Uniform random element, by rejection sampling.
    pub fn random(rng: &mut (impl RngCore + CryptoRng)) -> Self {
        loop {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            if let Some(fe) = Self::from_be_bytes(&bytes) {
                return fe;
            }
        }
    }

    pub fn add(&self, rhs: &Self) -> Self {
        let mut r = [0u64; 4];
        let mut carry = 0;
        for i in 0..4 {
            let (v, c) = adc(self.0[i], rhs.0[i], carry);
            r[i] = v;
            carry = c;
        }
        if carry != 0 || !lt(&r, &P) {
            r = sub_limbs(&r, &P).0;
        }
        FieldElement(r)
    }

    pub fn sub(&self, rhs: &Self) -> Self {
        let (r, borrow) = sub_limbs(&self.0, &rhs.0);
        if borrow == 0 {
            FieldElement(r)
        } else {
            let mut out = [0u64; 4];
            let mut carry = 0;
            for i in 0..4 {
                let (v, c) = adc(r[i], P[i], carry);
                out[i] = v;
                carry = c;
            }
            FieldElement(out)
        }
    }

    pub fn neg(&self) -> Self {
        if self.is_zero() {
            *self
        } else {
            FieldElement(sub_limbs(&P, &self.0).0)
        }
    }

    pub fn mul(&self, rhs: &Self) -> Self {
        // schoolbook 4x4 -> 8 limbs
        let a = &self.0;
        let b = &rhs.0;
        let mut w = [0u64; 8];
        for i in 0..4 {
            let mut carry: u128 = 0;
            for j in 0..4 {
                let t = (w[i + j] as u128) + (a[i] as u128) * (b[j] as u128) + carry;
                w[i + j] = t as u64;
                carry = t >> 64;
            }
            w[i + 4] = carry as u64;
        }
        FieldElement(reduce_wide(w))
    }

    fn pow(&self, exp: &[u64; 4]) -> Self {
        let mut acc = Self::ONE;
        for i in (0..4).rev() {
            for bit in (0..64).rev() {
                acc = acc.mul(&acc);
                if (exp[i] >> bit) & 1 == 1 {
                    acc = acc.mul(self);
                }
            }
        }
        acc
    }

    /// Multiplicative inverse via Fermat (a^(p-2)); `None` for zero.
    pub fn invert(&self) -> Option<Self> {
        if self.is_zero() {
            None
        } else {
            Some(self.pow(&P_MINUS_2))
        }
    }
}

/// Folds a 512-bit product into canonical range using 2^256 ≡ FOLD (mod p).
fn reduce_wide(w: [u64; 8]) -> [u64; 4] {
    let c = FOLD as u128;

    // first fold: lo + hi * FOLD
    let mut t = [0u64; 5];
    let mut carry: u128 = 0;
    for i in 0..4 {
        let v = (w[i] as u128) + (w[i + 4] as u128) * c + carry;
        t[i] = v as u64;
        carry = v >> 64;
    }
    t[4] = carry as u64;

    // second fold: the spill limb is at most ~2^34
    let mut r = [0u64; 4];
    let v0 = (t[0] as u128) + (t[4] as u128) * c;
    r[0] = v0 as u64;
    let mut carry2 = v0 >> 64;
    for i in 1..4 {
        let v = (t[i] as u128) + carry2;
        r[i] = v as u64;
        carry2 = v >> 64;
    }
    if carry2 != 0 {
        // a final wrap of 2^256; cannot carry past the second limb
        let v = (r[0] as u128) + c;
        r[0] = v as u64;
        let mut k = v >> 64;
        let mut i = 1;
        while k != 0 && i < 4 {
            let v = (r[i] as u128) + k;
            r[i] = v as u64;
            k = v >> 64;
            i += 1;
        }
    }
    if !lt(&r, &P) {
        r = sub_limbs(&r, &P).0;
    }
    r
}
