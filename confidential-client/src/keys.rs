//! Recipient public key codec
//!
//! Confidential-balance public keys are points on the Stark curve
//! (`y^2 = x^3 + x + beta` over the Starknet field). They are exchanged in
//! two textual forms:
//!
//! - hex: optional `0x` followed by exactly 128 hex characters, `x || y`
//! - base58: a 33-byte compressed point (`0x02`/`0x03` parity prefix + `x`)
//!
//! Validation is pure; nothing here performs I/O.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

const HEX_KEY_LEN: usize = 128;
const COMPRESSED_LEN: usize = 33;

const FIELD_PRIME_HEX: &str = "800000000000011000000000000000000000000000000000000000000000001";
const CURVE_BETA_HEX: &str = "6f21413efbe40de150e596d72f7a8c5609ad26c15c915c1f4cdfcb99cee9e89";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Public key is empty")]
    Empty,
    #[error("Invalid hex characters in public key")]
    BadHex,
    #[error("Hex public key must be {HEX_KEY_LEN} chars (x+y), got {0}")]
    WrongLength(usize),
    #[error("Undecodable base58 public key: {0}")]
    Base58(String),
    #[error("Compressed public key must be {COMPRESSED_LEN} bytes, got {0}")]
    WrongCompressedLength(usize),
    #[error("Unknown compressed point prefix 0x{0:02x}")]
    BadPrefix(u8),
    #[error("Point is not on the Stark curve")]
    NotOnCurve,
}

/// Result of [`validate_recipient_key`]; never an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Affine point identifying a confidential-balance account
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecipientKey {
    pub x: BigUint,
    pub y: BigUint,
}

fn field_prime() -> &'static BigUint {
    static PRIME: OnceLock<BigUint> = OnceLock::new();
    PRIME.get_or_init(|| BigUint::parse_bytes(FIELD_PRIME_HEX.as_bytes(), 16).unwrap_or_default())
}

fn curve_beta() -> &'static BigUint {
    static BETA: OnceLock<BigUint> = OnceLock::new();
    BETA.get_or_init(|| BigUint::parse_bytes(CURVE_BETA_HEX.as_bytes(), 16).unwrap_or_default())
}

/// `x^3 + x + beta mod p`
fn curve_rhs(x: &BigUint) -> BigUint {
    let p = field_prime();
    (x.modpow(&BigUint::from(3u8), p) + x + curve_beta()) % p
}

/// Tonelli-Shanks square root modulo the field prime
fn sqrt_mod_p(n: &BigUint) -> Option<BigUint> {
    let p = field_prime();
    let one = BigUint::one();
    if n.is_zero() {
        return Some(BigUint::zero());
    }

    let p_minus_one = p - &one;
    let legendre_exp = &p_minus_one >> 1u32;
    if n.modpow(&legendre_exp, p) != one {
        return None;
    }

    // p - 1 = q * 2^s with q odd
    let mut q = p_minus_one.clone();
    let mut s = 0u32;
    while !q.bit(0) {
        q >>= 1u32;
        s += 1;
    }

    let mut z = BigUint::from(2u8);
    while z.modpow(&legendre_exp, p) != p_minus_one {
        z += 1u8;
    }

    let mut m = s;
    let mut c = z.modpow(&q, p);
    let mut t = n.modpow(&q, p);
    let mut r = n.modpow(&((&q + &one) >> 1u32), p);

    while t != one {
        let mut i = 0u32;
        let mut t2 = t.clone();
        while t2 != one {
            t2 = (&t2 * &t2) % p;
            i += 1;
            if i == m {
                return None;
            }
        }
        let b = c.modpow(&(BigUint::one() << (m - i - 1)), p);
        m = i;
        c = (&b * &b) % p;
        t = (&t * &c) % p;
        r = (&r * &b) % p;
    }

    Some(r)
}

/// Coordinate as 32 big-endian bytes, reduced into the field first
fn to_be_32(value: &BigUint) -> [u8; 32] {
    let bytes = (value % field_prime()).to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

impl RecipientKey {
    /// Parse either textual form
    pub fn parse(key: &str) -> Result<Self, KeyError> {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(KeyError::Empty);
        }

        match trimmed.strip_prefix("0x") {
            Some(hex) => Self::from_hex(hex),
            // A compressed base58 point is far shorter than 128 chars
            None if trimmed.len() == HEX_KEY_LEN
                && trimmed.bytes().all(|b| b.is_ascii_hexdigit()) =>
            {
                Self::from_hex(trimmed)
            }
            None => Self::from_base58(trimmed),
        }
    }

    fn from_hex(hex: &str) -> Result<Self, KeyError> {
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(KeyError::BadHex);
        }
        if hex.len() != HEX_KEY_LEN {
            return Err(KeyError::WrongLength(hex.len()));
        }

        let (x, y) = hex.split_at(HEX_KEY_LEN / 2);
        Ok(Self {
            x: BigUint::parse_bytes(x.as_bytes(), 16).ok_or(KeyError::BadHex)?,
            y: BigUint::parse_bytes(y.as_bytes(), 16).ok_or(KeyError::BadHex)?,
        })
    }

    fn from_base58(encoded: &str) -> Result<Self, KeyError> {
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| KeyError::Base58(e.to_string()))?;
        if bytes.len() != COMPRESSED_LEN {
            return Err(KeyError::WrongCompressedLength(bytes.len()));
        }

        let odd = match bytes[0] {
            0x02 => false,
            0x03 => true,
            other => return Err(KeyError::BadPrefix(other)),
        };

        let x = BigUint::from_bytes_be(&bytes[1..]);
        if &x >= field_prime() {
            return Err(KeyError::NotOnCurve);
        }

        let y = sqrt_mod_p(&curve_rhs(&x)).ok_or(KeyError::NotOnCurve)?;
        let y = if y.bit(0) == odd { y } else { field_prime() - y };

        Ok(Self { x, y })
    }

    pub fn is_on_curve(&self) -> bool {
        let p = field_prime();
        &self.x < p && &self.y < p && (&self.y * &self.y) % p == curve_rhs(&self.x)
    }

    /// `0x` + 128 hex chars
    pub fn to_hex(&self) -> String {
        format!("0x{}{}", hex::encode(to_be_32(&self.x)), hex::encode(to_be_32(&self.y)))
    }

    /// Compressed base58 form, the usual display encoding
    pub fn to_base58(&self) -> String {
        let mut bytes = Vec::with_capacity(COMPRESSED_LEN);
        let y = &self.y % field_prime();
        bytes.push(if y.bit(0) { 0x03 } else { 0x02 });
        bytes.extend_from_slice(&to_be_32(&self.x));
        bs58::encode(bytes).into_string()
    }
}

impl fmt::Display for RecipientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

/// Validate a recipient key without raising
pub fn validate_recipient_key(key: &str) -> KeyValidation {
    match RecipientKey::parse(key) {
        Ok(_) => KeyValidation {
            valid: true,
            error: None,
        },
        Err(e) => KeyValidation {
            valid: false,
            error: Some(e.to_string()),
        },
    }
}
