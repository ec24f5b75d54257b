//! Donation Commitment Service
//!
//! `donation_commitment = Poseidon(donor_secret, donation_amount)` over the
//! BN254 scalar field with circom parameters, matching the hash the Noir
//! badge circuit checks.

use ark_bn254::Fr;
use ark_ff::PrimeField;
use light_poseidon::{Poseidon, PoseidonHasher};
use num_bigint::BigUint;
use once_cell::sync::OnceCell;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CommitmentError {
    #[error("{0} must be a decimal string")]
    NotDecimal(&'static str),
    #[error("{0} exceeds the BN254 scalar field")]
    OutOfField(&'static str),
    #[error("Poseidon hashing failed: {0}")]
    Hash(String),
}

/// Owns a lazily built Poseidon instance; one per server, not per process
#[derive(Default)]
pub struct CommitmentHasher {
    poseidon: OnceCell<Mutex<Poseidon<Fr>>>,
}

fn parse_field(name: &'static str, value: &str) -> Result<Fr, CommitmentError> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CommitmentError::NotDecimal(name));
    }
    let n = BigUint::parse_bytes(value.as_bytes(), 10).ok_or(CommitmentError::NotDecimal(name))?;
    if n >= BigUint::from(Fr::MODULUS) {
        return Err(CommitmentError::OutOfField(name));
    }
    Ok(Fr::from(n))
}

impl CommitmentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    fn poseidon(&self) -> Result<&Mutex<Poseidon<Fr>>, CommitmentError> {
        self.poseidon.get_or_try_init(|| {
            debug!("Initializing Poseidon hasher");
            Poseidon::<Fr>::new_circom(2)
                .map(Mutex::new)
                .map_err(|e| CommitmentError::Hash(e.to_string()))
        })
    }

    /// Commitment as a decimal string
    pub fn commit(&self, donor_secret: &str, donation_amount: &str) -> Result<String, CommitmentError> {
        let secret = parse_field("donor_secret", donor_secret)?;
        let amount = parse_field("donation_amount", donation_amount)?;

        let mut poseidon = self
            .poseidon()?
            .lock()
            .map_err(|_| CommitmentError::Hash("hasher lock poisoned".into()))?;
        let hash = poseidon
            .hash(&[secret, amount])
            .map_err(|e| CommitmentError::Hash(e.to_string()))?;

        Ok(BigUint::from(hash.into_bigint()).to_string())
    }
}
