//! Operation requests and the capabilities the client drives
//!
//! The confidential-balance cryptography (key derivation, ciphertexts,
//! range proofs) and the wallet are external. The client talks to them
//! through two traits:
//!
//! - [`ConfidentialAccount`]: reads contract state and builds calldata for
//!   an [`OperationRequest`], possibly generating proofs on the way
//! - [`TransactionSubmitter`]: signs, submits and waits for inclusion

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DownstreamError;
use crate::keys::RecipientKey;
use crate::state::BalanceSnapshot;

/// The five mutating operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Fund,
    Transfer,
    Rollover,
    Withdraw,
    Ragequit,
}

impl OperationKind {
    pub const ALL: [OperationKind; 5] = [
        OperationKind::Fund,
        OperationKind::Transfer,
        OperationKind::Rollover,
        OperationKind::Withdraw,
        OperationKind::Ragequit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Fund => "fund",
            OperationKind::Transfer => "transfer",
            OperationKind::Rollover => "rollover",
            OperationKind::Withdraw => "withdraw",
            OperationKind::Ragequit => "ragequit",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One operation to build; constructed per call and discarded after
/// submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    pub kind: OperationKind,
    /// Confidential units (fund / transfer / withdraw)
    pub amount: Option<u128>,
    /// Transfer recipient
    pub recipient: Option<RecipientKey>,
    /// Wallet address paying fees
    pub sender: String,
    /// Payout address for withdraw / ragequit
    pub to: Option<String>,
}

impl OperationRequest {
    pub fn fund(amount: u128, sender: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Fund,
            amount: Some(amount),
            recipient: None,
            sender: sender.into(),
            to: None,
        }
    }

    pub fn transfer(recipient: RecipientKey, amount: u128, sender: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Transfer,
            amount: Some(amount),
            recipient: Some(recipient),
            sender: sender.into(),
            to: None,
        }
    }

    pub fn rollover(sender: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Rollover,
            amount: None,
            recipient: None,
            sender: sender.into(),
            to: None,
        }
    }

    pub fn withdraw(amount: u128, sender: impl Into<String>) -> Self {
        let sender = sender.into();
        Self {
            kind: OperationKind::Withdraw,
            amount: Some(amount),
            recipient: None,
            to: Some(sender.clone()),
            sender,
        }
    }

    pub fn ragequit(sender: impl Into<String>) -> Self {
        let sender = sender.into();
        Self {
            kind: OperationKind::Ragequit,
            amount: None,
            recipient: None,
            to: Some(sender.clone()),
            sender,
        }
    }
}

/// A single contract invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub contract_address: String,
    pub entrypoint: String,
    pub calldata: Vec<String>,
}

/// Output of [`ConfidentialAccount::build`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltOperation {
    /// ERC-20 approval needed before the main call (fund only, when the
    /// allowance is short)
    pub approve: Option<Call>,
    pub call: Call,
}

impl BuiltOperation {
    pub fn has_approval(&self) -> bool {
        self.approve.is_some()
    }

    /// Calls in submission order: approval first
    pub fn into_calls(self) -> Vec<Call> {
        self.approve.into_iter().chain(std::iter::once(self.call)).collect()
    }
}

/// Confidential-balance account backed by the external cryptographic
/// library. Owns the confidential private key.
#[async_trait]
pub trait ConfidentialAccount: Send + Sync {
    /// Public key derived from the private key
    fn public_key(&self) -> RecipientKey;

    /// Current balance, pending balance and nonce from the contract
    async fn state(&self) -> Result<BalanceSnapshot, DownstreamError>;

    /// Token base units per confidential unit
    async fn rate(&self) -> Result<u128, DownstreamError>;

    /// Range-proof bit width
    async fn bit_size(&self) -> Result<u32, DownstreamError>;

    /// Build calldata for `request`; may generate proofs and take seconds
    async fn build(&self, request: &OperationRequest) -> Result<BuiltOperation, DownstreamError>;
}

/// Wallet side: submit calls as one transaction and wait for it
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Wallet address used as sender
    fn address(&self) -> &str;

    /// Submit all calls atomically, returning the transaction hash
    async fn execute(&self, calls: Vec<Call>) -> Result<String, DownstreamError>;

    /// Resolve once the transaction is included; errors on revert
    async fn wait_for_inclusion(&self, tx_hash: &str) -> Result<(), DownstreamError>;
}
