//! # Confidential Balance Client
//!
//! Turns high-level donor intents ("fund 5 STRK", "send 2 USDC to this key",
//! "withdraw everything") into correctly sequenced confidential-balance
//! transactions on Starknet.
//!
//! ## Layers
//!
//! - [`state`] - last-synchronized balance snapshot for one account
//! - [`operation`] - request types and the capability traits the client
//!   drives (account reader, operation builder, transaction submitter)
//! - [`error`] - classification of downstream failures into a closed
//!   taxonomy with user-facing hints
//! - [`client`] - the orchestrator exposing fund / transfer / rollover /
//!   withdraw / ragequit plus refresh and accessors
//!
//! The cryptography (commitments, range proofs, ciphertexts) lives behind
//! [`operation::ConfidentialAccount`]; this crate never sees it.

pub mod amount;
pub mod client;
pub mod config;
pub mod error;
pub mod keys;
pub mod operation;
pub mod preflight;
pub mod state;

// Re-export commonly used items
pub use client::ConfidentialClient;
pub use config::{ClientSettings, Network, NetworkConfig};
pub use error::{classify, ClassifiedError, ClientError, DownstreamError, ErrorCode, ValidationError};
pub use keys::{KeyValidation, RecipientKey};
pub use operation::{
    BuiltOperation, Call, ConfidentialAccount, OperationKind, OperationRequest,
    TransactionSubmitter,
};
pub use state::{AccountState, BalanceSnapshot};
