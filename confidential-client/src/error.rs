//! Error taxonomy for the confidential balance client
//!
//! Failures come from three domains (wallet approval, proof construction,
//! contract execution) and arrive as free-form text. [`classify`] folds them
//! into exactly one [`ErrorCode`] so a UI can branch on a closed set.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Markers the token contract emits when the caller does not own the
/// allowance being spent. `NowOwner` is a typo shipped in deployed contracts.
const APPROVAL_MARKERS: [&str; 2] = ["NotOwner", "NowOwner"];

/// Error codes surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Token approval / ownership check failed
    ApprovalFailed,
    /// Not enough balance, locally or on-chain
    InsufficientBalance,
    /// Zero-knowledge proof construction failed
    ProofError,
    /// Confidential key is malformed or rejected
    InvalidKey,
    /// Anything else; the raw message is kept verbatim
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ApprovalFailed => "APPROVAL_FAILED",
            ErrorCode::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ErrorCode::ProofError => "PROOF_ERROR",
            ErrorCode::InvalidKey => "INVALID_KEY",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }

    fn summary(&self) -> Option<&'static str> {
        match self {
            ErrorCode::ApprovalFailed => Some("Token approval failed."),
            ErrorCode::InsufficientBalance => Some("Insufficient balance."),
            ErrorCode::ProofError => Some("Zero-knowledge proof generation failed."),
            ErrorCode::InvalidKey => Some("Invalid confidential private key."),
            ErrorCode::Unknown => None,
        }
    }

    /// Remediation hint shown next to the message
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ErrorCode::ApprovalFailed => Some("Check wallet balance and network, then retry."),
            ErrorCode::InsufficientBalance => Some("Fund your account or lower the amount."),
            ErrorCode::ProofError => Some("Regenerate your confidential key and retry."),
            ErrorCode::InvalidKey => Some("Generate a new key and retry."),
            ErrorCode::Unknown => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A downstream failure after classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct ClassifiedError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ClassifiedError {
    fn from_code(code: ErrorCode, raw: &str) -> Self {
        let message = code
            .summary()
            .map(str::to_string)
            .unwrap_or_else(|| raw.to_string());

        Self {
            code,
            message,
            hint: code.hint().map(str::to_string),
        }
    }
}

/// Raw failure reported by a capability (account reader, operation
/// builder, submitter).
///
/// Capabilities that know what went wrong set `code`; those that only have
/// text leave it empty and the classifier falls back to substring matching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DownstreamError {
    pub code: Option<ErrorCode>,
    pub message: String,
}

impl DownstreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// Classify this failure, preferring the structured code when present
    pub fn classify(&self) -> ClassifiedError {
        match self.code {
            Some(code) => ClassifiedError::from_code(code, &self.message),
            None => classify(&self.message),
        }
    }
}

/// Map a raw failure message to exactly one [`ClassifiedError`].
///
/// Checks run in a fixed order and the first match wins, so a message
/// mentioning both "insufficient" and "proof" is an insufficient balance.
pub fn classify(message: &str) -> ClassifiedError {
    let lowered = message.to_lowercase();

    let code = if APPROVAL_MARKERS.iter().any(|m| message.contains(m)) {
        ErrorCode::ApprovalFailed
    } else if lowered.contains("insufficient") {
        ErrorCode::InsufficientBalance
    } else if lowered.contains("proof") {
        ErrorCode::ProofError
    } else if lowered.contains("key") {
        ErrorCode::InvalidKey
    } else {
        ErrorCode::Unknown
    };

    ClassifiedError::from_code(code, message)
}

/// Local rejections raised before any capability is called
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("amount {amount} is below one confidential unit (rate {rate})")]
    BelowRate { amount: u128, rate: u128 },
    #[error("invalid recipient key: {0}")]
    InvalidRecipient(String),
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u128, available: u128 },
    #[error("ragequit is disabled; set TONGO_ENABLE_RAGEQUIT=true to allow it")]
    RagequitDisabled,
    #[error("no confidential balance to withdraw")]
    NothingToWithdraw,
}

/// Error returned by every public client operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Rejected locally; nothing was sent anywhere
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    /// A capability failed and the failure was classified
    #[error(transparent)]
    Classified(#[from] ClassifiedError),
}

impl ClientError {
    /// Taxonomy code, when the failure maps onto one
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Classified(e) => Some(e.code),
            ClientError::Invalid(ValidationError::InsufficientBalance { .. })
            | ClientError::Invalid(ValidationError::NothingToWithdraw) => {
                Some(ErrorCode::InsufficientBalance)
            }
            ClientError::Invalid(ValidationError::InvalidRecipient(_)) => Some(ErrorCode::InvalidKey),
            ClientError::Invalid(_) => None,
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            ClientError::Classified(e) => e.hint.as_deref(),
            ClientError::Invalid(ValidationError::RagequitDisabled) => {
                Some("Ragequit is irreversible; enable it explicitly only if you mean to exit.")
            }
            ClientError::Invalid(_) => self.code().and_then(|c| c.hint()),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Invalid(_))
    }
}

impl From<DownstreamError> for ClientError {
    fn from(err: DownstreamError) -> Self {
        ClientError::Classified(err.classify())
    }
}
