//! Type definitions for the Proof Server
//!
//! Request/response types for badge proof generation, the circuit inputs
//! written to `Prover.toml`, and API error codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Accepts a field either as a JSON string or a JSON integer and keeps it
/// as a decimal string
mod decimal {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::String(s) => s.trim().to_string(),
            StringOrNumber::Number(n) => n.to_string(),
        })
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(|v| match v {
            StringOrNumber::String(s) => s.trim().to_string(),
            StringOrNumber::Number(n) => n.to_string(),
        }))
    }
}

/// Error codes returned by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A pipeline stage failed or timed out
    ProofGenerationFailed,
    /// Proof did not pass local verification
    ProofVerificationFailed,
    /// Invalid input data
    InvalidInput,
    /// Commitment could not be computed
    CommitmentFailed,
    /// Internal server error
    InternalError,
}

// ==================== Request Types ====================

/// HTTP body for badge proof generation.
///
/// Numeric fields accept strings or integers. The un-underscored aliases
/// match the web client's field names.
#[derive(Clone, Deserialize)]
pub struct GenerateProofRequest {
    #[serde(alias = "donationamount", deserialize_with = "decimal::deserialize")]
    pub donation_amount: String,
    #[serde(alias = "donorsecret", deserialize_with = "decimal::deserialize")]
    pub donor_secret: String,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub threshold: String,
    #[serde(alias = "badgetier", deserialize_with = "decimal::deserialize")]
    pub badge_tier: String,
    /// Computed server-side when omitted
    #[serde(default, deserialize_with = "decimal::deserialize_opt")]
    pub donation_commitment: Option<String>,
}

impl fmt::Debug for GenerateProofRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerateProofRequest")
            .field("donation_amount", &self.donation_amount)
            .field("donor_secret", &"<redacted>")
            .field("threshold", &self.threshold)
            .field("badge_tier", &self.badge_tier)
            .field("donation_commitment", &self.donation_commitment)
            .finish()
    }
}

/// Request to compute a donation commitment only
#[derive(Clone, Deserialize)]
pub struct CommitmentRequest {
    #[serde(alias = "donationamount", deserialize_with = "decimal::deserialize")]
    pub donation_amount: String,
    #[serde(alias = "donorsecret", deserialize_with = "decimal::deserialize")]
    pub donor_secret: String,
}

/// Circuit inputs, serialized verbatim into `Prover.toml`.
///
/// All fields are decimal strings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequest {
    pub donation_amount: String,
    pub donor_secret: String,
    pub threshold: String,
    pub badge_tier: String,
    pub donation_commitment: String,
}

impl fmt::Debug for ProofRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProofRequest")
            .field("donation_amount", &self.donation_amount)
            .field("donor_secret", &"<redacted>")
            .field("threshold", &self.threshold)
            .field("badge_tier", &self.badge_tier)
            .field("donation_commitment", &self.donation_commitment)
            .finish()
    }
}

impl ProofRequest {
    /// Every field must be a non-empty run of ASCII digits
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("donation_amount", &self.donation_amount),
            ("donor_secret", &self.donor_secret),
            ("threshold", &self.threshold),
            ("badge_tier", &self.badge_tier),
            ("donation_commitment", &self.donation_commitment),
        ];
        for (name, value) in fields {
            if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("{name} must be a decimal string"));
            }
        }
        Ok(())
    }
}

// ==================== Response Types ====================

/// Pipeline outcome, also the HTTP response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofResponse {
    pub success: bool,
    /// Calldata words for the verifier contract (success only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calldata: Option<Vec<String>>,
    /// Commitment used as public input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment: Option<String>,
    /// Failure message (failure only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stage that failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
    pub generation_time_ms: u64,
}

impl ProofResponse {
    pub fn success(calldata: Vec<String>, commitment: String, generation_time_ms: u64) -> Self {
        Self {
            success: true,
            calldata: Some(calldata),
            commitment: Some(commitment),
            error: None,
            failed_stage: None,
            generation_time_ms,
        }
    }

    pub fn failure(error: String, failed_stage: Option<String>, generation_time_ms: u64) -> Self {
        Self {
            success: false,
            calldata: None,
            commitment: None,
            error: Some(error),
            failed_stage,
            generation_time_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitmentResponse {
    pub commitment: String,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional additional details
    pub details: Option<serde_json::Value>,
}

/// Server health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Requests waiting for or holding the pipeline
    pub queue_length: usize,
    /// Whether a pipeline run currently holds the circuit directory
    pub busy: bool,
}

/// Server status with more details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub circuit: String,
    pub successful_proofs: u64,
    pub failed_proofs: u64,
    pub queue_length: usize,
    pub uptime_secs: u64,
    pub started_at: chrono::DateTime<chrono::Utc>,
}
