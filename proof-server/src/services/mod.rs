//! Services for the Proof Server
//!
//! Commitment hashing and the external proving pipeline.

pub mod commitment;
pub mod pipeline;

pub use commitment::{CommitmentError, CommitmentHasher};
pub use pipeline::{PipelineConfig, PipelineError, ProofPipeline, Stage, StageTimeouts, Toolchain};
