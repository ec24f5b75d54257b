//! Badge Proof Pipeline
//!
//! Drives the external Noir / Barretenberg / Garaga toolchain for the
//! donation badge circuit:
//!
//! 1. write `Prover.toml` with the request fields
//! 2. `nargo execute witness`
//! 3. `bb prove` (UltraHonk, keccak oracle)
//! 4. `bb verify` against the circuit's verification key
//! 5. `garaga calldata` over the verified proof
//!
//! Each stage is one-shot with its own wall-clock bound. The parameter file
//! is shared per circuit directory, so runs are serialized by an internal
//! lock. A proof that fails local verification is never encoded.

use crate::types::{ProofRequest, ProofResponse};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// Longest stderr excerpt carried in an error message
const MAX_STDERR_LEN: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    WriteParams,
    Witness,
    Prove,
    Verify,
    Calldata,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::WriteParams => "write_params",
            Stage::Witness => "witness",
            Stage::Prove => "prove",
            Stage::Verify => "verify",
            Stage::Calldata => "calldata",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Failed to write Prover.toml: {0}")]
    WriteParams(String),
    #[error("{stage} stage could not start `{program}`: {source}")]
    Spawn {
        stage: Stage,
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{stage} stage failed (exit {status}): {stderr}")]
    StageFailed {
        stage: Stage,
        status: String,
        stderr: String,
    },
    #[error("{stage} stage timed out after {secs}s")]
    Timeout { stage: Stage, secs: u64 },
    #[error("calldata stage produced no output")]
    EmptyCalldata,
}

impl PipelineError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::InvalidInput(_) => None,
            PipelineError::WriteParams(_) => Some(Stage::WriteParams),
            PipelineError::Spawn { stage, .. }
            | PipelineError::StageFailed { stage, .. }
            | PipelineError::Timeout { stage, .. } => Some(*stage),
            PipelineError::EmptyCalldata => Some(Stage::Calldata),
        }
    }
}

/// External binaries
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub nargo: String,
    pub bb: String,
    pub garaga: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            nargo: "nargo".to_string(),
            bb: "bb".to_string(),
            garaga: "garaga".to_string(),
        }
    }
}

/// Per-stage wall-clock bounds
#[derive(Debug, Clone, Copy)]
pub struct StageTimeouts {
    pub witness: Duration,
    pub prove: Duration,
    pub verify: Duration,
    pub calldata: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            witness: Duration::from_secs(60),
            prove: Duration::from_secs(120),
            verify: Duration::from_secs(60),
            calldata: Duration::from_secs(60),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Noir project directory (holds `Prover.toml` and `target/`)
    pub circuit_dir: PathBuf,
    /// Circuit artifact name (`target/<name>.json`)
    pub circuit_name: String,
    pub toolchain: Toolchain,
    pub timeouts: StageTimeouts,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            circuit_dir: PathBuf::from("zk-badges/donation_badge"),
            circuit_name: "donation_badge".to_string(),
            toolchain: Toolchain::default(),
            timeouts: StageTimeouts::default(),
        }
    }
}

impl PipelineConfig {
    pub fn prover_toml(&self) -> PathBuf {
        self.circuit_dir.join("Prover.toml")
    }

    pub fn proof_path(&self) -> PathBuf {
        self.circuit_dir.join("target").join("proof.bin")
    }
}

/// Proof pipeline bound to one circuit directory
pub struct ProofPipeline {
    config: PipelineConfig,
    /// Held for a whole run; the parameter file is last-writer-wins
    run_lock: Mutex<()>,
}

impl ProofPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            run_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Whether a run currently holds the circuit directory
    pub fn is_busy(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Run all stages; never returns partial results
    #[instrument(skip(self, request), fields(circuit = %self.config.circuit_name))]
    pub async fn generate(&self, request: &ProofRequest) -> ProofResponse {
        let start = Instant::now();
        let result = self.run(request).await;
        let generation_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(calldata) => {
                info!(
                    generation_time_ms,
                    calldata_len = calldata.len(),
                    "Badge proof generated successfully"
                );
                ProofResponse::success(
                    calldata,
                    request.donation_commitment.clone(),
                    generation_time_ms,
                )
            }
            Err(e) => {
                error!(error = %e, stage = ?e.stage(), "Badge proof generation failed");
                ProofResponse::failure(
                    e.to_string(),
                    e.stage().map(|s| s.as_str().to_string()),
                    generation_time_ms,
                )
            }
        }
    }

    /// Stage sequence; returns calldata words
    pub async fn run(&self, request: &ProofRequest) -> Result<Vec<String>, PipelineError> {
        request.validate().map_err(PipelineError::InvalidInput)?;

        let _guard = self.run_lock.lock().await;
        let cfg = &self.config;
        let dir = cfg.circuit_dir.as_path();

        self.write_params(request).await?;

        self.run_stage(
            Stage::Witness,
            &cfg.toolchain.nargo,
            &["execute", "witness"],
            dir,
            cfg.timeouts.witness,
        )
        .await?;

        // A stale proof from an earlier run must never reach verify
        match tokio::fs::remove_file(cfg.proof_path()).await {
            Ok(()) => debug!("Removed stale proof"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, "Could not remove stale proof"),
        }

        let bytecode = format!("./target/{}.json", cfg.circuit_name);
        self.run_stage(
            Stage::Prove,
            &cfg.toolchain.bb,
            &[
                "prove",
                "-s",
                "ultra_honk",
                "--oracle_hash",
                "keccak",
                "-b",
                &bytecode,
                "-w",
                "./target/witness.gz",
                "-o",
                "./target/proof.bin",
            ],
            dir,
            cfg.timeouts.prove,
        )
        .await?;

        self.run_stage(
            Stage::Verify,
            &cfg.toolchain.bb,
            &[
                "verify",
                "-s",
                "ultra_honk",
                "--oracle_hash",
                "keccak",
                "-k",
                "./target/vk.bin",
                "-p",
                "./target/proof.bin",
            ],
            dir,
            cfg.timeouts.verify,
        )
        .await?;

        // Garaga runs from the parent directory, so it gets absolute paths
        let abs_dir = tokio::fs::canonicalize(dir)
            .await
            .map_err(|source| PipelineError::Spawn {
                stage: Stage::Calldata,
                program: cfg.toolchain.garaga.clone(),
                source,
            })?;
        let target = abs_dir.join("target");
        let vk = target.join("vk.bin").to_string_lossy().into_owned();
        let proof = target.join("proof.bin").to_string_lossy().into_owned();
        let calldata_cwd = abs_dir.parent().unwrap_or(abs_dir.as_path());
        let stdout = self
            .run_stage(
                Stage::Calldata,
                &cfg.toolchain.garaga,
                &[
                    "calldata",
                    "--system",
                    "ultra_keccak_honk",
                    "--vk",
                    &vk,
                    "--proof",
                    &proof,
                    "--format",
                    "starkli",
                ],
                calldata_cwd,
                cfg.timeouts.calldata,
            )
            .await?;

        let calldata = parse_calldata(&stdout);
        if calldata.is_empty() {
            return Err(PipelineError::EmptyCalldata);
        }
        Ok(calldata)
    }

    async fn write_params(&self, request: &ProofRequest) -> Result<(), PipelineError> {
        let contents =
            toml::to_string(request).map_err(|e| PipelineError::WriteParams(e.to_string()))?;
        let path = self.config.prover_toml();
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| PipelineError::WriteParams(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "Wrote Prover.toml");
        Ok(())
    }

    /// Run one external step, returning its stdout
    async fn run_stage(
        &self,
        stage: Stage,
        program: &str,
        args: &[&str],
        cwd: &Path,
        limit: Duration,
    ) -> Result<String, PipelineError> {
        info!(%stage, program, "Running stage");
        let start = Instant::now();

        let child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PipelineError::Spawn {
                stage,
                program: program.to_string(),
                source,
            })?;

        // On timeout the child is dropped and killed
        let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| PipelineError::Spawn {
                stage,
                program: program.to_string(),
                source,
            })?,
            Err(_) => {
                return Err(PipelineError::Timeout {
                    stage,
                    secs: limit.as_secs(),
                })
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        if !output.status.success() {
            let status = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(PipelineError::StageFailed {
                stage,
                status,
                stderr: excerpt(&output.stderr),
            });
        }

        info!(%stage, elapsed_ms, "Stage completed");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Whitespace-separated calldata words
pub fn parse_calldata(stdout: &str) -> Vec<String> {
    stdout.split_whitespace().map(str::to_string).collect()
}

fn excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= MAX_STDERR_LEN {
        return text.to_string();
    }
    let mut cut = text.len() - MAX_STDERR_LEN;
    while !text.is_char_boundary(cut) {
        cut += 1;
    }
    format!("...{}", &text[cut..])
}
