//! Server Configuration
//!
//! Handles loading configuration from environment variables (and `.env`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::{PipelineConfig, StageTimeouts, Toolchain};

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Noir circuit project directory
    pub circuit_dir: PathBuf,

    /// Compiled circuit artifact name
    pub circuit_name: String,

    /// Toolchain binaries
    pub nargo_bin: String,
    pub bb_bin: String,
    pub garaga_bin: String,

    /// Stage timeouts in seconds
    pub witness_timeout_secs: u64,
    pub prove_timeout_secs: u64,
    pub verify_timeout_secs: u64,
    pub calldata_timeout_secs: u64,

    /// Log level
    pub log_level: String,

    /// Enable JSON logging
    pub json_logs: bool,

    /// CORS allowed origins
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_circuit_dir() -> PathBuf {
    PathBuf::from("zk-badges/donation_badge")
}

fn default_circuit_name() -> String {
    "donation_badge".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn env_secs(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        let timeouts = StageTimeouts::default();
        let toolchain = Toolchain::default();
        Self {
            host: default_host(),
            port: default_port(),
            circuit_dir: default_circuit_dir(),
            circuit_name: default_circuit_name(),
            nargo_bin: toolchain.nargo,
            bb_bin: toolchain.bb,
            garaga_bin: toolchain.garaga,
            witness_timeout_secs: timeouts.witness.as_secs(),
            prove_timeout_secs: timeouts.prove.as_secs(),
            verify_timeout_secs: timeouts.verify.as_secs(),
            calldata_timeout_secs: timeouts.calldata.as_secs(),
            log_level: default_log_level(),
            json_logs: false,
            cors_origins: default_cors_origins(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            circuit_dir: std::env::var("CIRCUIT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.circuit_dir),
            circuit_name: std::env::var("CIRCUIT_NAME").unwrap_or(defaults.circuit_name),
            nargo_bin: std::env::var("NARGO_BIN").unwrap_or(defaults.nargo_bin),
            bb_bin: std::env::var("BB_BIN").unwrap_or(defaults.bb_bin),
            garaga_bin: std::env::var("GARAGA_BIN").unwrap_or(defaults.garaga_bin),
            witness_timeout_secs: env_secs("WITNESS_TIMEOUT_SECS", defaults.witness_timeout_secs),
            prove_timeout_secs: env_secs("PROVE_TIMEOUT_SECS", defaults.prove_timeout_secs),
            verify_timeout_secs: env_secs("VERIFY_TIMEOUT_SECS", defaults.verify_timeout_secs),
            calldata_timeout_secs: env_secs(
                "CALLDATA_TIMEOUT_SECS",
                defaults.calldata_timeout_secs,
            ),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            json_logs: std::env::var("JSON_LOGS").unwrap_or_default() == "true",
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|o| o.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
        }
    }

    /// Pipeline settings derived from this configuration
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            circuit_dir: self.circuit_dir.clone(),
            circuit_name: self.circuit_name.clone(),
            toolchain: Toolchain {
                nargo: self.nargo_bin.clone(),
                bb: self.bb_bin.clone(),
                garaga: self.garaga_bin.clone(),
            },
            timeouts: StageTimeouts {
                witness: Duration::from_secs(self.witness_timeout_secs),
                prove: Duration::from_secs(self.prove_timeout_secs),
                verify: Duration::from_secs(self.verify_timeout_secs),
                calldata: Duration::from_secs(self.calldata_timeout_secs),
            },
        }
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {e}", self.host, self.port))
    }
}
