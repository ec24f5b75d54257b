//! Fake Noir / Barretenberg / Garaga toolchain for pipeline tests.
//!
//! Each binary is a small shell script in a temp directory. The circuit
//! directory gets a `target/` with a verification key, like a compiled
//! Noir project.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use proof_server::services::{PipelineConfig, StageTimeouts, Toolchain};
use proof_server::types::ProofRequest;
use tempfile::TempDir;

pub const NARGO_OK: &str = r#"[ -f Prover.toml ] || { echo "missing Prover.toml" >&2; exit 3; }
touch target/witness.gz"#;

pub const BB_OK: &str = r#"case "$1" in
  prove) echo proof-bytes > target/proof.bin ;;
  verify) [ -f target/proof.bin ] || { echo "proof not found" >&2; exit 1; } ;;
  *) exit 64 ;;
esac"#;

pub const BB_VERIFY_FAILS: &str = r#"case "$1" in
  prove) echo proof-bytes > target/proof.bin ;;
  verify) echo "Proof verification failed" >&2; exit 1 ;;
esac"#;

/// Prints calldata only when both absolute paths exist, and leaves a marker
pub const GARAGA_OK: &str = r#"touch garaga-ran
[ -f "$5" ] && [ -f "$7" ] || { echo "bad paths: $5 $7" >&2; exit 2; }
printf '0x1\n0x2a 0x3\n  0xdead\n'"#;

pub struct FakeToolchain {
    pub root: TempDir,
    pub circuit_dir: PathBuf,
    pub config: PipelineConfig,
}

impl FakeToolchain {
    pub fn new(nargo: &str, bb: &str, garaga: &str) -> Self {
        let root = TempDir::new().unwrap();
        let circuit_dir = root.path().join("donation_badge");
        fs::create_dir_all(circuit_dir.join("target")).unwrap();
        fs::write(circuit_dir.join("target/vk.bin"), b"vk-bytes").unwrap();
        fs::write(circuit_dir.join("target/donation_badge.json"), b"{}").unwrap();

        let bin = root.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        let toolchain = Toolchain {
            nargo: write_script(&bin, "nargo", nargo),
            bb: write_script(&bin, "bb", bb),
            garaga: write_script(&bin, "garaga", garaga),
        };

        let config = PipelineConfig {
            circuit_dir: circuit_dir.clone(),
            circuit_name: "donation_badge".to_string(),
            toolchain,
            timeouts: StageTimeouts {
                witness: Duration::from_secs(10),
                prove: Duration::from_secs(10),
                verify: Duration::from_secs(10),
                calldata: Duration::from_secs(10),
            },
        };

        Self {
            root,
            circuit_dir,
            config,
        }
    }

    pub fn working() -> Self {
        Self::new(NARGO_OK, BB_OK, GARAGA_OK)
    }

    pub fn garaga_ran(&self) -> bool {
        self.root.path().join("garaga-ran").exists()
    }

    pub fn proof_on_disk(&self) -> bool {
        self.circuit_dir.join("target/proof.bin").exists()
    }
}

fn write_script(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

pub fn sample_request() -> ProofRequest {
    ProofRequest {
        donation_amount: "250".into(),
        donor_secret: "12345".into(),
        threshold: "100".into(),
        badge_tier: "2".into(),
        donation_commitment: "998877".into(),
    }
}
