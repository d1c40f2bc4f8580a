//! Pipeline run reports and their on-disk artifacts.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::builder::BuildAttempt;
use crate::domain::{ImageHandle, JitError, Result, TestCase};
use crate::runner::{TestAttempt, TestOutcome};

/// Everything a finished pipeline run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: String,
    pub script: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub image: ImageHandle,
    pub dockerfile: String,
    pub build_attempts: Vec<BuildAttempt>,
    pub initial_case: TestCase,
    pub final_case: TestCase,
    pub test_attempts: Vec<TestAttempt>,
    pub outcome: TestOutcome,
}

impl PipelineReport {
    pub fn passed(&self) -> bool {
        self.outcome.passed()
    }

    /// Multi-line human summary for the terminal.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("script:     {}", self.script),
            format!(
                "image:      {} ({} build attempt(s))",
                self.image.name,
                self.build_attempts.len()
            ),
            format!(
                "test case:  {:?} -> {:?} [{}]",
                self.final_case.input(),
                self.final_case.expected_output(),
                self.final_case.provenance()
            ),
        ];
        match &self.outcome {
            TestOutcome::Passed {
                attempts,
                actual_output,
            } => {
                lines.push(format!("result:     PASSED after {attempts} run(s)"));
                lines.push(format!("output:     {actual_output:?}"));
            }
            TestOutcome::Failed {
                attempts,
                actual_output,
                expected_output,
            } => {
                lines.push(format!("result:     FAILED after {attempts} run(s)"));
                lines.push(format!("expected:   {expected_output:?}"));
                lines.push(format!("actual:     {actual_output:?}"));
            }
        }
        lines.join("\n")
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Persist `<dir>/<run_id>/report.json` and its SHA-256 digest.
pub fn write_report(report: &PipelineReport, dir: &Path) -> Result<PathBuf> {
    let run_dir = dir.join(&report.run_id);
    std::fs::create_dir_all(&run_dir)?;

    let report_path = run_dir.join("report.json");
    let digest_path = run_dir.join("report.digest");
    let json = serde_json::to_vec_pretty(report)?;

    std::fs::write(&report_path, &json)?;
    std::fs::write(&digest_path, sha256_hex(&json).as_bytes())?;

    Ok(report_path)
}

/// Read `<dir>/<run_id>/report.json` and verify it against its digest.
pub fn read_report(run_id: &str, dir: &Path) -> Result<PipelineReport> {
    let run_dir = dir.join(run_id);
    let json = std::fs::read(run_dir.join("report.json"))?;
    let digest = std::fs::read_to_string(run_dir.join("report.digest"))?;
    let actual = sha256_hex(&json);
    if digest.trim() != actual {
        return Err(JitError::DigestMismatch {
            expected: digest.trim().to_string(),
            actual,
        });
    }

    Ok(serde_json::from_slice(&json)?)
}
