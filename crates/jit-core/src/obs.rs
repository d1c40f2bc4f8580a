//! Structured observability hooks for pipeline lifecycle events.
//!
//! - A run-scoped tracing span to instrument a pipeline future with
//! - Emission functions for lifecycle events: start, finish, build and
//!   test attempts, security verdicts
//!
//! Events are emitted at `info!` level unless they signal a problem.

use tracing::{info, warn};

use crate::security::SanitizationVerdict;

/// Span tagged with `run_id` for everything one pipeline run logs.
///
/// ```ignore
/// pipeline.execute(script).instrument(pipeline_span(&run_id)).await
/// ```
pub fn pipeline_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("jit.pipeline", run_id = %run_id)
}

pub fn emit_pipeline_started(run_id: &str, script: &str) {
    info!(event = "pipeline.started", run_id = %run_id, script = %script);
}

/// Emit event: pipeline finished with duration and verdict.
pub fn emit_pipeline_finished(run_id: &str, duration_ms: u64, passed: bool) {
    info!(
        event = "pipeline.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        passed = passed,
    );
}

/// Emit event: a pipeline aborted with a hard failure.
pub fn emit_pipeline_aborted(run_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "pipeline.aborted", run_id = %run_id, error = %error);
}

pub fn emit_test_case_accepted(provenance: &str, input_len: usize, expected_len: usize) {
    info!(
        event = "test_case.accepted",
        provenance = %provenance,
        input_len = input_len,
        expected_len = expected_len,
    );
}

/// Emit event: one build attempt finished.
pub fn emit_build_attempt(attempt: u32, image: &str, exit_code: i32) {
    if exit_code == 0 {
        info!(event = "build.attempt", attempt = attempt, image = %image, exit_code = exit_code);
    } else {
        warn!(event = "build.attempt", attempt = attempt, image = %image, exit_code = exit_code);
    }
}

/// Emit event: one container run finished.
pub fn emit_test_attempt(attempt: u32, matched: bool, errored: bool) {
    info!(
        event = "test.attempt",
        attempt = attempt,
        matched = matched,
        errored = errored,
    );
}

/// Emit event: a verdict from the security gate. Clean verdicts log at debug level.
pub fn emit_security_verdict(stage: &str, verdict: &SanitizationVerdict, likely_injection: bool) {
    if verdict.is_valid && !likely_injection {
        tracing::debug!(event = "security.verdict", stage = %stage, warnings = verdict.warnings.len());
    } else {
        warn!(
            event = "security.verdict",
            stage = %stage,
            threats = verdict.detected_threats.len(),
            warnings = verdict.warnings.len(),
            likely_injection = likely_injection,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_span_create() {
        let _entered = pipeline_span("test-run-id").entered();
        emit_pipeline_started("test-run-id", "a.py");
        emit_build_attempt(0, "script-a-20240101-000000", 1);
    }
}
