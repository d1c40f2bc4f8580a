//! Test-data acquisition.
//!
//! Documentation first, then model synthesis, then manual entry. Every
//! candidate passes the security gate before it is accepted; a detected
//! threat aborts, a blank candidate moves on to the next source.

pub mod docs;
pub mod docs_patterns;

use std::sync::Arc;

use tracing::{info, warn};

use crate::capability::{DocsSource, ModelCapability, OperatorPort};
use crate::domain::{CapabilityError, ExamplePair, GatedScript, JitError, Provenance, Result, TestCase};
use crate::obs;
use crate::security::SecurityGate;

pub use docs::ReadmeExtractor;

/// Result of gating one candidate pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Accepted(TestCase),
    /// Not usable, but not hostile either (blank values).
    Rejected(String),
}

/// Produces the test case the container is verified against.
pub struct TestDataProvider {
    model: Arc<dyn ModelCapability>,
    docs: Arc<dyn DocsSource>,
    operator: Arc<dyn OperatorPort>,
    gate: Arc<SecurityGate>,
}

impl TestDataProvider {
    pub fn new(
        model: Arc<dyn ModelCapability>,
        docs: Arc<dyn DocsSource>,
        operator: Arc<dyn OperatorPort>,
        gate: Arc<SecurityGate>,
    ) -> Self {
        Self {
            model,
            docs,
            operator,
            gate,
        }
    }

    /// Run the docs → synthesis → manual chain.
    pub async fn acquire(&self, script: &GatedScript) -> Result<TestCase> {
        match self.docs.extract().await {
            Ok(pair) => match self.admit(pair, Provenance::Docs)? {
                Admission::Accepted(case) => match self.model.validate_example(script, &case).await {
                    Ok(true) => {
                        info!(provenance = %Provenance::Docs, "documentation example validated");
                        return Ok(case);
                    }
                    Ok(false) => info!("documentation example rejected by validation"),
                    Err(err) => warn!(error = %err, "example validation failed"),
                },
                Admission::Rejected(reason) => info!(reason = %reason, "documentation example unusable"),
            },
            Err(CapabilityError::Unsafe(reason)) => {
                return Err(JitError::SecurityViolation {
                    stage: "docs".to_string(),
                    threats: vec![reason],
                    likely_injection: true,
                });
            }
            Err(err) => info!(error = %err, "documentation extraction failed"),
        }

        match self.fallback(script).await {
            Ok(case) => Ok(case),
            Err(err) if err.is_security_violation() => Err(err),
            Err(err) => {
                warn!(error = %err, "fallback generation failed; asking for manual entry");
                self.manual().await
            }
        }
    }

    /// Synthesize a test case from the script alone.
    ///
    /// Also used by the test runner when a container run errors out and
    /// there is no output to reason from.
    pub async fn fallback(&self, script: &GatedScript) -> Result<TestCase> {
        let pair = self.model.synthesize_example(script).await?;
        match self.admit(pair, Provenance::Synthesized)? {
            Admission::Accepted(case) => Ok(case),
            Admission::Rejected(reason) => Err(JitError::TestDataUnavailable(format!(
                "synthesized example unusable: {reason}"
            ))),
        }
    }

    async fn manual(&self) -> Result<TestCase> {
        let Some(pair) = self.operator.manual_entry().await else {
            return Err(JitError::TestDataUnavailable(
                "test data generation failed and manual entry was declined".to_string(),
            ));
        };
        match self.admit(pair, Provenance::Manual)? {
            Admission::Accepted(case) => Ok(case),
            Admission::Rejected(_) => Err(JitError::TestDataUnavailable(
                "manual test data cannot be empty".to_string(),
            )),
        }
    }

    /// Gate a candidate pair.
    ///
    /// A likely prompt injection or any detected threat is a
    /// `SecurityViolation`, even when the other half is blank. A pair that
    /// is only blank is `Rejected`.
    pub fn admit(&self, pair: ExamplePair, provenance: Provenance) -> Result<Admission> {
        let likely_injection = self.gate.likely_prompt_injection(&pair.input)
            || self.gate.likely_prompt_injection(&pair.expected_output);
        let verdict = self.gate.sanitize_test_case(&pair.input, &pair.expected_output);
        let stage = format!("{provenance} test data");
        obs::emit_security_verdict(&stage, &verdict.input, likely_injection);
        obs::emit_security_verdict(&stage, &verdict.expected_output, likely_injection);

        if likely_injection {
            return Err(JitError::SecurityViolation {
                stage,
                threats: verdict.threats(),
                likely_injection,
            });
        }
        let threats = verdict.content_threats();
        if !threats.is_empty() {
            return Err(JitError::SecurityViolation {
                stage,
                threats,
                likely_injection,
            });
        }
        if verdict.is_blank() {
            return Ok(Admission::Rejected("input and expected output must be non-empty".to_string()));
        }
        for warning in verdict.warnings() {
            warn!(provenance = %provenance, warning = %warning, "test data warning");
        }

        let case = TestCase::accepted(
            verdict.input.sanitized_text,
            verdict.expected_output.sanitized_text,
            provenance,
        );
        obs::emit_test_case_accepted(
            &provenance.to_string(),
            case.input().len(),
            case.expected_output().len(),
        );
        Ok(Admission::Accepted(case))
    }
}
