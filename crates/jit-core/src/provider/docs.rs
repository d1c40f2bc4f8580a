//! Documentation-backed example source.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::docs_patterns;
use crate::capability::{DocsSource, ModelCapability};
use crate::domain::{CapabilityError, CapabilityResult, ExamplePair};
use crate::security::SecurityGate;

/// Extracts a usage example from a README bound at construction.
///
/// A deterministic pattern pass runs first; the model is only asked when
/// no pattern matches. Documentation text is sanitized before it reaches
/// the prompt.
pub struct ReadmeExtractor {
    path: PathBuf,
    model: Arc<dyn ModelCapability>,
    gate: Arc<SecurityGate>,
}

impl ReadmeExtractor {
    pub fn new(path: impl Into<PathBuf>, model: Arc<dyn ModelCapability>, gate: Arc<SecurityGate>) -> Self {
        Self {
            path: path.into(),
            model,
            gate,
        }
    }
}

#[async_trait]
impl DocsSource for ReadmeExtractor {
    async fn extract(&self) -> CapabilityResult<ExamplePair> {
        if !self.path.is_file() {
            return Err(CapabilityError::Unavailable(format!(
                "documentation not found: {}",
                self.path.display()
            )));
        }
        let docs = tokio::fs::read_to_string(&self.path).await?;
        if docs.trim().is_empty() {
            return Err(CapabilityError::Unavailable("documentation is empty".to_string()));
        }
        if self.gate.likely_prompt_injection(&docs) {
            return Err(CapabilityError::Unsafe(format!(
                "{} reads like a prompt injection",
                self.path.display()
            )));
        }

        if let Some(pair) = docs_patterns::first_example(&docs) {
            debug!(path = %self.path.display(), "example found by pattern pass");
            return Ok(pair);
        }

        let verdict = self.gate.sanitize_free_text(&docs);
        self.model.extract_example(&verdict.sanitized_text).await
    }
}
