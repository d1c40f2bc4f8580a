//! Pipeline orchestration: gate the script, acquire test data, build, test.
//!
//! The three stages run strictly in sequence. A terminal build failure is
//! surfaced before any container run is attempted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, Instrument};

use crate::builder::ImageBuilder;
use crate::capability::{DocsSource, ImageTool, ModelCapability, OperatorPort};
use crate::config::JitConfig;
use crate::domain::{Result, ScriptUnit};
use crate::obs;
use crate::provider::{ReadmeExtractor, TestDataProvider};
use crate::reporting::PipelineReport;
use crate::runner::TestRunner;
use crate::security::SecurityGate;

pub struct Orchestrator {
    gate: Arc<SecurityGate>,
    provider: Arc<TestDataProvider>,
    builder: ImageBuilder,
    runner: TestRunner,
}

impl Orchestrator {
    pub fn new(
        config: &JitConfig,
        model: Arc<dyn ModelCapability>,
        tool: Arc<dyn ImageTool>,
        docs: Arc<dyn DocsSource>,
        operator: Arc<dyn OperatorPort>,
    ) -> Self {
        let gate = Arc::new(SecurityGate::new(config));
        Self::assemble(config, gate, model, tool, docs, operator)
    }

    /// Wire the pipeline with a `ReadmeExtractor` bound to `docs_path`.
    pub fn for_readme(
        config: &JitConfig,
        model: Arc<dyn ModelCapability>,
        tool: Arc<dyn ImageTool>,
        docs_path: impl Into<PathBuf>,
        operator: Arc<dyn OperatorPort>,
    ) -> Self {
        let gate = Arc::new(SecurityGate::new(config));
        let docs = Arc::new(ReadmeExtractor::new(docs_path, model.clone(), gate.clone()));
        Self::assemble(config, gate, model, tool, docs, operator)
    }

    fn assemble(
        config: &JitConfig,
        gate: Arc<SecurityGate>,
        model: Arc<dyn ModelCapability>,
        tool: Arc<dyn ImageTool>,
        docs: Arc<dyn DocsSource>,
        operator: Arc<dyn OperatorPort>,
    ) -> Self {
        let provider = Arc::new(TestDataProvider::new(model.clone(), docs, operator, gate.clone()));
        let builder = ImageBuilder::new(config, model.clone(), tool.clone(), gate.clone());
        let runner = TestRunner::new(config, model, tool, provider.clone(), gate.clone());
        Self {
            gate,
            provider,
            builder,
            runner,
        }
    }

    /// Create build contexts under `root` instead of the system temp dir.
    pub fn with_build_context_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.builder = self.builder.with_context_root(root);
        self
    }

    /// Run the whole pipeline for one script.
    ///
    /// A test whose output never matched is returned as a report with a
    /// failed outcome; only hard failures are errors.
    pub async fn run(&self, script: &ScriptUnit) -> Result<PipelineReport> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        obs::emit_pipeline_started(&run_id, &script.file_name);

        let result = self
            .execute(&run_id, script)
            .instrument(obs::pipeline_span(&run_id))
            .await;
        match result {
            Ok(report) => {
                obs::emit_pipeline_finished(&run_id, started.elapsed().as_millis() as u64, report.passed());
                Ok(report)
            }
            Err(err) => {
                obs::emit_pipeline_aborted(&run_id, &err);
                Err(err)
            }
        }
    }

    async fn execute(&self, run_id: &str, script: &ScriptUnit) -> Result<PipelineReport> {
        let started_at = Utc::now();
        let gated = self.gate.admit_script(script)?;

        let case = self.provider.acquire(&gated).await?;
        info!(provenance = %case.provenance(), "test case ready");

        let built = self.builder.build(script, &gated).await?;
        info!(image = %built.handle.name, attempts = built.attempts.len(), "image ready");

        let run = self.runner.run(&gated, &built.handle, case.clone()).await?;

        Ok(PipelineReport {
            run_id: run_id.to_string(),
            script: script.file_name.clone(),
            started_at,
            finished_at: Utc::now(),
            image: built.handle,
            dockerfile: built.dockerfile.content,
            build_attempts: built.attempts,
            initial_case: case,
            final_case: run.final_case,
            test_attempts: run.attempts,
            outcome: run.outcome,
        })
    }
}
