//! Scripted in-memory capabilities for headless pipeline tests.
//!
//! Each fake replays queued responses in order, falls back to a fixed
//! default when its queue is empty, and records every call.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::capability::{DocsSource, ImageTool, ModelCapability, OperatorPort};
use crate::domain::{
    BuildOutput, CapabilityError, CapabilityResult, ExamplePair, GatedScript, ImageHandle, TestCase,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn owned<T>(mutex: &mut Mutex<T>) -> &mut T {
    mutex.get_mut().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// ScriptedLlm
// ---------------------------------------------------------------------------

/// Call counts per model operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LlmCalls {
    pub generate_dockerfile: usize,
    pub repair_dockerfile: usize,
    pub extract_example: usize,
    pub validate_example: usize,
    pub synthesize_example: usize,
    pub reanalyze_example: usize,
}

#[derive(Debug, Default)]
struct LlmScript {
    dockerfiles: VecDeque<CapabilityResult<String>>,
    repairs: VecDeque<CapabilityResult<String>>,
    extractions: VecDeque<CapabilityResult<ExamplePair>>,
    validations: VecDeque<CapabilityResult<bool>>,
    syntheses: VecDeque<CapabilityResult<ExamplePair>>,
    reanalyses: VecDeque<CapabilityResult<ExamplePair>>,
    calls: LlmCalls,
    last_docs: Option<String>,
    last_repair: Option<(String, String)>,
    last_reanalysis_output: Option<String>,
}

/// Model fake.
///
/// Defaults: Dockerfiles are `FROM alpine:3.19`, validation accepts,
/// extraction, synthesis and reanalysis fail.
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    state: Mutex<LlmScript>,
}

impl ScriptedLlm {
    pub const DEFAULT_DOCKERFILE: &'static str = "FROM alpine:3.19\n";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dockerfile(mut self, response: CapabilityResult<String>) -> Self {
        owned(&mut self.state).dockerfiles.push_back(response);
        self
    }

    pub fn with_repair(mut self, response: CapabilityResult<String>) -> Self {
        owned(&mut self.state).repairs.push_back(response);
        self
    }

    pub fn with_extract(mut self, response: CapabilityResult<ExamplePair>) -> Self {
        owned(&mut self.state).extractions.push_back(response);
        self
    }

    pub fn with_validation(mut self, response: CapabilityResult<bool>) -> Self {
        owned(&mut self.state).validations.push_back(response);
        self
    }

    pub fn with_synthesis(mut self, response: CapabilityResult<ExamplePair>) -> Self {
        owned(&mut self.state).syntheses.push_back(response);
        self
    }

    pub fn with_reanalysis(mut self, response: CapabilityResult<ExamplePair>) -> Self {
        owned(&mut self.state).reanalyses.push_back(response);
        self
    }

    pub fn calls(&self) -> LlmCalls {
        lock(&self.state).calls
    }

    /// Documentation text passed to the last extraction.
    pub fn last_docs(&self) -> Option<String> {
        lock(&self.state).last_docs.clone()
    }

    /// `(previous_dockerfile, build_error)` of the last repair request.
    pub fn last_repair(&self) -> Option<(String, String)> {
        lock(&self.state).last_repair.clone()
    }

    pub fn last_reanalysis_output(&self) -> Option<String> {
        lock(&self.state).last_reanalysis_output.clone()
    }
}

#[async_trait]
impl ModelCapability for ScriptedLlm {
    async fn generate_dockerfile(&self, _script: &GatedScript) -> CapabilityResult<String> {
        let mut state = lock(&self.state);
        state.calls.generate_dockerfile += 1;
        state
            .dockerfiles
            .pop_front()
            .unwrap_or_else(|| Ok(Self::DEFAULT_DOCKERFILE.to_string()))
    }

    async fn repair_dockerfile(
        &self,
        _script: &GatedScript,
        previous_dockerfile: &str,
        build_error: &str,
    ) -> CapabilityResult<String> {
        let mut state = lock(&self.state);
        state.calls.repair_dockerfile += 1;
        state.last_repair = Some((previous_dockerfile.to_string(), build_error.to_string()));
        state
            .repairs
            .pop_front()
            .unwrap_or_else(|| Ok(Self::DEFAULT_DOCKERFILE.to_string()))
    }

    async fn extract_example(&self, docs: &str) -> CapabilityResult<ExamplePair> {
        let mut state = lock(&self.state);
        state.calls.extract_example += 1;
        state.last_docs = Some(docs.to_string());
        state
            .extractions
            .pop_front()
            .unwrap_or_else(|| Err(CapabilityError::Unavailable("no scripted extraction".into())))
    }

    async fn validate_example(&self, _script: &GatedScript, _candidate: &TestCase) -> CapabilityResult<bool> {
        let mut state = lock(&self.state);
        state.calls.validate_example += 1;
        state.validations.pop_front().unwrap_or(Ok(true))
    }

    async fn synthesize_example(&self, _script: &GatedScript) -> CapabilityResult<ExamplePair> {
        let mut state = lock(&self.state);
        state.calls.synthesize_example += 1;
        state
            .syntheses
            .pop_front()
            .unwrap_or_else(|| Err(CapabilityError::Model("no scripted synthesis".into())))
    }

    async fn reanalyze_example(
        &self,
        _script: &GatedScript,
        actual_output: &str,
        _current: &TestCase,
    ) -> CapabilityResult<ExamplePair> {
        let mut state = lock(&self.state);
        state.calls.reanalyze_example += 1;
        state.last_reanalysis_output = Some(actual_output.to_string());
        state
            .reanalyses
            .pop_front()
            .unwrap_or_else(|| Err(CapabilityError::Model("no scripted reanalysis".into())))
    }
}

// ---------------------------------------------------------------------------
// ScriptedImageTool
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ToolCalls {
    pub build: usize,
    pub run: usize,
}

/// What a build saw of its context directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextObservation {
    pub path: PathBuf,
    pub had_dockerfile: bool,
    /// Entries in the context's parent directory at build time.
    pub siblings: usize,
}

#[derive(Debug)]
enum BuildStep {
    Exit { code: i32, stderr: String },
    Error(String),
    Hang,
}

#[derive(Debug, Default)]
struct ToolScript {
    builds: VecDeque<BuildStep>,
    runs: VecDeque<CapabilityResult<String>>,
    calls: ToolCalls,
    dockerfiles: Vec<String>,
    contexts: Vec<ContextObservation>,
    run_inputs: Vec<String>,
}

/// Container fake. Builds succeed by default; runs fail until scripted.
#[derive(Debug, Default)]
pub struct ScriptedImageTool {
    state: Mutex<ToolScript>,
}

impl ScriptedImageTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_build_exit(mut self, code: i32, stderr: &str) -> Self {
        owned(&mut self.state).builds.push_back(BuildStep::Exit {
            code,
            stderr: stderr.to_string(),
        });
        self
    }

    /// The build tool itself fails, as when the daemon is unreachable.
    pub fn with_build_error(mut self, message: &str) -> Self {
        owned(&mut self.state)
            .builds
            .push_back(BuildStep::Error(message.to_string()));
        self
    }

    /// The build never completes.
    pub fn with_build_hang(mut self) -> Self {
        owned(&mut self.state).builds.push_back(BuildStep::Hang);
        self
    }

    pub fn with_run_output(mut self, response: CapabilityResult<String>) -> Self {
        owned(&mut self.state).runs.push_back(response);
        self
    }

    pub fn with_run_error(self, exit_code: i32, stderr: &str) -> Self {
        self.with_run_output(Err(CapabilityError::Process {
            exit_code,
            stderr: stderr.to_string(),
        }))
    }

    pub fn calls(&self) -> ToolCalls {
        lock(&self.state).calls
    }

    /// Dockerfile contents in build order.
    pub fn built_dockerfiles(&self) -> Vec<String> {
        lock(&self.state).dockerfiles.clone()
    }

    pub fn contexts(&self) -> Vec<ContextObservation> {
        lock(&self.state).contexts.clone()
    }

    /// Inputs passed to `run`, in order.
    pub fn run_inputs(&self) -> Vec<String> {
        lock(&self.state).run_inputs.clone()
    }
}

#[async_trait]
impl ImageTool for ScriptedImageTool {
    async fn build(&self, context: &Path, _image_name: &str) -> CapabilityResult<BuildOutput> {
        let step = {
            let mut state = lock(&self.state);
            state.calls.build += 1;
            let dockerfile = std::fs::read_to_string(context.join("Dockerfile")).ok();
            let siblings = context
                .parent()
                .and_then(|p| std::fs::read_dir(p).ok())
                .map(|entries| entries.count())
                .unwrap_or(0);
            state.contexts.push(ContextObservation {
                path: context.to_path_buf(),
                had_dockerfile: dockerfile.is_some(),
                siblings,
            });
            state.dockerfiles.push(dockerfile.unwrap_or_default());
            state.builds.pop_front().unwrap_or(BuildStep::Exit {
                code: 0,
                stderr: String::new(),
            })
        };
        match step {
            BuildStep::Exit { code, stderr } => Ok(BuildOutput {
                exit_code: code,
                stdout: String::new(),
                stderr,
            }),
            BuildStep::Error(message) => Err(CapabilityError::Unavailable(message)),
            BuildStep::Hang => std::future::pending().await,
        }
    }

    async fn run(&self, _image: &ImageHandle, input: &str) -> CapabilityResult<String> {
        let mut state = lock(&self.state);
        state.calls.run += 1;
        state.run_inputs.push(input.to_string());
        state
            .runs
            .pop_front()
            .unwrap_or_else(|| Err(CapabilityError::Unavailable("no scripted run".into())))
    }
}

// ---------------------------------------------------------------------------
// StaticDocs / ScriptedOperator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum DocsBehavior {
    Example(ExamplePair),
    Missing,
    Unsafe,
}

/// Documentation source with a fixed answer.
#[derive(Debug)]
pub struct StaticDocs {
    behavior: DocsBehavior,
}

impl StaticDocs {
    pub fn example(input: &str, expected_output: &str) -> Self {
        Self {
            behavior: DocsBehavior::Example(ExamplePair::new(input, expected_output)),
        }
    }

    /// Extraction fails as if the README were missing.
    pub fn failing() -> Self {
        Self {
            behavior: DocsBehavior::Missing,
        }
    }

    /// Extraction refuses the documentation as a prompt injection.
    pub fn unsafe_docs() -> Self {
        Self {
            behavior: DocsBehavior::Unsafe,
        }
    }
}

#[async_trait]
impl DocsSource for StaticDocs {
    async fn extract(&self) -> CapabilityResult<ExamplePair> {
        match &self.behavior {
            DocsBehavior::Example(pair) => Ok(pair.clone()),
            DocsBehavior::Missing => Err(CapabilityError::Unavailable("README not found".into())),
            DocsBehavior::Unsafe => Err(CapabilityError::Unsafe("README reads like a prompt injection".into())),
        }
    }
}

/// Operator that always gives the same answer.
#[derive(Debug)]
pub struct ScriptedOperator {
    answer: Option<ExamplePair>,
    asked: Mutex<usize>,
}

impl ScriptedOperator {
    pub fn declining() -> Self {
        Self {
            answer: None,
            asked: Mutex::new(0),
        }
    }

    pub fn entering(input: &str, expected_output: &str) -> Self {
        Self {
            answer: Some(ExamplePair::new(input, expected_output)),
            asked: Mutex::new(0),
        }
    }

    /// How many times manual entry was requested.
    pub fn asked(&self) -> usize {
        *lock(&self.asked)
    }
}

#[async_trait]
impl OperatorPort for ScriptedOperator {
    async fn manual_entry(&self) -> Option<ExamplePair> {
        *lock(&self.asked) += 1;
        self.answer.clone()
    }
}
