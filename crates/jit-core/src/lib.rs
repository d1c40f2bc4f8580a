//! Jit core: turn a standalone script into a verified container image.
//!
//! The pipeline gates the script, acquires a test case (documentation,
//! then model synthesis, then manual entry), builds an image with bounded
//! Dockerfile repair, and runs it with bounded test-data revision.
//! Model, container and operator access go through the traits in
//! [`capability`].

pub mod builder;
pub mod capability;
pub mod config;
pub mod domain;
pub mod fakes;
pub mod obs;
pub mod orchestrator;
pub mod provider;
pub mod reporting;
pub mod runner;
pub mod security;
pub mod telemetry;

pub use builder::{BuildAttempt, BuildContext, BuiltImage, ImageBuilder};
pub use capability::{DocsSource, ImageTool, ModelCapability, OperatorPort};
pub use config::{JitConfig, ScriptPolicy};
pub use domain::{
    BuildOutput, CapabilityError, CapabilityResult, DockerfileArtifact, ExamplePair, GatedScript,
    ImageHandle, JitError, Provenance, Result, ScriptUnit, TestCase,
};
pub use orchestrator::Orchestrator;
pub use provider::{Admission, ReadmeExtractor, TestDataProvider};
pub use reporting::{read_report, write_report, PipelineReport};
pub use runner::{outputs_match, TestAttempt, TestOutcome, TestRun, TestRunner};
pub use security::{SanitizationVerdict, SecurityGate, TestCaseVerdict};
pub use telemetry::{init_tracing, LogFormat};
