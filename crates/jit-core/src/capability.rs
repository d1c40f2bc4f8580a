//! Contracts for the external collaborators the pipeline drives.
//!
//! The core never talks to a model, a container runtime or a terminal
//! directly; it goes through these traits. Production adapters live in
//! `jit-llm` and `jit-oci`; scripted fakes live in [`crate::fakes`].

use std::path::Path;

use async_trait::async_trait;

use crate::domain::{BuildOutput, CapabilityResult, ExamplePair, GatedScript, ImageHandle, TestCase};

/// Language-model operations. All calls are single-shot.
#[async_trait]
pub trait ModelCapability: Send + Sync {
    /// Draft a Dockerfile for the script.
    async fn generate_dockerfile(&self, script: &GatedScript) -> CapabilityResult<String>;

    /// Patch a Dockerfile whose build failed.
    async fn repair_dockerfile(
        &self,
        script: &GatedScript,
        previous_dockerfile: &str,
        build_error: &str,
    ) -> CapabilityResult<String>;

    /// Pull a usage example out of documentation text.
    async fn extract_example(&self, docs: &str) -> CapabilityResult<ExamplePair>;

    /// Judge whether a candidate test case is plausible for the script.
    async fn validate_example(&self, script: &GatedScript, candidate: &TestCase) -> CapabilityResult<bool>;

    /// Invent a test case from the script alone.
    async fn synthesize_example(&self, script: &GatedScript) -> CapabilityResult<ExamplePair>;

    /// Re-derive a test case from what the container actually printed.
    async fn reanalyze_example(
        &self,
        script: &GatedScript,
        actual_output: &str,
        current: &TestCase,
    ) -> CapabilityResult<ExamplePair>;
}

/// Container build and run.
#[async_trait]
pub trait ImageTool: Send + Sync {
    /// Build the context directory into `image_name`. A non-zero exit is
    /// reported in the `BuildOutput`, not as an error.
    async fn build(&self, context: &Path, image_name: &str) -> CapabilityResult<BuildOutput>;

    /// Run the image with `input` as its argument and return trimmed stdout.
    /// A non-zero exit is an error carrying stderr.
    async fn run(&self, image: &ImageHandle, input: &str) -> CapabilityResult<String>;
}

/// A documentation source bound at construction.
#[async_trait]
pub trait DocsSource: Send + Sync {
    async fn extract(&self) -> CapabilityResult<ExamplePair>;
}

/// Last-resort manual entry. `None` means the operator declined.
#[async_trait]
pub trait OperatorPort: Send + Sync {
    async fn manual_entry(&self) -> Option<ExamplePair>;
}
