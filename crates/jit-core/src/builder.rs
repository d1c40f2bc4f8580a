//! Image build with bounded Dockerfile repair.
//!
//! Attempt 0 builds a generated Dockerfile. Every later attempt builds a
//! repaired one, produced from the previous draft and its build error.
//! Each attempt gets its own disposable build context.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing::{info, warn};

use crate::capability::{ImageTool, ModelCapability};
use crate::config::JitConfig;
use crate::domain::{
    BuildOutput, CapabilityError, DockerfileArtifact, GatedScript, ImageHandle, JitError, Result,
    ScriptUnit,
};
use crate::obs;
use crate::security::SecurityGate;

/// Longest build error kept in an attempt record.
const ERROR_EXCERPT_CHARS: usize = 2_000;

/// Temporary directory holding `Dockerfile` and a copy of the script.
///
/// The directory is removed when the context is dropped, on every exit path.
#[derive(Debug)]
pub struct BuildContext {
    dir: TempDir,
}

impl BuildContext {
    pub async fn create(root: Option<&Path>, script: &ScriptUnit, dockerfile: &str) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("jit-build-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        tokio::fs::write(dir.path().join("Dockerfile"), dockerfile).await?;
        tokio::fs::write(dir.path().join(&script.file_name), &script.content).await?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Record of one build attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildAttempt {
    pub attempt: u32,
    pub image_name: String,
    /// `None` when the build tool itself failed (timeout, missing binary).
    pub exit_code: Option<i32>,
    pub error_excerpt: Option<String>,
    /// Whether a repaired Dockerfile was requested after this attempt.
    pub repair_followed: bool,
}

/// A successfully built image and how it was reached.
#[derive(Debug, Clone)]
pub struct BuiltImage {
    pub handle: ImageHandle,
    pub dockerfile: DockerfileArtifact,
    pub attempts: Vec<BuildAttempt>,
}

pub struct ImageBuilder {
    model: Arc<dyn ModelCapability>,
    tool: Arc<dyn ImageTool>,
    gate: Arc<SecurityGate>,
    max_attempts: u32,
    build_timeout: Duration,
    context_root: Option<PathBuf>,
}

impl ImageBuilder {
    pub fn new(
        config: &JitConfig,
        model: Arc<dyn ModelCapability>,
        tool: Arc<dyn ImageTool>,
        gate: Arc<SecurityGate>,
    ) -> Self {
        Self {
            model,
            tool,
            gate,
            max_attempts: config.max_build_attempts.max(1),
            build_timeout: Duration::from_secs(config.build_timeout_secs),
            context_root: None,
        }
    }

    /// Create build contexts under `root` instead of the system temp dir.
    pub fn with_context_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.context_root = Some(root.into());
        self
    }

    /// Build the script into an image, repairing the Dockerfile on failure.
    pub async fn build(&self, script: &ScriptUnit, gated: &GatedScript) -> Result<BuiltImage> {
        let generated = self
            .model
            .generate_dockerfile(gated)
            .await
            .map_err(|err| JitError::BuildFailure {
                attempts: 0,
                last_error: format!("dockerfile generation failed: {err}"),
            })?;
        let mut dockerfile = DockerfileArtifact::initial(generated);
        let mut attempts = Vec::new();

        loop {
            let image_name = ImageHandle::name_for(script.stem(), Local::now());
            let attempt = dockerfile.attempt_index;
            info!(attempt, image = %image_name, "building image");

            let (exit_code, error_text) = match self.attempt(script, &dockerfile, &image_name).await? {
                Ok(output) if output.succeeded() => {
                    obs::emit_build_attempt(attempt, &image_name, output.exit_code);
                    attempts.push(BuildAttempt {
                        attempt,
                        image_name: image_name.clone(),
                        exit_code: Some(output.exit_code),
                        error_excerpt: None,
                        repair_followed: false,
                    });
                    return Ok(BuiltImage {
                        handle: ImageHandle::new(image_name),
                        dockerfile,
                        attempts,
                    });
                }
                Ok(output) => {
                    obs::emit_build_attempt(attempt, &image_name, output.exit_code);
                    (Some(output.exit_code), output.failure_text())
                }
                Err(err) => {
                    warn!(attempt, error = %err, "build tool failed");
                    (None, err.to_string())
                }
            };

            let used = attempt + 1;
            let exhausted = used >= self.max_attempts;
            attempts.push(BuildAttempt {
                attempt,
                image_name,
                exit_code,
                error_excerpt: Some(tail(&error_text, ERROR_EXCERPT_CHARS)),
                repair_followed: !exhausted,
            });
            if exhausted {
                return Err(JitError::BuildFailure {
                    attempts: used,
                    last_error: tail(&error_text, ERROR_EXCERPT_CHARS),
                });
            }

            let build_error = self
                .gate
                .screen("build error", &tail(&error_text, self.gate.max_input_len()))?;
            let previous = self.gate.screen("previous dockerfile", &dockerfile.content)?;
            let repaired = self
                .model
                .repair_dockerfile(gated, &previous, &build_error)
                .await
                .map_err(|err| JitError::BuildFailure {
                    attempts: used,
                    last_error: format!("dockerfile repair failed: {err}"),
                })?;
            dockerfile = DockerfileArtifact::repaired(repaired, used, error_text);
        }
    }

    /// One build inside a fresh context. The outer error is for local I/O
    /// failures; the inner one is a failed build tool call.
    async fn attempt(
        &self,
        script: &ScriptUnit,
        dockerfile: &DockerfileArtifact,
        image_name: &str,
    ) -> Result<std::result::Result<BuildOutput, CapabilityError>> {
        let context = BuildContext::create(self.context_root.as_deref(), script, &dockerfile.content).await?;
        let result = match tokio::time::timeout(self.build_timeout, self.tool.build(context.path(), image_name)).await {
            Ok(result) => result,
            Err(_) => Err(CapabilityError::Timeout {
                operation: "image build".to_string(),
                secs: self.build_timeout.as_secs(),
            }),
        };
        drop(context);
        Ok(result)
    }
}

/// Last `max` characters of `text`; build errors put the cause at the end.
fn tail(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        text.to_string()
    } else {
        text.chars().skip(count - max).collect()
    }
}
