//! `DockerCli`: the production [`ImageTool`].

use std::path::Path;
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use jit_core::{BuildOutput, CapabilityResult, ImageHandle, ImageTool};

use crate::command::DockerCommand;
use crate::error::{OciError, Result};

/// Drives the `docker` binary found on `PATH`.
///
/// Children are killed when their future is dropped. Killing the client
/// does not stop a container, so runs are named and a dropped run issues
/// `docker rm -f` for its container.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }

    /// Use another docker-compatible binary (`podman`, a wrapper script).
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Daemon version, or an error when the daemon is unreachable.
    pub async fn server_version(&self) -> Result<String> {
        let cmd = DockerCommand::server_version();
        let output = self.output(&cmd, None).await?;
        if !output.status.success() {
            return Err(non_zero(&cmd, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub async fn build_image(&self, context: &Path, image_name: &str) -> Result<BuildOutput> {
        let cmd = DockerCommand::build(context, image_name);
        info!(image = %image_name, context = %context.display(), "docker build");
        let output = self.output(&cmd, None).await?;
        Ok(BuildOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    pub async fn run_image(&self, image_name: &str, input: &str) -> Result<String> {
        let container = format!("jit-{}", uuid::Uuid::new_v4().simple());
        let cmd = DockerCommand::run(&container, image_name, input);
        debug!(image = %image_name, container = %container, input_len = input.len(), "docker run");

        let guard = ContainerGuard::new(&self.binary, &container);
        let output = self.output(&cmd, Some(input)).await;
        guard.disarm();
        let output = output?;
        if !output.status.success() {
            return Err(non_zero(&cmd, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Force-remove a container by name.
    pub async fn remove_container(&self, container_name: &str) -> Result<()> {
        let cmd = DockerCommand::remove(container_name);
        let output = self.output(&cmd, None).await?;
        if !output.status.success() {
            return Err(non_zero(&cmd, &output));
        }
        Ok(())
    }

    /// Spawn, feed stdin if any, and collect both output streams.
    ///
    /// stdin is written and closed while stdout and stderr are drained, so
    /// a chatty container cannot fill a pipe and stall.
    async fn output(&self, cmd: &DockerCommand, stdin: Option<&str>) -> Result<Output> {
        let mut child = Command::new(&self.binary)
            .args(cmd.args())
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| OciError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        let pipe = child.stdin.take();
        let feed = async move {
            if let (Some(mut pipe), Some(text)) = (pipe, stdin) {
                // The program may exit without reading stdin.
                if let Err(err) = pipe.write_all(text.as_bytes()).await {
                    debug!(error = %err, "stdin not consumed");
                }
                let _ = pipe.shutdown().await;
            }
        };

        let ((), output) = tokio::join!(feed, child.wait_with_output());
        Ok(output?)
    }
}

/// Removes a run's container if the run future is dropped before the
/// client process exits (deadline, cancellation, panic).
struct ContainerGuard {
    cli: Option<DockerCli>,
    container: String,
}

impl ContainerGuard {
    fn new(binary: &str, container: &str) -> Self {
        Self {
            cli: Some(DockerCli::with_binary(binary)),
            container: container.to_string(),
        }
    }

    /// The client exited on its own; `--rm` takes care of the container.
    fn disarm(mut self) {
        self.cli = None;
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        let Some(cli) = self.cli.take() else {
            return;
        };
        let container = std::mem::take(&mut self.container);
        warn!(container = %container, "run abandoned; removing container");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = cli.remove_container(&container).await {
                        warn!(container = %container, error = %err, "container removal failed");
                    }
                });
            }
            Err(_) => {
                let spawned = std::process::Command::new(&cli.binary)
                    .args(DockerCommand::remove(&container).args())
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn();
                if let Err(err) = spawned {
                    warn!(container = %container, error = %err, "container removal failed");
                }
            }
        }
    }
}

fn non_zero(cmd: &DockerCommand, output: &Output) -> OciError {
    OciError::NonZeroExit {
        operation: cmd.operation(),
        exit_code: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

#[async_trait]
impl ImageTool for DockerCli {
    async fn build(&self, context: &Path, image_name: &str) -> CapabilityResult<BuildOutput> {
        Ok(self.build_image(context, image_name).await?)
    }

    async fn run(&self, image: &ImageHandle, input: &str) -> CapabilityResult<String> {
        Ok(self.run_image(&image.name, input).await?)
    }
}
