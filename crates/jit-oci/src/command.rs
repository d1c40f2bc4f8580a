//! Docker argument construction.

use std::path::Path;

/// A docker invocation as an argv vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerCommand {
    args: Vec<String>,
}

impl DockerCommand {
    /// `build -t <image> <context>`
    pub fn build(context: &Path, image_name: &str) -> Self {
        Self {
            args: vec![
                "build".to_string(),
                "-t".to_string(),
                image_name.to_string(),
                context.to_string_lossy().into_owned(),
            ],
        }
    }

    /// `run --rm -i --name <container> <image> <input>`; the input stays one argument.
    pub fn run(container_name: &str, image_name: &str, input: &str) -> Self {
        Self {
            args: vec![
                "run".to_string(),
                "--rm".to_string(),
                "-i".to_string(),
                "--name".to_string(),
                container_name.to_string(),
                image_name.to_string(),
                input.to_string(),
            ],
        }
    }

    /// `rm -f <container>`
    pub fn remove(container_name: &str) -> Self {
        Self {
            args: vec!["rm".to_string(), "-f".to_string(), container_name.to_string()],
        }
    }

    /// `version --format {{.Server.Version}}`
    pub fn server_version() -> Self {
        Self {
            args: vec![
                "version".to_string(),
                "--format".to_string(),
                "{{.Server.Version}}".to_string(),
            ],
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Subcommand name for log fields and error messages.
    pub fn operation(&self) -> &'static str {
        match self.args.first().map(String::as_str) {
            Some("build") => "docker build",
            Some("run") => "docker run",
            Some("version") => "docker version",
            Some("rm") => "docker rm",
            _ => "docker",
        }
    }
}
