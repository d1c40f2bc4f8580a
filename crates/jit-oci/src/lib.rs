//! Docker CLI adapter implementing [`jit_core::ImageTool`].
//!
//! Builds run `docker build -t <image> <context>`; runs use
//! `docker run --rm -i --name jit-<uuid> <image> <input>` with the input
//! also written to stdin. A run whose future is dropped before the client
//! exits gets its container force-removed. Arguments are passed as discrete argv entries, never through a
//! shell.

pub mod command;
pub mod docker;
pub mod error;

pub use command::DockerCommand;
pub use docker::DockerCli;
pub use error::{OciError, Result};
