//! Domain models for Jit.
//!
//! Canonical definitions for the core entities:
//! - `ScriptUnit`: The script being containerized
//! - `TestCase`: An accepted (input, expected output) pair
//! - `DockerfileArtifact` / `ImageHandle`: Build artifacts

pub mod error;
pub mod image;
pub mod script;
pub mod test_case;

// Re-export main types and errors
pub use error::{CapabilityError, CapabilityResult, JitError, Result};
pub use image::{BuildOutput, DockerfileArtifact, ImageHandle};
pub use script::{GatedScript, ScriptUnit};
pub use test_case::{ExamplePair, Provenance, TestCase};
