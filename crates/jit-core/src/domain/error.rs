//! Error taxonomy for Jit.
//!
//! `JitError` is what the pipeline surfaces. `CapabilityError` is what the
//! external collaborators (model, docker, documentation, operator) report.

/// Failures reported by an external capability.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("model request failed: {0}")]
    Model(String),

    #[error("unparsable capability response: {0}")]
    Parse(String),

    #[error("process exited with code {exit_code}: {stderr}")]
    Process { exit_code: i32, stderr: String },

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The capability refused to forward content that looks like a prompt injection.
    #[error("unsafe content rejected: {0}")]
    Unsafe(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for capability calls.
pub type CapabilityResult<T> = std::result::Result<T, CapabilityError>;

/// Pipeline errors. Every variant is a hard failure; a test whose output
/// never matched is reported through `TestOutcome::Failed` instead.
#[derive(Debug, thiserror::Error)]
pub enum JitError {
    #[error("invalid input: {0}")]
    UserInput(String),

    #[error("security violation in {stage}: {}", .threats.join("; "))]
    SecurityViolation {
        stage: String,
        threats: Vec<String>,
        likely_injection: bool,
    },

    #[error("capability error: {0}")]
    Capability(#[from] CapabilityError),

    #[error("image build failed after {attempts} attempt(s): {last_error}")]
    BuildFailure { attempts: u32, last_error: String },

    #[error("test execution failed after {attempts} attempt(s): {last_error}")]
    ExecutionFailure { attempts: u32, last_error: String },

    #[error("no test data available: {0}")]
    TestDataUnavailable(String),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl JitError {
    /// Whether this error came from the security gate.
    pub fn is_security_violation(&self) -> bool {
        matches!(self, JitError::SecurityViolation { .. })
    }
}

/// Result type for Jit pipeline operations.
pub type Result<T> = std::result::Result<T, JitError>;
