//! Error types for the Docker adapter.

use jit_core::CapabilityError;

#[derive(Debug, thiserror::Error)]
pub enum OciError {
    #[error("failed to start `{binary}`: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} exited with code {exit_code}: {stderr}")]
    NonZeroExit {
        operation: &'static str,
        exit_code: i32,
        stderr: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OciError>;

impl From<OciError> for CapabilityError {
    fn from(err: OciError) -> Self {
        match err {
            OciError::Spawn { .. } => CapabilityError::Unavailable(err.to_string()),
            OciError::NonZeroExit {
                exit_code, stderr, ..
            } => CapabilityError::Process { exit_code, stderr },
            OciError::Io(io) => CapabilityError::Io(io),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_zero_exit_maps_to_process_error() {
        let err: CapabilityError = OciError::NonZeroExit {
            operation: "docker run",
            exit_code: 2,
            stderr: "IndexError".to_string(),
        }
        .into();
        assert!(matches!(err, CapabilityError::Process { exit_code: 2, .. }));
    }

    #[test]
    fn test_spawn_failure_maps_to_unavailable() {
        let err: CapabilityError = OciError::Spawn {
            binary: "docker".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        }
        .into();
        match err {
            CapabilityError::Unavailable(msg) => assert!(msg.contains("failed to start `docker`")),
            other => panic!("unexpected: {other}"),
        }
    }
}
