//! Error types for the model adapter.

use jit_core::CapabilityError;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("request was refused: {0}")]
    Refused(String),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("unparsable model response: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;

impl From<LlmError> for CapabilityError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Parse(msg) => CapabilityError::Parse(msg),
            LlmError::Http(e) if e.is_timeout() => CapabilityError::Model(format!("request timed out: {e}")),
            other => CapabilityError::Model(other.to_string()),
        }
    }
}
