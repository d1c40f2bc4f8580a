//! Model endpoint configuration.

use crate::error::{LlmError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    /// Base URL without the `/chat/completions` suffix.
    pub api_base: String,
    pub model: String,
    pub request_timeout_secs: u64,
    pub max_tokens: u32,
}

// Never print the key.
impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: 60,
            max_tokens: 1024,
        }
    }

    /// Read `OPENAI_API_KEY`, `OPENAI_API_BASE`, `JIT_MODEL` and
    /// `JIT_LLM_TIMEOUT_SECS` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or(LlmError::MissingApiKey)?;
        let mut config = Self::new(api_key.trim());

        if let Some(base) = lookup("OPENAI_API_BASE").filter(|b| !b.trim().is_empty()) {
            let base = base.trim().trim_end_matches('/');
            if !base.starts_with("http://") && !base.starts_with("https://") {
                return Err(LlmError::InvalidConfig(format!("OPENAI_API_BASE is not an http(s) URL: {base}")));
            }
            config.api_base = base.to_string();
        }
        if let Some(model) = lookup("JIT_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model.trim().to_string();
        }
        if let Some(raw) = lookup("JIT_LLM_TIMEOUT_SECS") {
            config.request_timeout_secs = raw
                .trim()
                .parse()
                .map_err(|_| LlmError::InvalidConfig(format!("JIT_LLM_TIMEOUT_SECS is not a number: {raw}")))?;
        }
        Ok(config)
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}
