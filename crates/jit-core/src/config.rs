//! Pipeline configuration.
//!
//! Defaults match the fixed retry budgets of the tool; every field can be
//! overridden through a `JIT_*` environment variable.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// How the script-content gate treats non-injection threats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptPolicy {
    /// Any detected threat in the script aborts the pipeline.
    Strict,
    /// Only a likely prompt injection aborts; other threats are logged.
    Warn,
}

impl std::str::FromStr for ScriptPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ScriptPolicy::Strict),
            "warn" => Ok(ScriptPolicy::Warn),
            other => Err(format!("unknown script policy: {other}")),
        }
    }
}

/// Configuration shared by every stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JitConfig {
    /// Build attempts including the first generated Dockerfile.
    pub max_build_attempts: u32,
    /// Container runs including the first one.
    pub max_test_attempts: u32,
    /// Longest text accepted by the sanitizer before truncation.
    pub max_input_len: usize,
    /// Fraction of injection classes above which text is a likely prompt injection.
    pub injection_threshold: f64,
    pub script_policy: ScriptPolicy,
    /// Deadline for one `docker build`.
    pub build_timeout_secs: u64,
    /// Deadline for one `docker run`.
    pub run_timeout_secs: u64,
}

impl Default for JitConfig {
    fn default() -> Self {
        Self {
            max_build_attempts: 3,
            max_test_attempts: 3,
            max_input_len: 10_000,
            injection_threshold: 0.3,
            script_policy: ScriptPolicy::Strict,
            build_timeout_secs: 600,
            run_timeout_secs: 120,
        }
    }
}

impl JitConfig {
    /// Defaults overlaid with `JIT_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    fn overlay<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        override_from(&lookup, "JIT_MAX_BUILD_ATTEMPTS", &mut self.max_build_attempts);
        override_from(&lookup, "JIT_MAX_TEST_ATTEMPTS", &mut self.max_test_attempts);
        override_from(&lookup, "JIT_MAX_INPUT_LEN", &mut self.max_input_len);
        override_from(&lookup, "JIT_SCRIPT_POLICY", &mut self.script_policy);
        override_from(&lookup, "JIT_BUILD_TIMEOUT_SECS", &mut self.build_timeout_secs);
        override_from(&lookup, "JIT_RUN_TIMEOUT_SECS", &mut self.run_timeout_secs);
        // A zero budget would skip the stage entirely.
        self.max_build_attempts = self.max_build_attempts.max(1);
        self.max_test_attempts = self.max_test_attempts.max(1);
        self
    }
}

fn override_from<T, F>(lookup: &F, key: &str, slot: &mut T)
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => *slot = value,
            Err(_) => warn!(key = %key, value = %raw, "ignoring unparsable configuration value"),
        }
    }
}
