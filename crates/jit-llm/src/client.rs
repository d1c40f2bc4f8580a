//! Minimal chat-completions client with bounded retry.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::error::{LlmError, Result};

/// Retries after the first request, for rate limits, 5xx and network errors.
const MAX_RETRIES: u32 = 2;
const INITIAL_BACKOFF_MS: u64 = 1_000;
/// Longest slice of a provider error body kept in an error message.
const MAX_ERROR_CONTENT_LEN: usize = 200;

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Truncate and redact a provider body before it goes into an error.
pub(crate) fn sanitize_api_response(content: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &["api_key", "apikey", "secret", "password", "bearer", "sk-"];

    let truncated: String = content.chars().take(MAX_ERROR_CONTENT_LEN).collect();
    let lower = truncated.to_lowercase();
    if SECRET_PATTERNS.iter().any(|p| lower.contains(p)) {
        return "(response details redacted - may contain sensitive data)".to_string();
    }
    truncated
}

fn backoff(retry: u32) -> Duration {
    Duration::from_millis(INITIAL_BACKOFF_MS.saturating_mul(2u64.saturating_pow(retry.saturating_sub(1))))
}

pub(crate) fn build_request<'a>(config: &'a LlmConfig, system: &'a str, user: &'a str, json_mode: bool) -> ChatRequest<'a> {
    ChatRequest {
        model: &config.model,
        messages: vec![
            Message {
                role: "system",
                content: system,
            },
            Message {
                role: "user",
                content: user,
            },
        ],
        max_tokens: config.max_tokens,
        temperature: 0.0,
        response_format: json_mode.then_some(ResponseFormat {
            format_type: "json_object",
        }),
    }
}

/// Pull the assistant text out of a response body.
pub(crate) fn response_content(body: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::Parse(format!("{e}: {}", sanitize_api_response(body))))?;
    let message = parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or(LlmError::EmptyResponse)?;
    if let Some(refusal) = message.refusal {
        return Err(LlmError::Refused(sanitize_api_response(&refusal)));
    }
    match message.content {
        Some(content) if !content.trim().is_empty() => Ok(content),
        _ => Err(LlmError::EmptyResponse),
    }
}

/// One system + user exchange per call; no conversation state.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl ChatClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    pub async fn complete(&self, system: &str, user: &str, json_mode: bool) -> Result<String> {
        let request = build_request(&self.config, system, user, json_mode);
        let url = self.config.completions_url();
        let mut retry = 0u32;

        loop {
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(&request)
                .send()
                .await;

            let response = match response {
                Ok(response) => response,
                Err(err) if (err.is_timeout() || err.is_connect()) && retry < MAX_RETRIES => {
                    retry += 1;
                    warn!(retry, error = %err, "model request failed; retrying");
                    tokio::time::sleep(backoff(retry)).await;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let status = response.status();
            let body = response.text().await?;
            if status.is_success() {
                debug!(model = %self.config.model, bytes = body.len(), "model response");
                return response_content(&body);
            }

            let retryable = status.as_u16() == 429 || status.is_server_error();
            if retryable && retry < MAX_RETRIES {
                retry += 1;
                warn!(retry, status = status.as_u16(), "model request rejected; retrying");
                tokio::time::sleep(backoff(retry)).await;
                continue;
            }
            if status.as_u16() == 429 {
                return Err(LlmError::RateLimited { retries: retry });
            }
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: match status.as_u16() {
                    401 => "invalid API key".to_string(),
                    _ => sanitize_api_response(&body),
                },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let config = LlmConfig::new("sk-test");
        let request = build_request(&config, "sys", "usr", true);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "usr");
        assert_eq!(json["response_format"]["type"], "json_object");

        let plain = serde_json::to_value(build_request(&config, "s", "u", false)).unwrap();
        assert!(plain.get("response_format").is_none());
    }

    #[test]
    fn test_response_content() {
        let body = r#"{"choices":[{"message":{"content":"FROM alpine"}}]}"#;
        assert_eq!(response_content(body).unwrap(), "FROM alpine");

        let empty = r#"{"choices":[{"message":{"content":null}}]}"#;
        assert!(matches!(response_content(empty), Err(LlmError::EmptyResponse)));

        let refused = r#"{"choices":[{"message":{"content":null,"refusal":"no"}}]}"#;
        assert!(matches!(response_content(refused), Err(LlmError::Refused(_))));

        assert!(matches!(response_content("not json"), Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_sanitize_redacts_secrets() {
        assert_eq!(sanitize_api_response("plain failure"), "plain failure");
        assert!(sanitize_api_response("Incorrect API key sk-abc").contains("redacted"));
        assert_eq!(sanitize_api_response(&"x".repeat(500)).len(), MAX_ERROR_CONTENT_LEN);
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff(1), Duration::from_millis(1_000));
        assert_eq!(backoff(2), Duration::from_millis(2_000));
    }
}
