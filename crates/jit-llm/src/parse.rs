//! Turning free-form model replies into typed values.

use serde::de::DeserializeOwned;

use crate::error::{LlmError, Result};

/// Body of a fenced code block, if the reply is one.
pub fn strip_markdown_fences(content: &str) -> Option<String> {
    let trimmed = content.trim();
    let without_open = trimmed.strip_prefix("```")?;
    let after_header = match without_open.find('\n') {
        Some(idx) => &without_open[idx + 1..],
        None => without_open,
    };
    let end = after_header.rfind("```")?;
    Some(after_header[..end].trim().to_string())
}

/// First balanced `{...}` object in `content`, ignoring braces in strings.
fn first_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in content[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a JSON reply, tolerating code fences and surrounding prose.
pub fn parse_structured<T: DeserializeOwned>(content: &str) -> Result<T> {
    let mut candidates = vec![content.trim().to_string()];
    if let Some(stripped) = strip_markdown_fences(content) {
        candidates.push(stripped);
    }
    if let Some(object) = first_json_object(content) {
        candidates.push(object.to_string());
    }

    let mut last_err = None;
    for candidate in &candidates {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => return Ok(value),
            Err(err) => last_err = Some(err.to_string()),
        }
    }
    Err(LlmError::Parse(
        last_err.unwrap_or_else(|| "empty response".to_string()),
    ))
}

#[derive(serde::Deserialize)]
struct Verdict {
    #[serde(alias = "isValid", alias = "is_valid")]
    valid: bool,
}

/// Read a yes/no judgement: `{"valid": true}`, `true`, `yes`, `no`.
pub fn parse_verdict(content: &str) -> Result<bool> {
    if let Ok(verdict) = parse_structured::<Verdict>(content) {
        return Ok(verdict.valid);
    }
    let body = strip_markdown_fences(content).unwrap_or_else(|| content.trim().to_string());
    let word: String = body
        .trim()
        .trim_end_matches(['.', '!'])
        .to_ascii_lowercase();
    match word.as_str() {
        "true" | "yes" | "valid" => Ok(true),
        "false" | "no" | "invalid" => Ok(false),
        _ => Err(LlmError::Parse(format!("expected a yes/no verdict, got {} chars", body.len()))),
    }
}

/// Dockerfile text from a reply; it must contain a `FROM` instruction.
pub fn parse_dockerfile(content: &str) -> Result<String> {
    let body = strip_markdown_fences(content).unwrap_or_else(|| content.trim().to_string());
    let has_from = body
        .lines()
        .any(|line| line.trim_start().to_ascii_uppercase().starts_with("FROM "));
    if !has_from {
        return Err(LlmError::Parse("reply contains no FROM instruction".to_string()));
    }
    Ok(format!("{}\n", body.trim_end()))
}
