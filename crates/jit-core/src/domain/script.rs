//! The script being containerized.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{JitError, Result};

/// A script loaded from disk. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptUnit {
    /// Path the script was loaded from.
    pub path: PathBuf,

    /// Base file name, e.g. `word_reverser.py`.
    pub file_name: String,

    /// Full script text.
    pub content: String,
}

impl ScriptUnit {
    /// Build a script unit from already-loaded parts.
    pub fn new(path: impl Into<PathBuf>, file_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    /// Read a script from disk.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(JitError::UserInput(format!(
                "script file not found: {}",
                path.display()
            )));
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| JitError::UserInput(format!("invalid script path: {}", path.display())))?;
        let content = tokio::fs::read_to_string(path).await?;
        Ok(Self::new(path, file_name, content))
    }

    /// File name without its extension (`word_reverser` for `word_reverser.py`).
    pub fn stem(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.file_name,
        }
    }
}

/// Prompt-safe view of a script, produced only by the security gate.
///
/// Model capabilities receive this instead of the raw `ScriptUnit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatedScript {
    file_name: String,
    prompt_text: String,
}

impl GatedScript {
    pub(crate) fn new(file_name: String, prompt_text: String) -> Self {
        Self {
            file_name,
            prompt_text,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Sanitized script text to embed in prompts.
    pub fn prompt_text(&self) -> &str {
        &self.prompt_text
    }
}
