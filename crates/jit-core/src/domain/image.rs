//! Dockerfile and image artifacts.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// One Dockerfile draft. Replaced wholesale on every repair cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerfileArtifact {
    pub content: String,

    /// Zero-based build attempt this draft is used for.
    pub attempt_index: u32,

    /// Build error of the previous attempt that this draft repairs.
    pub prior_build_error: Option<String>,
}

impl DockerfileArtifact {
    /// First draft, from the generation capability.
    pub fn initial(content: String) -> Self {
        Self {
            content,
            attempt_index: 0,
            prior_build_error: None,
        }
    }

    /// Replacement draft, from the repair capability.
    pub fn repaired(content: String, attempt_index: u32, prior_build_error: String) -> Self {
        Self {
            content,
            attempt_index,
            prior_build_error: Some(prior_build_error),
        }
    }
}

/// A successfully built image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHandle {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl ImageHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
        }
    }

    /// `script-<stem>-<YYYYmmdd-HHMMSS>`.
    ///
    /// Second granularity: two builds of the same script within one second
    /// collide on the tag.
    pub fn name_for(stem: &str, at: DateTime<Local>) -> String {
        let mut slug = String::with_capacity(stem.len());
        let mut separators = String::new();
        for c in stem.to_lowercase().chars() {
            match c {
                'a'..='z' | '0'..='9' => {
                    push_separator(&mut slug, &separators);
                    separators.clear();
                    slug.push(c);
                }
                '_' | '.' | '-' => separators.push(c),
                _ => separators.push('-'),
            }
        }
        if slug.is_empty() {
            slug = "script".to_string();
        }
        format!("script-{}-{}", slug, at.format("%Y%m%d-%H%M%S"))
    }
}

/// A repository path component allows one `.` or `_`, or a run of `-`,
/// between alphanumerics. Any longer or mixed run becomes a single `-`.
/// Leading separators are dropped; trailing ones never get pushed.
fn push_separator(slug: &mut String, run: &str) {
    if slug.is_empty() || run.is_empty() {
        return;
    }
    if run.len() == 1 {
        slug.push_str(run);
    } else {
        slug.push('-');
    }
}

/// Captured result of one build invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl BuildOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// Most useful failure text: stderr, or stdout when stderr is empty.
    pub fn failure_text(&self) -> String {
        if self.stderr.trim().is_empty() {
            format!("build exited with code {}: {}", self.exit_code, self.stdout.trim())
        } else {
            self.stderr.trim().to_string()
        }
    }
}
