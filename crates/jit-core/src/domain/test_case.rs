//! Test cases and their provenance.

use serde::{Deserialize, Serialize};

/// Where an accepted test case came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Docs,
    Synthesized,
    Reanalyzed,
    Manual,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::Docs => write!(f, "docs"),
            Provenance::Synthesized => write!(f, "synthesized"),
            Provenance::Reanalyzed => write!(f, "reanalyzed"),
            Provenance::Manual => write!(f, "manual"),
        }
    }
}

/// Unvetted (input, expected output) pair as returned by a capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamplePair {
    #[serde(alias = "exampleInput", alias = "example_input")]
    pub input: String,
    #[serde(alias = "expectedOutput")]
    pub expected_output: String,
}

impl ExamplePair {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }

    /// True when either side is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.input.trim().is_empty() || self.expected_output.trim().is_empty()
    }
}

/// A test case that passed the security gate.
///
/// Only the gate constructs these; a repair path replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    input: String,
    expected_output: String,
    provenance: Provenance,
}

impl TestCase {
    pub(crate) fn accepted(input: String, expected_output: String, provenance: Provenance) -> Self {
        Self {
            input,
            expected_output,
            provenance,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn expected_output(&self) -> &str {
        &self.expected_output
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }
}
