//! Sanitization results.

use serde::{Deserialize, Serialize};

/// Outcome of screening one string.
///
/// `sanitized_text` is always populated, even when the verdict is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizationVerdict {
    pub is_valid: bool,
    pub sanitized_text: String,
    pub detected_threats: Vec<String>,
    pub warnings: Vec<String>,
}

impl SanitizationVerdict {
    /// Builds a verdict; validity follows from the threat list.
    pub fn new(sanitized_text: String, detected_threats: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: detected_threats.is_empty(),
            sanitized_text,
            detected_threats,
            warnings,
        }
    }

    pub(crate) fn empty_input() -> Self {
        Self::new(
            String::new(),
            vec!["empty input".to_string()],
            vec!["input cannot be empty".to_string()],
        )
    }

    /// True when the only problem is that the text was blank.
    pub fn is_empty_input(&self) -> bool {
        self.detected_threats.len() == 1 && self.detected_threats[0] == "empty input"
    }
}

/// Execution-variant verdicts for both halves of a candidate test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseVerdict {
    pub input: SanitizationVerdict,
    pub expected_output: SanitizationVerdict,
}

impl TestCaseVerdict {
    pub fn is_valid(&self) -> bool {
        self.input.is_valid && self.expected_output.is_valid
    }

    /// Threats from both halves, prefixed with the field they came from.
    pub fn threats(&self) -> Vec<String> {
        let input = self.input.detected_threats.iter().map(|t| format!("input: {t}"));
        let expected = self
            .expected_output
            .detected_threats
            .iter()
            .map(|t| format!("expected output: {t}"));
        input.chain(expected).collect()
    }

    /// Threats other than a blank half. A pair can be both blank and hostile.
    pub fn content_threats(&self) -> Vec<String> {
        let input = self
            .input
            .detected_threats
            .iter()
            .filter(|_| !self.input.is_empty_input())
            .map(|t| format!("input: {t}"));
        let expected = self
            .expected_output
            .detected_threats
            .iter()
            .filter(|_| !self.expected_output.is_empty_input())
            .map(|t| format!("expected output: {t}"));
        input.chain(expected).collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.input
            .warnings
            .iter()
            .chain(self.expected_output.warnings.iter())
            .cloned()
            .collect()
    }

    /// Either half was blank.
    pub fn is_blank(&self) -> bool {
        self.input.is_empty_input() || self.expected_output.is_empty_input()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threats_make_verdict_invalid() {
        let ok = SanitizationVerdict::new("x".into(), vec![], vec!["long".into()]);
        assert!(ok.is_valid);
        let bad = SanitizationVerdict::new("x".into(), vec!["boom".into()], vec![]);
        assert!(!bad.is_valid);
    }

    #[test]
    fn test_case_verdict_merges_threats() {
        let verdict = TestCaseVerdict {
            input: SanitizationVerdict::new("a".into(), vec!["t1".into()], vec!["w1".into()]),
            expected_output: SanitizationVerdict::empty_input(),
        };
        assert!(!verdict.is_valid());
        assert!(verdict.is_blank());
        assert_eq!(
            verdict.threats(),
            vec!["input: t1".to_string(), "expected output: empty input".to_string()]
        );
        assert_eq!(verdict.warnings().len(), 2);
        assert_eq!(verdict.content_threats(), vec!["input: t1".to_string()]);
    }

    #[test]
    fn test_blank_pair_has_no_content_threats() {
        let verdict = TestCaseVerdict {
            input: SanitizationVerdict::empty_input(),
            expected_output: SanitizationVerdict::new("ok".into(), vec![], vec![]),
        };
        assert!(verdict.is_blank());
        assert!(verdict.content_threats().is_empty());
    }
}
