//! Deterministic example extraction from documentation.
//!
//! Families are tried in order and the first match with two non-empty
//! values wins; later families are never consulted once one matches.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::domain::ExamplePair;

struct Family {
    regex: Regex,
    input: fn(&Captures<'_>) -> Option<String>,
    output: fn(&Captures<'_>) -> Option<String>,
}

const ARROW: &str = r"(?:→|->|=>)";

fn group(caps: &Captures<'_>, idx: usize) -> Option<String> {
    caps.get(idx).map(|m| m.as_str().to_string())
}

fn families() -> &'static [Family] {
    static FAMILIES: OnceLock<Vec<Family>> = OnceLock::new();
    FAMILIES.get_or_init(|| {
        let sources: [(String, fn(&Captures<'_>) -> Option<String>, fn(&Captures<'_>) -> Option<String>); 4] = [
            // Example: hello world → dlrow olleh
            (
                format!(r"(?im)(?:Example|Usage|Test):[ \t]*([^\n]+?)[ \t]*{ARROW}[ \t]*([^\n]+)$"),
                |c| group(c, 1),
                |c| group(c, 2),
            ),
            // Input: hello, Output: olleh
            (
                r"(?im)Input:[ \t]*([^\n]+?)[,\s]+Output:[ \t]*([^\n]+)$".to_string(),
                |c| group(c, 1),
                |c| group(c, 2),
            ),
            // `hello` → `olleh`
            (
                format!(r"(?m)`([^`\n]+)`[^`\n]*?{ARROW}[^`\n]*?`([^`\n]+)`"),
                |c| group(c, 1),
                |c| group(c, 2),
            ),
            // $ python rev.py 'hello'
            // olleh
            (
                r#"(?m)^[ \t]*\$[ \t]+[^\n'"]*?(?:'([^'\n]*)'|"([^"\n]*)")[ \t]*\n[ \t]*([^\s$`][^\n]*)$"#
                    .to_string(),
                |c| group(c, 1).or_else(|| group(c, 2)),
                |c| group(c, 3),
            ),
        ];
        sources
            .into_iter()
            .filter_map(|(source, input, output)| match Regex::new(&source) {
                Ok(regex) => Some(Family { regex, input, output }),
                Err(err) => {
                    tracing::error!(pattern = %source, error = %err, "dropping invalid docs pattern");
                    None
                }
            })
            .collect()
    })
}

/// First example found in `docs`, if any.
pub fn first_example(docs: &str) -> Option<ExamplePair> {
    for family in families() {
        for caps in family.regex.captures_iter(docs) {
            let input = (family.input)(&caps).map(|s| clean(&s)).unwrap_or_default();
            let output = (family.output)(&caps).map(|s| clean(&s)).unwrap_or_default();
            if !input.is_empty() && !output.is_empty() {
                return Some(ExamplePair::new(input, output));
            }
        }
    }
    None
}

fn clean(value: &str) -> String {
    value
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim()
        .replace("\\n", "\n")
        .replace("\\t", "\t")
}
