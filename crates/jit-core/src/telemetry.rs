//! Tracing setup for the `jit` binary.
//!
//! Logs always go to stderr; stdout carries only the run summary.

use std::io::IsTerminal;

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose debug output drowns the pipeline's own events.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "h2", "reqwest", "rustls"];

/// Shape of each log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Multi-field human output, coloured when stderr is a terminal.
    #[default]
    Text,
    /// One short line per event.
    Compact,
    /// Newline-delimited JSON with event fields at the top level.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other} (expected text, compact or json)")),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Compact => write!(f, "compact"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Filter used when `RUST_LOG` is unset: `level` for everything, with the
/// HTTP stack capped at `warn` unless `level` is already stricter.
pub fn default_directive(level: Level) -> String {
    let mut directive = level.as_str().to_ascii_lowercase();
    if level > Level::WARN {
        for target in QUIET_TARGETS {
            directive.push_str(&format!(",{target}=warn"));
        }
    }
    directive
}

/// Install the global subscriber. Only the first call in a process has any
/// effect; `RUST_LOG` overrides `level` when set.
pub fn init_tracing(format: LogFormat, level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));
    let base = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Text => registry
            .with(base.with_ansi(std::io::stderr().is_terminal()))
            .try_init(),
        LogFormat::Compact => registry.with(base.with_ansi(false).compact()).try_init(),
        LogFormat::Json => registry
            .with(base.json().flatten_event(true).with_current_span(true))
            .try_init(),
    };
    if installed.is_ok() {
        tracing::debug!(format = %format, "tracing initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" compact ".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }

    #[test]
    fn test_default_directive_quiets_http_stack() {
        let debug = default_directive(Level::DEBUG);
        assert!(debug.starts_with("debug,"));
        assert!(debug.contains("reqwest=warn"));
        assert!(debug.contains("hyper=warn"));
        assert_eq!(default_directive(Level::ERROR), "error");
        assert_eq!(default_directive(Level::WARN), "warn");
    }

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing(LogFormat::Compact, Level::INFO);
        init_tracing(LogFormat::Json, Level::DEBUG);
    }
}
