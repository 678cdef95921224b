//! Log output for the mediacast binaries.
//!
//! The daemon logs to stderr so stdout stays clean for piping. Format
//! and level come from `MEDIACAST_LOG_FORMAT` and `MEDIACAST_LOG_LEVEL`;
//! a `--verbose` flag wins over both.

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

/// Output format of the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Plain text, one event per line.
    Text,
    /// One JSON object per line, for log collectors.
    Json,
    /// Multi-line colored output for development.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!(
                "unknown log format '{}', expected text, json or pretty",
                other
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
        };
        write!(f, "{}", name)
    }
}

/// Install the global subscriber. Call once, before any task starts.
///
/// `RUST_LOG` still takes precedence over `level`, matching the usual
/// env-filter behavior.
///
/// # Panics
///
/// Panics if a subscriber is already installed.
pub fn init(format: LogFormat, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

/// Environment-driven setup for the binaries: `MEDIACAST_LOG_FORMAT`
/// picks the format (default text), `MEDIACAST_LOG_LEVEL` the level
/// (default info), and `verbose` forces debug.
pub fn init_from_env(verbose: bool) {
    let format = std::env::var("MEDIACAST_LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(LogFormat::Text);

    let level = if verbose {
        "debug".to_string()
    } else {
        std::env::var("MEDIACAST_LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
    };

    init(format, &level);
}
