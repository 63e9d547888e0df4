//! Logging infrastructure for Promptsmith.
//!
//! Diagnostics go to stderr through `tracing`; stdout carries command output
//! only, so `--json` results stay machine-readable.

use std::io::IsTerminal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    Pretty,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Read the format from `PROMPTSMITH_LOG_FORMAT` (`json` or anything else).
    pub fn from_env() -> Self {
        match std::env::var("PROMPTSMITH_LOG_FORMAT") {
            Ok(value) if value.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Build the env filter from an explicit level, `RUST_LOG`, or `info`.
fn build_filter(log_level: Option<&str>) -> AppResult<EnvFilter> {
    let default_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_str = log_level.unwrap_or(&default_level);

    EnvFilter::try_new(filter_str)
        .map_err(|e| AppError::Config(format!("Invalid log filter '{}': {}", filter_str, e)))
}

/// Initialize the tracing subscriber with stderr output.
///
/// # Arguments
/// * `log_level` - Optional log level override (e.g., "debug", "promptsmith_llm=trace")
/// * `no_color` - Disable colored output
///
/// # Example
/// ```no_run
/// use promptsmith_core::logging::init_logging;
///
/// init_logging(None, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> AppResult<()> {
    let env_filter = build_filter(log_level)?;

    let result = match LogFormat::from_env() {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(!no_color && supports_color()),
            )
            .try_init(),
    };

    result.map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))
}

/// Color only when stderr is a terminal and NO_COLOR is unset.
fn supports_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    std::io::stderr().is_terminal()
}
