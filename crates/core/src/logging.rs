//! Logging setup for askboard.
//!
//! Logs go to stderr so that stdout carries only command output
//! (answers, JSON listings).

use std::io::IsTerminal;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

const DEFAULT_LEVEL: &str = "info";

/// Install the global tracing subscriber.
///
/// The filter comes from `log_level` when given, else `RUST_LOG`, else `info`.
/// Colour is disabled when `no_color` is set, `NO_COLOR` is present or stderr
/// is not a terminal.
///
/// # Example
/// ```no_run
/// use askboard_core::logging::init_logging;
///
/// init_logging(Some("askboard_knowledge=debug"), false).expect("logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> AppResult<()> {
    let env_filter = build_filter(log_level)?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(!no_color && supports_color());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))?;

    Ok(())
}

/// Build the filter directive set used by [`init_logging`].
pub fn build_filter(log_level: Option<&str>) -> AppResult<EnvFilter> {
    let directives = match log_level {
        Some(level) => level.to_string(),
        None => std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LEVEL.to_string()),
    };

    EnvFilter::try_new(&directives)
        .map_err(|e| AppError::Config(format!("Invalid log filter '{}': {}", directives, e)))
}

fn supports_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    std::io::stderr().is_terminal()
}
