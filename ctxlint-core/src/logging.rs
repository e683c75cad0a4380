//! Structured logging using **tracing**.
//!
//! Logs always go to stderr so that stdout carries only the report. The
//! JSON subscriber gives machine-readable events for CI log collectors; the
//! compact one is meant for people at a terminal.

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initializes the global tracing subscriber with JSON output.
///
/// Call once at startup. Later calls are ignored.
///
/// # Environment Variables
/// - `RUST_LOG`: Controls log filtering (e.g., `RUST_LOG=ctxlint_core=debug`)
pub fn init_structured_logging(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_level(true)
        .with_target(true)
        .with_current_span(true)
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .try_init();
}

/// Initializes the global tracing subscriber with compact human output.
pub fn init_compact_logging(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn log_warn(message: &str) {
    warn!(detail = %message);
}

pub fn log_info(message: &str) {
    info!(detail = %message);
}

pub fn log_error(message: &str) {
    error!(detail = %message);
}
