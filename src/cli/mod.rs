//! CLI command implementations for Gridbot.

pub(crate) mod run;
pub(crate) mod validate;

use clap::ValueEnum;
use gridbot::WireFormat;
use std::error::Error;
use std::fmt;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Report shape accepted by `--wire`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Wire {
    /// `debug_inspect_tables` / `debug_locate_queries`.
    Current,
    /// `debug_tables` / `debug_inspections`.
    Legacy,
}

impl From<Wire> for WireFormat {
    fn from(wire: Wire) -> Self {
        match wire {
            Wire::Current => Self::Current,
            Wire::Legacy => Self::Legacy,
        }
    }
}

/// Install the diagnostic subscriber.
///
/// Diagnostics go to stderr only; stdout carries the protocol. `level`
/// takes precedence over `RUST_LOG`, and the default is `warn`.
pub(crate) fn init_tracing(level: Option<&str>) {
    let filter = level
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<gridbot::LoadError> for CliError {
    fn from(e: gridbot::LoadError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<gridbot::ProtocolError> for CliError {
    fn from(e: gridbot::ProtocolError) -> Self {
        Self::new(e.to_string())
    }
}
