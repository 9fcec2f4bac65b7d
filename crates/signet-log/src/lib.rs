//! Logging utilities for signet.
//!
//! Re-exports the tracing macros used across the workspace and installs the
//! global subscriber for the `signet` binary.

pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};
pub use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Error returned when a subscriber cannot be installed
pub type InitError = Box<dyn std::error::Error + Send + Sync>;

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable lines on stderr
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Initialize the global subscriber from `RUST_LOG`, defaulting to `info`
pub fn init_tracing(format: LogFormat) -> Result<(), InitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    install(filter, format)
}

/// Initialize the global subscriber with an explicit filter directive
pub fn init_tracing_with_level(level: &str, format: LogFormat) -> Result<(), InitError> {
    let filter = EnvFilter::try_new(level)?;
    install(filter, format)
}

fn install(filter: EnvFilter, format: LogFormat) -> Result<(), InitError> {
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr)
                    .json(),
            )
            .try_init()?,
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
    }
    Ok(())
}
