//! Tracing subscriber setup

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{CliConfig, LogFormat};
use crate::error::{CliError, CliResult};

/// Filter from `RUST_LOG`, falling back to the verbosity default
fn filter(config: &CliConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.verbosity.filter()))
}

/// Install the global subscriber; logs go to stderr so stdout stays clean
///
/// # Errors
///
/// Fails if a subscriber is already installed.
pub fn init(config: &CliConfig) -> CliResult<()> {
    let registry = tracing_subscriber::registry().with(filter(config));
    let installed = match config.log_format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(config.color.should_color())
                    .with_target(config.verbosity.is_verbose()),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    installed.map_err(|e| CliError::Logging {
        message: e.to_string(),
    })
}
