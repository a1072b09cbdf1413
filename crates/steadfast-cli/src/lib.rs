//! Steadfast CLI library
//!
//! Runs the built-in scenarios against a real Chromium session and prints
//! which widgets needed the scripted-event fallback.

#![warn(missing_docs)]

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod scenarios;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, LogFormatArg, RunArgs};
pub use config::{effective_config, CliConfig, ColorChoice, LogFormat, Overrides, Verbosity};
pub use error::{CliError, CliResult};
pub use scenarios::{execute, Credentials, Scenario, ScenarioInputs, ScenarioReport};
