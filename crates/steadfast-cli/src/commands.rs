//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Steadfast: run resilient end-to-end scenarios against the device-management app
#[derive(Parser, Debug)]
#[command(name = "steadfast")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// YAML configuration file
    #[arg(long, global = true, env = "STEADFAST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one scenario in a fresh browser session
    Run(RunArgs),

    /// List built-in scenarios
    Scenarios,

    /// Print the effective configuration as YAML
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Scenario name (see `steadfast scenarios`)
    pub scenario: String,

    /// Application login URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Login username
    #[arg(long, env = "STEADFAST_USERNAME", default_value = "")]
    pub username: String,

    /// Login password
    #[arg(long, env = "STEADFAST_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    /// Directory for failure screenshots
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Device type label (add-device)
    #[arg(long = "type")]
    pub device_type: Option<String>,

    /// Device subtype label (add-device)
    #[arg(long)]
    pub subtype: Option<String>,

    /// Device status label (add-device)
    #[arg(long)]
    pub status: Option<String>,

    /// Device disposition label (add-device)
    #[arg(long)]
    pub disposition: Option<String>,

    /// Organization to search for or assign
    #[arg(long)]
    pub organization: Option<String>,

    /// Maximum convergence attempts per widget
    #[arg(long)]
    pub max_attempts: Option<u32>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Application login URL to show in the output
    #[arg(long)]
    pub base_url: Option<String>,

    /// Show headed-mode settings
    #[arg(long)]
    pub headed: bool,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// JSON objects, one per line
    Json,
}

impl From<LogFormatArg> for crate::config::LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_run_command() {
            let cli = Cli::parse_from(["steadfast", "run", "login", "--headed"]);
            let Commands::Run(args) = cli.command else {
                panic!("expected Run command");
            };
            assert_eq!(args.scenario, "login");
            assert!(args.headed);
            assert!(args.base_url.is_none());
        }

        #[test]
        fn test_parse_run_with_device_fields() {
            let cli = Cli::parse_from([
                "steadfast",
                "run",
                "add-device",
                "--type",
                "Server",
                "--status",
                "Active",
                "-o",
                "/tmp/shots",
            ]);
            let Commands::Run(args) = cli.command else {
                panic!("expected Run command");
            };
            assert_eq!(args.device_type.as_deref(), Some("Server"));
            assert_eq!(args.status.as_deref(), Some("Active"));
            assert_eq!(args.output, Some(PathBuf::from("/tmp/shots")));
        }

        #[test]
        fn test_global_flags_after_subcommand() {
            let cli = Cli::parse_from(["steadfast", "scenarios", "-vv", "--log-format", "json"]);
            assert!(matches!(cli.command, Commands::Scenarios));
            assert_eq!(cli.verbose, 2);
            assert_eq!(cli.log_format, LogFormatArg::Json);
        }

        #[test]
        fn test_parse_config_command() {
            let cli = Cli::parse_from(["steadfast", "--color", "never", "config", "--headed"]);
            assert_eq!(cli.color, ColorArg::Never);
            let Commands::Config(args) = cli.command else {
                panic!("expected Config command");
            };
            assert!(args.headed);
        }

        #[test]
        fn test_run_requires_scenario() {
            assert!(Cli::try_parse_from(["steadfast", "run"]).is_err());
        }
    }

    mod conversion_tests {
        use super::*;
        use crate::config::{ColorChoice, LogFormat};

        #[test]
        fn test_color_arg() {
            assert_eq!(ColorChoice::from(ColorArg::Always), ColorChoice::Always);
            assert_eq!(ColorChoice::from(ColorArg::Auto), ColorChoice::Auto);
        }

        #[test]
        fn test_log_format_arg() {
            assert_eq!(LogFormat::from(LogFormatArg::Json), LogFormat::Json);
        }
    }
}
