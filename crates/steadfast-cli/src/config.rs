//! CLI configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use steadfast::Config;

use crate::error::CliResult;

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - errors only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - engine decisions
    Verbose,
    /// Debug - every probe and strategy
    Debug,
}

impl Verbosity {
    /// From `-v` count and `-q`
    #[must_use]
    pub const fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Default log filter when `RUST_LOG` is unset
    #[must_use]
    pub const fn filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn,steadfast=info,steadfast_cli=info",
            Self::Verbose => "info,steadfast=debug,steadfast_cli=debug",
            Self::Debug => "debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Log line format
    pub log_format: LogFormat,
    /// Directory for failure screenshots
    pub output_dir: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Auto,
            log_format: LogFormat::Text,
            output_dir: "target/steadfast".to_string(),
        }
    }
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set log format
    #[must_use]
    pub const fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Set output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<String>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

/// Command-line values that win over file and environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Application login URL
    pub base_url: Option<String>,
    /// Show the browser window
    pub headed: bool,
    /// Maximum convergence attempts
    pub max_attempts: Option<u32>,
}

/// Build the engine configuration: defaults, then the YAML file, then
/// `STEADFAST_*` variables from `env`, then command-line flags.
///
/// # Errors
///
/// Unreadable or invalid file, bad environment value, or a flag that makes
/// the result invalid.
pub fn effective_config<F>(path: Option<&Path>, env: F, overrides: &Overrides) -> CliResult<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.apply_env_from(env)?;
    if let Some(url) = &overrides.base_url {
        config.session.base_url.clone_from(url);
    }
    if overrides.headed {
        config.session.headless = false;
    }
    if let Some(attempts) = overrides.max_attempts {
        config.engine.retry.max_attempts = attempts;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod verbosity_tests {
        use super::*;

        #[test]
        fn test_from_flags() {
            assert_eq!(Verbosity::from_flags(0, false), Verbosity::Normal);
            assert_eq!(Verbosity::from_flags(1, false), Verbosity::Verbose);
            assert_eq!(Verbosity::from_flags(3, false), Verbosity::Debug);
            assert_eq!(Verbosity::from_flags(2, true), Verbosity::Quiet);
        }

        #[test]
        fn test_is_verbose() {
            assert!(!Verbosity::Quiet.is_verbose());
            assert!(!Verbosity::Normal.is_verbose());
            assert!(Verbosity::Verbose.is_verbose());
            assert!(Verbosity::Debug.is_verbose());
        }

        #[test]
        fn test_filters_widen_with_verbosity() {
            assert_eq!(Verbosity::Quiet.filter(), "error");
            assert!(Verbosity::Verbose.filter().contains("steadfast=debug"));
        }
    }

    mod color_tests {
        use super::*;

        #[test]
        fn test_fixed_choices() {
            assert!(ColorChoice::Always.should_color());
            assert!(!ColorChoice::Never.should_color());
        }
    }

    mod cli_config_tests {
        use super::*;

        #[test]
        fn test_builder() {
            let config = CliConfig::new()
                .with_verbosity(Verbosity::Debug)
                .with_color(ColorChoice::Never)
                .with_log_format(LogFormat::Json)
                .with_output_dir("/tmp/shots");
            assert_eq!(config.verbosity, Verbosity::Debug);
            assert_eq!(config.color, ColorChoice::Never);
            assert_eq!(config.log_format, LogFormat::Json);
            assert_eq!(config.output_dir, "/tmp/shots");
        }
    }

    mod effective_config_tests {
        use super::*;
        use std::io::Write;

        fn no_env(_: &str) -> Option<String> {
            None
        }

        #[test]
        fn test_defaults_without_file() {
            let config = effective_config(None, no_env, &Overrides::default()).unwrap();
            assert_eq!(config, Config::default());
        }

        #[test]
        fn test_flags_beat_env_beat_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "session:\n  base_url: https://file.test/login\n  headless: true").unwrap();
            let env = |key: &str| (key == "STEADFAST_BASE_URL").then(|| "https://env.test/login".to_string());

            let from_env = effective_config(Some(file.path()), env, &Overrides::default()).unwrap();
            assert_eq!(from_env.session.base_url, "https://env.test/login");

            let overrides = Overrides {
                base_url: Some("https://flag.test/login".into()),
                headed: true,
                max_attempts: Some(5),
            };
            let from_flags = effective_config(Some(file.path()), env, &overrides).unwrap();
            assert_eq!(from_flags.session.base_url, "https://flag.test/login");
            assert!(!from_flags.session.headless);
            assert_eq!(from_flags.engine.retry.max_attempts, 5);
        }

        #[test]
        fn test_zero_attempts_flag_rejected() {
            let overrides = Overrides {
                max_attempts: Some(0),
                ..Overrides::default()
            };
            assert!(effective_config(None, no_env, &overrides).is_err());
        }

        #[test]
        fn test_missing_file_is_an_error() {
            let path = Path::new("/nonexistent/steadfast.yaml");
            assert!(effective_config(Some(path), no_env, &Overrides::default()).is_err());
        }
    }
}
