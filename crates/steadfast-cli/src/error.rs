//! Error types for the CLI

use std::path::PathBuf;
use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// A scenario ran and failed
    #[error("Scenario '{scenario}' failed: {source}")]
    Scenario {
        /// Scenario name
        scenario: String,
        /// Underlying engine error
        #[source]
        source: steadfast::SteadfastError,
        /// Screenshot written before teardown, if any
        screenshot: Option<PathBuf>,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Built without browser support
    #[error("Browser support not enabled. Rebuild with --features browser")]
    BrowserUnavailable,

    /// Logging could not be installed
    #[error("Logging setup failed: {message}")]
    Logging {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Steadfast library error
    #[error("Steadfast error: {0}")]
    Steadfast(#[from] steadfast::SteadfastError),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Screenshot captured for a failed scenario
    #[must_use]
    pub fn screenshot(&self) -> Option<&PathBuf> {
        match self {
            Self::Scenario { screenshot, .. } => screenshot.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CliError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = CliError::invalid_argument("bad arg");
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn test_scenario_error_carries_screenshot() {
        let err = CliError::Scenario {
            scenario: "login".into(),
            source: steadfast::SteadfastError::session("browser closed"),
            screenshot: Some(PathBuf::from("target/steadfast/login.png")),
        };
        assert!(err.to_string().contains("Scenario 'login' failed"));
        assert_eq!(
            err.screenshot().unwrap(),
            &PathBuf::from("target/steadfast/login.png")
        );
    }

    #[test]
    fn test_browser_unavailable_mentions_feature() {
        assert!(CliError::BrowserUnavailable.to_string().contains("--features browser"));
    }
}
