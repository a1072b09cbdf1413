//! Result and error types for Steadfast.
//!
//! The taxonomy separates the three outcomes callers have to tell apart:
//! an element that never showed up ([`SteadfastError::NotFound`]), a widget
//! that was found but never reached its target state
//! ([`SteadfastError::ConvergenceFailure`]), and a broken browser session
//! ([`SteadfastError::SessionFault`]). Match on the variant, never on the
//! message text.

use crate::verified::ConvergenceReport;
use thiserror::Error;

/// Result type for Steadfast operations
pub type SteadfastResult<T> = Result<T, SteadfastError>;

/// Errors that can occur in Steadfast
#[derive(Debug, Error)]
pub enum SteadfastError {
    /// No candidate locator resolved before the deadline
    #[error("No element found after {waited_ms}ms; tried: {}", tried.join(" | "))]
    NotFound {
        /// Locators that were tried, in order
        tried: Vec<String>,
        /// Time spent waiting
        waited_ms: u64,
    },

    /// Widget was located but never reached the requested state
    #[error("{0}")]
    ConvergenceFailure(Box<ConvergenceReport>),

    /// Browser session or page crashed, closed, or lost its connection
    #[error("Browser session fault: {message}")]
    SessionFault {
        /// Error message
        message: String,
    },

    /// A single interaction could not be delivered (overlay, hidden, disabled)
    #[error("Interaction with {selector} blocked: {reason}")]
    InteractionBlocked {
        /// Selector that was targeted
        selector: String,
        /// Why the interaction was refused
        reason: String,
    },

    /// Operation timed out
    #[error("{operation} timed out after {ms}ms")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Script evaluation in the page failed
    #[error("Page script failed: {message}")]
    Script {
        /// Error message
        message: String,
    },

    /// Target state does not fit the widget kind
    #[error("Invalid target for widget '{widget}': {message}")]
    InvalidTarget {
        /// Widget name
        widget: String,
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl SteadfastError {
    /// Create a session fault
    #[must_use]
    pub fn session(message: impl Into<String>) -> Self {
        Self::SessionFault {
            message: message.into(),
        }
    }

    /// Create a blocked-interaction error
    #[must_use]
    pub fn blocked(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InteractionBlocked {
            selector: selector.into(),
            reason: reason.into(),
        }
    }

    /// Create a script error
    #[must_use]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            ms,
        }
    }

    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True when the browser session itself is gone and retrying is pointless.
    #[must_use]
    pub const fn is_session_fault(&self) -> bool {
        matches!(self, Self::SessionFault { .. })
    }

    /// True for conditions the engine absorbs through retries or that the
    /// caller may accept (an optional element being absent).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::InteractionBlocked { .. }
                | Self::Timeout { .. }
                | Self::Script { .. }
        )
    }

    /// True when no candidate locator resolved
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Convergence diagnostics, if this is a convergence failure
    #[must_use]
    pub fn convergence_report(&self) -> Option<&ConvergenceReport> {
        match self {
            Self::ConvergenceFailure(report) => Some(report),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_lists_locators() {
        let err = SteadfastError::NotFound {
            tried: vec!["#a".to_string(), "#b".to_string()],
            waited_ms: 1500,
        };
        let msg = err.to_string();
        assert!(msg.contains("#a | #b"));
        assert!(msg.contains("1500ms"));
        assert!(err.is_recoverable());
        assert!(err.is_not_found());
        assert!(!err.is_session_fault());
    }

    #[test]
    fn test_session_fault_is_fatal() {
        let err = SteadfastError::session("target closed");
        assert!(err.is_session_fault());
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("target closed"));
    }

    #[test]
    fn test_blocked_is_recoverable() {
        let err = SteadfastError::blocked("#toggle", "intercepted by .v-overlay");
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("#toggle"));
    }

    #[test]
    fn test_assertion_is_not_recoverable() {
        let err = SteadfastError::assertion("expected weekly");
        assert!(!err.is_recoverable());
        assert!(err.convergence_report().is_none());
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SteadfastError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }
}
