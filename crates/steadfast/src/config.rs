//! Configuration: retry policy, engine tuning, and browser session settings.
//!
//! Every timing constant the engine uses lives here so it can be tuned per
//! application instead of being hard-coded in page objects. Configuration
//! loads from YAML (durations in milliseconds) and can be overridden from
//! `STEADFAST_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::locator::Offset;
use crate::resolver::ResolveOptions;
use crate::result::{SteadfastError, SteadfastResult};

/// Serde adapter storing a [`Duration`] as integer milliseconds.
pub(crate) mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Convert a duration to whole milliseconds, saturating
#[must_use]
pub fn as_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Bounded retry budget for one interaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts before giving up (at least 1)
    pub max_attempts: u32,
    /// Upper bound for any single driver action inside an attempt
    #[serde(with = "millis", rename = "per_attempt_timeout_ms")]
    pub per_attempt_timeout: Duration,
    /// Pause between attempts
    #[serde(with = "millis", rename = "inter_attempt_delay_ms")]
    pub inter_attempt_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            per_attempt_timeout: Duration::from_secs(5),
            inter_attempt_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempt budget and default timings
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Set max attempts
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the per-attempt timeout
    #[must_use]
    pub const fn with_per_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.per_attempt_timeout = timeout;
        self
    }

    /// Set the inter-attempt delay
    #[must_use]
    pub const fn with_inter_attempt_delay(mut self, delay: Duration) -> Self {
        self.inter_attempt_delay = delay;
        self
    }

    /// Reject budgets that could never succeed
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `max_attempts` is zero or the
    /// per-attempt timeout is zero.
    pub fn validate(&self) -> SteadfastResult<()> {
        if self.max_attempts == 0 {
            return Err(SteadfastError::config("retry.max_attempts must be at least 1"));
        }
        if self.per_attempt_timeout.is_zero() {
            return Err(SteadfastError::config(
                "retry.per_attempt_timeout_ms must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Tuning for the interaction engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Retry budget for convergence
    pub retry: RetryPolicy,
    /// How candidates are searched
    pub resolve: ResolveOptions,
    /// Pause after each strategy before re-reading state
    #[serde(with = "millis", rename = "settle_delay_ms")]
    pub settle_delay: Duration,
    /// Post-condition rounds in a verified action (at least 1)
    pub verify_rounds: u32,
    /// Where forced clicks land, relative to the element's top-left corner
    pub forced_offset: Offset,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            resolve: ResolveOptions::default(),
            settle_delay: Duration::from_millis(500),
            verify_rounds: 2,
            forced_offset: Offset::default(),
        }
    }
}

impl EngineConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set resolve options
    #[must_use]
    pub fn with_resolve(mut self, resolve: ResolveOptions) -> Self {
        self.resolve = resolve;
        self
    }

    /// Set settle delay
    #[must_use]
    pub const fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set verification rounds
    #[must_use]
    pub const fn with_verify_rounds(mut self, rounds: u32) -> Self {
        self.verify_rounds = rounds;
        self
    }

    /// Set forced-click offset
    #[must_use]
    pub const fn with_forced_offset(mut self, offset: Offset) -> Self {
        self.forced_offset = offset;
        self
    }

    /// Validate all nested settings
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first invalid field.
    pub fn validate(&self) -> SteadfastResult<()> {
        self.retry.validate()?;
        self.resolve.validate()?;
        if self.verify_rounds == 0 {
            return Err(SteadfastError::config("engine.verify_rounds must be at least 1"));
        }
        Ok(())
    }
}

/// Launch arguments applied to every session unless overridden
pub const DEFAULT_LAUNCH_ARGS: &[&str] = &[
    "--disable-dev-shm-usage",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--disable-ipc-flooding-protection",
    "--disable-features=TranslateUI",
];

/// Browser session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Application entry URL (the login page)
    pub base_url: String,
    /// Run without a visible window
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Accept self-signed certificates
    pub ignore_https_errors: bool,
    /// Extra browser command-line arguments
    pub launch_args: Vec<String>,
    /// Budget for page navigation
    #[serde(with = "millis", rename = "navigation_timeout_ms")]
    pub navigation_timeout: Duration,
    /// Budget for graceful teardown before the browser is force-closed
    #[serde(with = "millis", rename = "teardown_grace_ms")]
    pub teardown_grace: Duration,
    /// Keep a headed browser open this long before teardown
    #[serde(with = "millis", rename = "headed_linger_ms")]
    pub headed_linger: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            chromium_path: None,
            sandbox: true,
            ignore_https_errors: true,
            launch_args: DEFAULT_LAUNCH_ARGS.iter().map(ToString::to_string).collect(),
            navigation_timeout: Duration::from_secs(15),
            teardown_grace: Duration::from_secs(15),
            headed_linger: Duration::from_secs(3),
        }
    }
}

impl SessionConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set teardown grace window
    #[must_use]
    pub const fn with_teardown_grace(mut self, grace: Duration) -> Self {
        self.teardown_grace = grace;
        self
    }

    /// Set headed-mode linger
    #[must_use]
    pub const fn with_headed_linger(mut self, linger: Duration) -> Self {
        self.headed_linger = linger;
        self
    }

    /// Join a path onto the application origin.
    ///
    /// `base_url` usually points at the login route, so only scheme and
    /// host are kept: `https://app.example.com/login` + `/devices` gives
    /// `https://app.example.com/devices`.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        let base = self.base_url.as_str();
        let origin_end = base
            .find("://")
            .and_then(|scheme| base[scheme + 3..].find('/').map(|p| scheme + 3 + p))
            .unwrap_or(base.len());
        format!("{}/{}", &base[..origin_end], path.trim_start_matches('/'))
    }

    /// Validate session settings
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty base URL or zero viewport.
    pub fn validate(&self) -> SteadfastResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(SteadfastError::config("session.base_url must not be empty"));
        }
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(SteadfastError::config("session viewport must be non-zero"));
        }
        Ok(())
    }
}

/// Complete configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine tuning
    pub engine: EngineConfig,
    /// Session settings
    pub session: SessionConfig,
}

impl Config {
    /// Parse YAML text; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or a value is invalid.
    pub fn from_yaml_str(yaml: &str) -> SteadfastResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> SteadfastResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Render as YAML
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> SteadfastResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Apply `STEADFAST_*` overrides from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if an override cannot be parsed.
    pub fn apply_env(&mut self) -> SteadfastResult<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup
    ///
    /// # Errors
    ///
    /// Returns an error if an override cannot be parsed.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> SteadfastResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("STEADFAST_BASE_URL") {
            self.session.base_url = url;
        }
        if let Some(headless) = lookup("STEADFAST_HEADLESS") {
            self.session.headless = parse_bool("STEADFAST_HEADLESS", &headless)?;
        }
        if let Some(path) = lookup("STEADFAST_CHROMIUM_PATH") {
            self.session.chromium_path = Some(path);
        }
        if let Some(attempts) = lookup("STEADFAST_MAX_ATTEMPTS") {
            self.engine.retry.max_attempts = attempts.trim().parse().map_err(|_| {
                SteadfastError::config(format!("STEADFAST_MAX_ATTEMPTS: not a number: {attempts}"))
            })?;
        }
        self.validate()
    }

    /// Validate every section
    ///
    /// # Errors
    ///
    /// Returns the first validation error.
    pub fn validate(&self) -> SteadfastResult<()> {
        self.engine.validate()?;
        self.session.validate()
    }
}

fn parse_bool(key: &str, value: &str) -> SteadfastResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(SteadfastError::config(format!("{key}: expected a boolean, got {other:?}"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    mod retry_policy_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let policy = RetryPolicy::default();
            assert_eq!(policy.max_attempts, 3);
            assert_eq!(policy.per_attempt_timeout, Duration::from_secs(5));
            assert_eq!(policy.inter_attempt_delay, Duration::from_secs(1));
            assert!(policy.validate().is_ok());
        }

        #[test]
        fn test_zero_attempts_rejected() {
            let err = RetryPolicy::new(0).validate().unwrap_err();
            assert!(err.to_string().contains("max_attempts"));
        }

        #[test]
        fn test_builder() {
            let policy = RetryPolicy::new(5)
                .with_per_attempt_timeout(Duration::from_millis(750))
                .with_inter_attempt_delay(Duration::from_millis(200));
            assert_eq!(policy.max_attempts, 5);
            assert_eq!(policy.per_attempt_timeout.as_millis(), 750);
            assert_eq!(policy.inter_attempt_delay.as_millis(), 200);
        }
    }

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_partial_yaml_fills_defaults() {
            let config = Config::from_yaml_str(
                "engine:\n  retry:\n    max_attempts: 4\n  settle_delay_ms: 250\nsession:\n  base_url: https://app.test/login\n  headless: false\n",
            )
            .unwrap();
            assert_eq!(config.engine.retry.max_attempts, 4);
            assert_eq!(config.engine.retry.per_attempt_timeout, Duration::from_secs(5));
            assert_eq!(config.engine.settle_delay, Duration::from_millis(250));
            assert_eq!(config.engine.verify_rounds, 2);
            assert_eq!(config.session.base_url, "https://app.test/login");
            assert!(!config.session.headless);
            assert_eq!(config.session.viewport_width, 1920);
        }

        #[test]
        fn test_invalid_yaml_value_rejected() {
            let err = Config::from_yaml_str("engine:\n  retry:\n    max_attempts: 0\n").unwrap_err();
            assert!(matches!(err, SteadfastError::Config { .. }));
        }

        #[test]
        fn test_yaml_round_trip_keeps_millis_names() {
            let yaml = Config::default().to_yaml().unwrap();
            assert!(yaml.contains("per_attempt_timeout_ms: 5000"));
            assert!(yaml.contains("teardown_grace_ms: 15000"));
            let back = Config::from_yaml_str(&yaml).unwrap();
            assert_eq!(back, Config::default());
        }

        #[test]
        fn test_load_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("steadfast.yaml");
            std::fs::write(&path, "session:\n  base_url: https://x.test/\n").unwrap();
            let config = Config::load(&path).unwrap();
            assert_eq!(config.session.base_url, "https://x.test/");
        }
    }

    mod env_tests {
        use super::*;

        fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
            let map: HashMap<String, String> = pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect();
            move |key: &str| map.get(key).cloned()
        }

        #[test]
        fn test_env_overrides() {
            let mut config = Config::default();
            config
                .apply_env_from(lookup(&[
                    ("STEADFAST_BASE_URL", "https://staging.test/login"),
                    ("STEADFAST_HEADLESS", "false"),
                    ("STEADFAST_MAX_ATTEMPTS", "6"),
                ]))
                .unwrap();
            assert_eq!(config.session.base_url, "https://staging.test/login");
            assert!(!config.session.headless);
            assert_eq!(config.engine.retry.max_attempts, 6);
        }

        #[test]
        fn test_bad_boolean_rejected() {
            let mut config = Config::default();
            let err = config
                .apply_env_from(lookup(&[("STEADFAST_HEADLESS", "maybe")]))
                .unwrap_err();
            assert!(err.to_string().contains("STEADFAST_HEADLESS"));
        }
    }

    mod session_tests {
        use super::*;

        #[test]
        fn test_url_for_uses_origin() {
            let session = SessionConfig::new().with_base_url("https://app.example.com/login");
            assert_eq!(session.url_for("/devices"), "https://app.example.com/devices");
            assert_eq!(session.url_for("devices/new"), "https://app.example.com/devices/new");
        }

        #[test]
        fn test_url_for_bare_origin() {
            let session = SessionConfig::new().with_base_url("http://localhost:8080");
            assert_eq!(session.url_for("/devices"), "http://localhost:8080/devices");
        }

        #[test]
        fn test_zero_viewport_rejected() {
            assert!(SessionConfig::new().with_viewport(0, 10).validate().is_err());
        }
    }
}
