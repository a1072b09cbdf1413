//! Deadline-bounded polling.
//!
//! Everything that waits on the page (a URL change, a message that may or
//! may not show up) goes through [`poll_until`], so waits are always bounded
//! and always cooperate with the tokio clock.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::config::{as_millis, millis};
use crate::driver::PageDriver;
use crate::result::{SteadfastError, SteadfastResult};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (2 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 2_000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOptions {
    /// Overall deadline
    #[serde(with = "millis", rename = "timeout_ms")]
    pub timeout: Duration,
    /// Delay between checks
    #[serde(with = "millis", rename = "poll_interval_ms")]
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

// =============================================================================
// URL PATTERN
// =============================================================================

/// URL matcher for navigation waits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "pattern", rename_all = "snake_case")]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
    /// Glob pattern (e.g., "**/devices**")
    Glob(String),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Glob pattern
    #[must_use]
    pub fn glob(pattern: impl Into<String>) -> Self {
        Self::Glob(pattern.into())
    }

    /// Substring pattern
    #[must_use]
    pub fn contains(fragment: impl Into<String>) -> Self {
        Self::Contains(fragment.into())
    }

    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern.as_str()),
            Self::Contains(pattern) => url.contains(pattern.as_str()),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Glob(pattern) => glob_matches(pattern, url),
            Self::Any => true,
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(p) => write!(f, "url == {p}"),
            Self::Prefix(p) => write!(f, "url starts with {p}"),
            Self::Contains(p) => write!(f, "url contains {p}"),
            Self::Regex(p) => write!(f, "url =~ /{p}/"),
            Self::Glob(p) => write!(f, "url like {p}"),
            Self::Any => f.write_str("any url"),
        }
    }
}

/// `*` and `**` both match any run of characters, slashes included.
fn glob_matches(pattern: &str, url: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    let mut pos = 0;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        let Some(found) = url[pos..].find(part) else {
            return false;
        };
        if i == 0 && found != 0 {
            return false;
        }
        pos += found + part.len();
    }
    pattern.ends_with('*') || pos == url.len()
}

// =============================================================================
// POLLING
// =============================================================================

/// Run `check` until it returns `true` or the deadline passes.
///
/// Errors from `check` count as "not yet", except session faults, which
/// abort the wait. Returns the time spent waiting.
///
/// # Errors
///
/// - [`SteadfastError::Timeout`] naming `what` when the deadline passes.
/// - [`SteadfastError::SessionFault`] as soon as `check` reports one.
pub async fn poll_until<F, Fut>(
    options: &WaitOptions,
    what: &str,
    mut check: F,
) -> SteadfastResult<Duration>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SteadfastResult<bool>>,
{
    let started = Instant::now();
    let deadline = started + options.timeout;
    loop {
        match check().await {
            Ok(true) => return Ok(started.elapsed()),
            Ok(false) => {}
            Err(e) if e.is_session_fault() => return Err(e),
            Err(e) => debug!(waiting_for = what, error = %e, "check failed"),
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(SteadfastError::timeout(what, as_millis(options.timeout)));
        }
        tokio::time::sleep(options.poll_interval.min(deadline - now)).await;
    }
}

/// Wait until the page URL matches `pattern`, returning the matching URL.
///
/// # Errors
///
/// [`SteadfastError::Timeout`] if the URL never matches, or a session fault.
pub async fn wait_for_url<D>(
    driver: &D,
    pattern: &UrlPattern,
    options: &WaitOptions,
) -> SteadfastResult<String>
where
    D: PageDriver + ?Sized,
{
    let what = pattern.to_string();
    poll_until(options, &what, move || async move {
        let url = driver.current_url().await?;
        Ok::<_, SteadfastError>(pattern.matches(&url))
    })
    .await?;
    driver.current_url().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::{ClickEffect, MockDriver, MockElement};
    use crate::locator::{ClickOptions, Selector};

    mod url_pattern_tests {
        use super::*;

        #[test]
        fn test_glob_double_star() {
            let pattern = UrlPattern::glob("**/devices**");
            assert!(pattern.matches("https://app.test/devices"));
            assert!(pattern.matches("https://app.test/devices/new?x=1"));
            assert!(!pattern.matches("https://app.test/login"));
        }

        #[test]
        fn test_glob_anchored_start() {
            let pattern = UrlPattern::glob("https://app.test/*");
            assert!(pattern.matches("https://app.test/profile"));
            assert!(!pattern.matches("http://other.test/https://app.test/"));
        }

        #[test]
        fn test_glob_without_trailing_star_must_consume() {
            let pattern = UrlPattern::glob("*/devices");
            assert!(pattern.matches("https://app.test/devices"));
            assert!(!pattern.matches("https://app.test/devices/new"));
        }

        #[test]
        fn test_other_kinds() {
            assert!(UrlPattern::Exact("a".into()).matches("a"));
            assert!(UrlPattern::Prefix("https://".into()).matches("https://x"));
            assert!(UrlPattern::contains("/devices/new").matches("https://x/devices/new"));
            assert!(UrlPattern::Regex(r"/devices/\d+$".into()).matches("https://x/devices/42"));
            assert!(!UrlPattern::Regex("(".into()).matches("anything"));
            assert!(UrlPattern::Any.matches(""));
        }
    }

    mod poll_tests {
        use super::*;
        use std::sync::atomic::{AtomicU32, Ordering};

        #[tokio::test(start_paused = true)]
        async fn test_poll_until_succeeds_late() {
            let calls = AtomicU32::new(0);
            let counter = &calls;
            let waited = poll_until(&WaitOptions::default(), "third call", move || async move {
                Ok::<_, SteadfastError>(counter.fetch_add(1, Ordering::SeqCst) >= 2)
            })
            .await
            .unwrap();
            assert_eq!(calls.load(Ordering::SeqCst), 3);
            assert_eq!(waited, Duration::from_millis(200));
        }

        #[tokio::test(start_paused = true)]
        async fn test_poll_until_times_out() {
            let opts = WaitOptions::default().with_timeout(Duration::from_millis(350));
            let err = poll_until(&opts, "never", || async { Ok::<_, SteadfastError>(false) })
                .await
                .unwrap_err();
            assert!(matches!(err, SteadfastError::Timeout { ms: 350, .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_session_fault_aborts_wait() {
            let err = poll_until(&WaitOptions::default(), "dead", || async {
                Err::<bool, _>(SteadfastError::session("gone"))
            })
            .await
            .unwrap_err();
            assert!(err.is_session_fault());
        }

        #[tokio::test(start_paused = true)]
        async fn test_wait_for_url_after_click() {
            let driver = MockDriver::new();
            driver.set_url("https://app.test/");
            driver.add(
                Selector::css("button[type=\"submit\"]"),
                MockElement::button().on_click(ClickEffect::Navigate("https://app.test/devices".into())),
            );
            driver
                .click(&Selector::css("button[type=\"submit\"]"), &ClickOptions::default())
                .await
                .unwrap();
            let url = wait_for_url(&driver, &UrlPattern::glob("**/devices**"), &WaitOptions::default())
                .await
                .unwrap();
            assert_eq!(url, "https://app.test/devices");
        }
    }
}
