//! Selector resolver: first present-and-visible candidate wins.
//!
//! The overall timeout is spent candidate by candidate. With
//! [`BudgetSplit::Even`] each candidate gets an equal share of whatever time
//! remains; with [`BudgetSplit::PerCandidate`] each gets a fixed slice,
//! capped by the remaining budget. A candidate whose slice is used up is
//! abandoned and never revisited, and nothing after the first match is
//! probed.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::{as_millis, millis};
use crate::driver::PageDriver;
use crate::locator::LocatorSet;
use crate::result::{SteadfastError, SteadfastResult};
use crate::widget::WidgetHandle;

/// How the overall timeout is divided between candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetSplit {
    /// Equal share of the remaining time for each remaining candidate
    Even,
    /// Fixed slice per candidate
    PerCandidate(#[serde(with = "millis")] Duration),
}

/// Options for resolving a locator set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Overall deadline for the whole set
    #[serde(with = "millis", rename = "timeout_ms")]
    pub timeout: Duration,
    /// Budget division between candidates
    pub split: BudgetSplit,
    /// Delay between presence polls
    #[serde(with = "millis", rename = "poll_interval_ms")]
    pub poll_interval: Duration,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            split: BudgetSplit::Even,
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl ResolveOptions {
    /// Options with the given overall timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the budget split
    #[must_use]
    pub const fn with_split(mut self, split: BudgetSplit) -> Self {
        self.split = split;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Reject a zero poll interval
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero poll interval.
    pub fn validate(&self) -> SteadfastResult<()> {
        if self.poll_interval.is_zero() {
            return Err(SteadfastError::config(
                "resolve.poll_interval_ms must be greater than 0",
            ));
        }
        Ok(())
    }

    fn slice(&self, remaining_time: Duration, remaining_candidates: usize) -> Duration {
        match self.split {
            BudgetSplit::Even => {
                let n = u32::try_from(remaining_candidates.max(1)).unwrap_or(u32::MAX);
                remaining_time / n
            }
            BudgetSplit::PerCandidate(fixed) => fixed.min(remaining_time),
        }
    }
}

/// Resolve `locators` to the first candidate that is present and visible.
///
/// Probe errors other than a session fault count as "not there yet", and so
/// does a probe still unanswered when the candidate's slice runs out.
///
/// # Errors
///
/// - [`SteadfastError::NotFound`] listing every candidate tried when none
///   resolves before the deadline.
/// - [`SteadfastError::SessionFault`] immediately if the session dies.
pub async fn resolve<D>(
    driver: &D,
    locators: &LocatorSet,
    options: &ResolveOptions,
) -> SteadfastResult<WidgetHandle>
where
    D: PageDriver + ?Sized,
{
    let started = Instant::now();
    let deadline = started + options.timeout;
    let candidates = locators.candidates();
    let mut tried = Vec::with_capacity(candidates.len());

    for (index, selector) in candidates.iter().enumerate() {
        let now = Instant::now();
        let slice = options.slice(
            deadline.saturating_duration_since(now),
            candidates.len() - index,
        );
        let candidate_deadline = now + slice;

        loop {
            let budget = candidate_deadline.saturating_duration_since(Instant::now());
            let Ok(probed) = tokio::time::timeout(budget, driver.probe(selector)).await else {
                debug!(locator = %selector, "probe did not answer before the candidate deadline");
                break;
            };
            match probed {
                Ok(probe) if probe.is_usable() => {
                    debug!(locator = %selector, index, "resolved");
                    if index > 0 {
                        debug!(
                            preferred = %locators.primary(),
                            locator = %selector,
                            "resolved through fallback locator"
                        );
                    }
                    return Ok(WidgetHandle::new(locators.clone(), index));
                }
                Ok(_) => {}
                Err(e) if e.is_session_fault() => return Err(e),
                Err(e) => debug!(locator = %selector, error = %e, "probe failed"),
            }

            let now = Instant::now();
            if now >= candidate_deadline {
                break;
            }
            let pause = options
                .poll_interval
                .min(candidate_deadline.saturating_duration_since(now));
            tokio::time::sleep(pause).await;
        }

        debug!(locator = %selector, slice_ms = as_millis(slice), "candidate not found");
        tried.push(selector.to_string());
    }

    Err(SteadfastError::NotFound {
        tried,
        waited_ms: as_millis(started.elapsed()),
    })
}

/// Like [`resolve`], but absence is an expected outcome.
///
/// # Errors
///
/// Returns only session faults and other non-`NotFound` errors.
pub async fn resolve_optional<D>(
    driver: &D,
    locators: &LocatorSet,
    options: &ResolveOptions,
) -> SteadfastResult<Option<WidgetHandle>>
where
    D: PageDriver + ?Sized,
{
    match resolve(driver, locators, options).await {
        Ok(handle) => Ok(Some(handle)),
        Err(SteadfastError::NotFound { tried, waited_ms }) => {
            warn!(tried = ?tried, waited_ms, "optional element not present");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
