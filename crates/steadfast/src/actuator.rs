//! State-convergence actuator.
//!
//! Drives a widget toward a [`TargetState`] by escalating through
//! increasingly aggressive strategies, re-reading the state after each one:
//!
//! ```text
//! read ── matches? ──yes──► done (strategy: none, attempts: 0)
//!   │no
//!   ▼
//! attempt 1..=max_attempts
//!   ├─ (attempt > 1) delay, then start the attempt clock
//!   ├─ (attempt > 1) re-resolve handle, re-read
//!   ├─ direct-click   ─ settle ─ read ── matches? ──► done
//!   ├─ forced-click   ─ settle ─ read ── matches? ──► done
//!   └─ scripted-event ─ settle ─ read ── matches? ──► done
//! exhausted ──► achieved: false, attempts: max_attempts
//! ```
//!
//! Everything inside one attempt shares a single deadline of
//! `per_attempt_timeout`; strategies that no longer fit are logged as timed out.
//!
//! Running out of budget is a normal result (`achieved == false`), not an
//! error. Only a session fault or an impossible target aborts with `Err`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{as_millis, EngineConfig};
use crate::driver::PageDriver;
use crate::locator::{ClickOptions, Selector};
use crate::resolver::{resolve, ResolveOptions};
use crate::result::{SteadfastError, SteadfastResult};
use crate::widget::{TargetState, WidgetHandle, WidgetKind, WidgetState};

/// Interaction strategy, in escalation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Normal click at the element's default interaction point
    DirectClick,
    /// Click bypassing visibility/overlay checks, at a fixed offset
    ForcedClick,
    /// Set the value in script and dispatch the change notifications
    ScriptedEvent,
}

impl Strategy {
    /// Fixed escalation order
    pub const ESCALATION: [Self; 3] = [Self::DirectClick, Self::ForcedClick, Self::ScriptedEvent];

    /// Short name for logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DirectClick => "direct-click",
            Self::ForcedClick => "forced-click",
            Self::ScriptedEvent => "scripted-event",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happened when a strategy was applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum TrialOutcome {
    /// The action was delivered
    Applied,
    /// The action was refused or failed
    Failed(String),
    /// The attempt's deadline passed before the action finished, or before
    /// it could start
    TimedOut,
}

/// One strategy application and the state observed after it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyTrial {
    /// Strategy applied
    pub strategy: Strategy,
    /// Delivery outcome
    pub outcome: TrialOutcome,
    /// State read back afterwards
    pub observed: WidgetState,
}

/// Diagnostics for one attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based attempt number
    pub attempt: u32,
    /// Selector the handle resolved to, `None` if re-resolution failed
    pub resolved: Option<String>,
    /// State read at the start of the attempt
    pub initial: WidgetState,
    /// Strategies tried, in order
    pub trials: Vec<StrategyTrial>,
    /// Every strategy was tried without reaching the target
    pub strategies_exhausted: bool,
    /// Why the attempt could not act, if it could not
    pub note: Option<String>,
}

/// Outcome of one [`converge`] call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceResult {
    /// Target reached
    pub achieved: bool,
    /// Strategy that produced the target state; `None` when no action was needed
    pub strategy_used: Option<Strategy>,
    /// Attempts that performed actions
    pub attempts: u32,
    /// Last observed state
    pub observed: WidgetState,
    /// Per-attempt diagnostics
    pub log: Vec<AttemptRecord>,
}

impl ConvergenceResult {
    fn already_there(observed: WidgetState) -> Self {
        Self {
            achieved: true,
            strategy_used: None,
            attempts: 0,
            observed,
            log: Vec::new(),
        }
    }

    /// Every strategy tried across all attempts, in order
    #[must_use]
    pub fn strategies_tried(&self) -> Vec<Strategy> {
        self.log
            .iter()
            .flat_map(|a| a.trials.iter().map(|t| t.strategy))
            .collect()
    }
}

/// Run `fut` with whatever is left of the attempt, folding errors into an
/// outcome. Session faults escape.
async fn bounded<F>(limit: Duration, fut: F) -> SteadfastResult<TrialOutcome>
where
    F: Future<Output = SteadfastResult<()>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(())) => Ok(TrialOutcome::Applied),
        Ok(Err(e)) if e.is_session_fault() => Err(e),
        Ok(Err(e)) => Ok(TrialOutcome::Failed(e.to_string())),
        Err(_) => Ok(TrialOutcome::TimedOut),
    }
}

/// Read state, treating anything but a session fault as [`WidgetState::Unknown`].
async fn observe<D>(
    driver: &D,
    selector: &Selector,
    kind: &WidgetKind,
    limit: Duration,
) -> SteadfastResult<WidgetState>
where
    D: PageDriver + ?Sized,
{
    match tokio::time::timeout(limit, driver.read_state(selector, kind)).await {
        Ok(Ok(state)) => Ok(state),
        Ok(Err(e)) if e.is_session_fault() => Err(e),
        Ok(Err(e)) => {
            debug!(locator = %selector, error = %e, "state read failed");
            Ok(WidgetState::Unknown)
        }
        Err(_) => Ok(WidgetState::Unknown),
    }
}

/// Click a select's activator, wait for the option, then click it.
async fn pick_option<D>(
    driver: &D,
    activator: &Selector,
    option: &Selector,
    click: &ClickOptions,
    config: &EngineConfig,
) -> SteadfastResult<()>
where
    D: PageDriver + ?Sized,
{
    driver.click(activator, click).await?;
    // a menu that never opens may cost one strategy's share of the attempt
    let strategies = u32::try_from(Strategy::ESCALATION.len()).unwrap_or(1);
    let menu = ResolveOptions::default()
        .with_timeout(config.retry.per_attempt_timeout / strategies)
        .with_poll_interval(config.resolve.poll_interval);
    resolve(driver, &option.clone().into(), &menu).await?;
    driver.click(option, click).await
}

async fn apply<D>(
    driver: &D,
    strategy: Strategy,
    selector: &Selector,
    kind: &WidgetKind,
    target: &TargetState,
    config: &EngineConfig,
) -> SteadfastResult<()>
where
    D: PageDriver + ?Sized,
{
    let timeout_ms = as_millis(config.retry.per_attempt_timeout);
    let click = match strategy {
        Strategy::DirectClick => ClickOptions::default().with_timeout(timeout_ms),
        Strategy::ForcedClick => ClickOptions::forced_at(config.forced_offset).with_timeout(timeout_ms),
        Strategy::ScriptedEvent => return driver.dispatch_state(selector, kind, target).await,
    };
    match (kind, target) {
        (WidgetKind::Select { .. }, TargetState::Option(label)) => {
            let option = kind
                .option_selector(label)
                .ok_or_else(|| SteadfastError::script("select without option selector"))?;
            pick_option(driver, selector, &option, &click, config).await
        }
        _ => driver.click(selector, &click).await,
    }
}

/// Drive the widget behind `handle` to `target`.
///
/// The handle is used for the first attempt only; later attempts re-resolve
/// it from its locator set because the previous interaction may have
/// re-rendered the element.
///
/// # Errors
///
/// - [`SteadfastError::InvalidTarget`] if `target` does not fit `kind`.
/// - [`SteadfastError::SessionFault`] as soon as the session dies.
pub async fn converge<D>(
    driver: &D,
    handle: &WidgetHandle,
    kind: &WidgetKind,
    target: &TargetState,
    config: &EngineConfig,
) -> SteadfastResult<ConvergenceResult>
where
    D: PageDriver + ?Sized,
{
    target.validate_for(&handle.selector().to_string(), kind)?;
    let policy = &config.retry;
    let limit = policy.per_attempt_timeout;
    let max_attempts = policy.max_attempts.max(1);

    let mut observed = observe(driver, handle.selector(), kind, limit).await?;
    if target.is_satisfied_by(&observed) {
        debug!(locator = %handle.selector(), state = %observed, "already in target state");
        return Ok(ConvergenceResult::already_there(observed));
    }

    let mut log: Vec<AttemptRecord> = Vec::new();
    let mut current = handle.clone();

    for attempt in 1..=max_attempts {
        if attempt > 1 {
            tokio::time::sleep(policy.inter_attempt_delay).await;
        }
        let deadline = Instant::now() + limit;
        let remaining = || deadline.saturating_duration_since(Instant::now());

        if attempt > 1 {
            let reresolve = config.resolve.clone().with_timeout(remaining());
            match resolve(driver, current.locators(), &reresolve).await {
                Ok(fresh) => current = fresh,
                Err(e) if e.is_session_fault() => return Err(e),
                Err(e) => {
                    warn!(attempt, error = %e, "widget vanished between attempts");
                    log.push(AttemptRecord {
                        attempt,
                        resolved: None,
                        initial: WidgetState::Unknown,
                        trials: Vec::new(),
                        strategies_exhausted: false,
                        note: Some(e.to_string()),
                    });
                    observed = WidgetState::Unknown;
                    continue;
                }
            }
            observed = observe(driver, current.selector(), kind, remaining()).await?;
            if target.is_satisfied_by(&observed) {
                // A late effect from the previous attempt landed.
                let strategy_used = log.iter().rev().find_map(|a| a.trials.last().map(|t| t.strategy));
                info!(attempt = attempt - 1, state = %observed, "converged after delay");
                return Ok(ConvergenceResult {
                    achieved: true,
                    strategy_used,
                    attempts: attempt - 1,
                    observed,
                    log,
                });
            }
        }

        let selector = current.selector().clone();
        let mut record = AttemptRecord {
            attempt,
            resolved: Some(selector.to_string()),
            initial: observed.clone(),
            trials: Vec::with_capacity(Strategy::ESCALATION.len()),
            strategies_exhausted: false,
            note: None,
        };

        for strategy in Strategy::ESCALATION {
            if remaining().is_zero() {
                debug!(attempt, %strategy, "attempt deadline passed before strategy");
                record.trials.push(StrategyTrial {
                    strategy,
                    outcome: TrialOutcome::TimedOut,
                    observed: observed.clone(),
                });
                continue;
            }
            debug!(attempt, %strategy, locator = %selector, "applying strategy");
            let action = apply(driver, strategy, &selector, kind, target, config);
            let outcome = bounded(remaining(), action).await?;
            if outcome == TrialOutcome::Applied {
                tokio::time::sleep(config.settle_delay.min(remaining())).await;
            }
            observed = observe(driver, &selector, kind, remaining()).await?;
            let matched = target.is_satisfied_by(&observed);
            debug!(attempt, %strategy, ?outcome, state = %observed, matched, "strategy result");
            record.trials.push(StrategyTrial {
                strategy,
                outcome,
                observed: observed.clone(),
            });
            if matched {
                log.push(record);
                info!(attempt, %strategy, locator = %selector, "converged");
                return Ok(ConvergenceResult {
                    achieved: true,
                    strategy_used: Some(strategy),
                    attempts: attempt,
                    observed,
                    log,
                });
            }
        }

        record.strategies_exhausted = true;
        log.push(record);
        debug!(attempt, max_attempts, "all strategies exhausted for attempt");
    }

    warn!(
        locator = %handle.selector(),
        target = %target,
        observed = %observed,
        attempts = max_attempts,
        "widget did not converge"
    );
    Ok(ConvergenceResult {
        achieved: false,
        strategy_used: None,
        attempts: max_attempts,
        observed,
        log,
    })
}
