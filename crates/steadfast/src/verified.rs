//! Verified action: resolve, converge, then confirm the state held.
//!
//! Convergence can be undone by the page a moment later (a watcher resets
//! the model, a re-render restores stale state). After convergence the
//! state is read again once the settle delay has passed. If it no longer
//! matches, another round runs, up to `verify_rounds`. Only a widget that
//! cannot be made to hold the target surfaces as a
//! [`SteadfastError::ConvergenceFailure`].

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info, warn};

use crate::actuator::{converge, AttemptRecord, Strategy, TrialOutcome};
use crate::config::EngineConfig;
use crate::driver::PageDriver;
use crate::resolver::resolve;
use crate::result::{SteadfastError, SteadfastResult};
use crate::widget::{TargetState, Widget, WidgetState};

/// Diagnostics for a widget that never reached its target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    /// Widget name
    pub widget: String,
    /// Every candidate locator, in order
    pub locators: Vec<String>,
    /// Requested state
    pub target: TargetState,
    /// Last observed state
    pub observed: WidgetState,
    /// Every attempt across all rounds
    pub attempts_log: Vec<AttemptRecord>,
    /// The target was reached but did not hold
    pub reverted: bool,
}

impl ConvergenceReport {
    /// Multi-line description of every attempt and strategy
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!(
            "widget '{}' did not reach {} (last observed: {})\n  locators: {}\n",
            self.widget,
            self.target,
            self.observed,
            self.locators.join(" | ")
        );
        if self.reverted {
            out.push_str("  state was reached but reverted after settling\n");
        }
        for attempt in &self.attempts_log {
            let resolved = attempt.resolved.as_deref().unwrap_or("<unresolved>");
            out.push_str(&format!(
                "  attempt {} on {resolved} (initially {})\n",
                attempt.attempt, attempt.initial
            ));
            if let Some(note) = &attempt.note {
                out.push_str(&format!("    note: {note}\n"));
            }
            for trial in &attempt.trials {
                let outcome = match &trial.outcome {
                    TrialOutcome::Applied => "applied".to_string(),
                    TrialOutcome::Failed(why) => format!("failed: {why}"),
                    TrialOutcome::TimedOut => "timed out".to_string(),
                };
                out.push_str(&format!(
                    "    {} {outcome} -> {}\n",
                    trial.strategy, trial.observed
                ));
            }
        }
        out
    }
}

impl fmt::Display for ConvergenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Widget '{}' did not converge to {} after {} attempt(s); last observed {}",
            self.widget,
            self.target,
            self.attempts_log.len(),
            self.observed
        )
    }
}

/// Successful verified action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verified {
    /// Strategy that produced the state; `None` if it was already there
    pub strategy: Option<Strategy>,
    /// Attempts across all rounds
    pub attempts: u32,
    /// Rounds needed (1 unless the state reverted)
    pub rounds: u32,
    /// Final state
    pub observed: WidgetState,
}

impl Verified {
    /// The scripted-event fallback was needed, a sign the page has become
    /// hostile to pointer interaction
    #[must_use]
    pub fn needed_fallback(&self) -> bool {
        self.strategy == Some(Strategy::ScriptedEvent)
    }

    /// No action was required
    #[must_use]
    pub fn was_noop(&self) -> bool {
        self.strategy.is_none()
    }
}

/// Drive `widget` to `target` and confirm the state holds.
///
/// # Errors
///
/// - [`SteadfastError::NotFound`] if the widget cannot be located.
/// - [`SteadfastError::ConvergenceFailure`] if it never reaches or keeps the target.
/// - [`SteadfastError::SessionFault`] if the session dies.
/// - [`SteadfastError::InvalidTarget`] if the target does not fit the widget kind.
pub async fn perform_and_verify<D>(
    driver: &D,
    widget: &Widget,
    target: &TargetState,
    config: &EngineConfig,
) -> SteadfastResult<Verified>
where
    D: PageDriver + ?Sized,
{
    target.validate_for(&widget.name, &widget.kind)?;
    let rounds = config.verify_rounds.max(1);
    let mut attempts_log: Vec<AttemptRecord> = Vec::new();
    let mut attempts = 0;
    let mut observed = WidgetState::Unknown;

    for round in 1..=rounds {
        let handle = resolve(driver, &widget.locators, &config.resolve).await?;
        let result = converge(driver, &handle, &widget.kind, target, config).await?;
        attempts += result.attempts;
        attempts_log.extend(result.log);
        observed = result.observed;

        if !result.achieved {
            let report = ConvergenceReport {
                widget: widget.name.clone(),
                locators: widget.locators.describe(),
                target: target.clone(),
                observed,
                attempts_log,
                reverted: false,
            };
            error!(widget = %widget.name, "{}", report.render());
            return Err(SteadfastError::ConvergenceFailure(Box::new(report)));
        }

        tokio::time::sleep(config.settle_delay).await;
        let read = driver.read_state(handle.selector(), &widget.kind);
        let settled = match tokio::time::timeout(config.retry.per_attempt_timeout, read).await {
            Ok(Ok(state)) => state,
            Ok(Err(e)) if e.is_session_fault() => return Err(e),
            Ok(Err(e)) => {
                debug!(widget = %widget.name, error = %e, "post-condition read failed");
                WidgetState::Unknown
            }
            Err(_) => {
                debug!(widget = %widget.name, "post-condition read timed out");
                WidgetState::Unknown
            }
        };

        if target.is_satisfied_by(&settled) {
            let verified = Verified {
                strategy: result.strategy_used,
                attempts,
                rounds: round,
                observed: settled,
            };
            if verified.needed_fallback() {
                warn!(
                    widget = %widget.name,
                    target = %target,
                    "scripted-event fallback was needed; pointer interaction no longer works"
                );
            } else {
                info!(
                    widget = %widget.name,
                    target = %target,
                    strategy = verified.strategy.map_or("none", Strategy::name),
                    attempts,
                    "verified"
                );
            }
            return Ok(verified);
        }

        warn!(
            widget = %widget.name,
            round,
            observed = %settled,
            "state reverted after convergence"
        );
        observed = settled;
    }

    let report = ConvergenceReport {
        widget: widget.name.clone(),
        locators: widget.locators.describe(),
        target: target.clone(),
        observed,
        attempts_log,
        reverted: true,
    };
    error!(widget = %widget.name, "{}", report.render());
    Err(SteadfastError::ConvergenceFailure(Box::new(report)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::locator::{LocatorSet, Selector};
    use crate::mock::{MockDriver, MockElement};
    use std::time::Duration;

    fn config() -> EngineConfig {
        EngineConfig::default()
            .with_retry(
                RetryPolicy::new(2)
                    .with_per_attempt_timeout(Duration::from_millis(400))
                    .with_inter_attempt_delay(Duration::from_millis(100)),
            )
            .with_settle_delay(Duration::from_millis(50))
    }

    mod report_tests {
        use super::*;
        use crate::actuator::StrategyTrial;

        #[test]
        fn test_render_lists_every_trial() {
            let report = ConvergenceReport {
                widget: "weekly".into(),
                locators: vec!["#weekly".into(), "input[name*=weekly]".into()],
                target: TargetState::on(),
                observed: WidgetState::Checked(false),
                attempts_log: vec![AttemptRecord {
                    attempt: 1,
                    resolved: Some("#weekly".into()),
                    initial: WidgetState::Checked(false),
                    trials: vec![
                        StrategyTrial {
                            strategy: Strategy::DirectClick,
                            outcome: TrialOutcome::Failed("overlay".into()),
                            observed: WidgetState::Checked(false),
                        },
                        StrategyTrial {
                            strategy: Strategy::ForcedClick,
                            outcome: TrialOutcome::TimedOut,
                            observed: WidgetState::Checked(false),
                        },
                    ],
                    strategies_exhausted: true,
                    note: None,
                }],
                reverted: false,
            };
            let text = report.render();
            assert!(text.contains("#weekly | input[name*=weekly]"));
            assert!(text.contains("direct-click failed: overlay"));
            assert!(text.contains("forced-click timed out"));
            assert!(report.to_string().contains("1 attempt(s)"));
        }
    }

    mod verify_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_verified_reports_strategy() {
            let driver = MockDriver::new();
            driver.add(Selector::css("#s"), MockElement::toggle(true).with_overlay());
            let widget = Widget::toggle("slider", LocatorSet::css("#s"));
            let verified = perform_and_verify(&driver, &widget, &TargetState::off(), &config())
                .await
                .unwrap();
            assert_eq!(verified.strategy, Some(Strategy::ForcedClick));
            assert_eq!(verified.attempts, 1);
            assert_eq!(verified.rounds, 1);
            assert!(!verified.needed_fallback());
        }

        #[tokio::test(start_paused = true)]
        async fn test_not_found_propagates() {
            let driver = MockDriver::new();
            let widget = Widget::toggle("slider", LocatorSet::css("#missing"));
            let cfg = config().with_resolve(
                crate::resolver::ResolveOptions::default().with_timeout(Duration::from_millis(300)),
            );
            let err = perform_and_verify(&driver, &widget, &TargetState::on(), &cfg)
                .await
                .unwrap_err();
            assert!(err.is_not_found());
        }

        #[tokio::test(start_paused = true)]
        async fn test_failure_carries_report() {
            let driver = MockDriver::new();
            driver.add(Selector::css("#s"), MockElement::toggle(false).frozen());
            let widget = Widget::toggle("slider", LocatorSet::css("#s").or_css("#s-alt"));
            let err = perform_and_verify(&driver, &widget, &TargetState::on(), &config())
                .await
                .unwrap_err();
            let report = err.convergence_report().unwrap();
            assert_eq!(report.widget, "slider");
            assert_eq!(report.locators, vec!["#s".to_string(), "#s-alt".to_string()]);
            assert_eq!(report.attempts_log.len(), 2);
            assert!(!report.reverted);
        }

        #[tokio::test(start_paused = true)]
        async fn test_reverted_state_gets_another_round() {
            let driver = MockDriver::new();
            let id = driver.add(
                Selector::css("#s"),
                MockElement::toggle(false).reverting(1, Duration::from_millis(80)),
            );
            let widget = Widget::toggle("slider", LocatorSet::css("#s"));
            let verified = perform_and_verify(&driver, &widget, &TargetState::on(), &config())
                .await
                .unwrap();
            assert_eq!(verified.rounds, 2);
            assert_eq!(verified.attempts, 2);
            assert_eq!(driver.checked(id), Some(true));
        }

        #[tokio::test(start_paused = true)]
        async fn test_persistent_revert_fails_with_report() {
            let driver = MockDriver::new();
            driver.add(
                Selector::css("#s"),
                MockElement::toggle(false).reverting(5, Duration::from_millis(80)),
            );
            let widget = Widget::toggle("slider", LocatorSet::css("#s"));
            let err = perform_and_verify(&driver, &widget, &TargetState::on(), &config())
                .await
                .unwrap_err();
            let report = err.convergence_report().unwrap();
            assert!(report.reverted);
            assert_eq!(report.observed, WidgetState::Checked(false));
            assert!(report.render().contains("reverted after settling"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_stalled_settle_read_is_bounded() {
            let driver = MockDriver::new();
            driver.add(Selector::css("#s"), MockElement::toggle(false));
            let widget = Widget::toggle("slider", LocatorSet::css("#s"));
            let cfg = config().with_verify_rounds(1);
            let started = tokio::time::Instant::now();
            let stall_after_converging = async {
                // converged at 50ms, settle read at 100ms
                tokio::time::sleep(Duration::from_millis(75)).await;
                driver.set_read_latency(Duration::from_secs(30));
            };
            let target = TargetState::on();
            let (outcome, ()) = tokio::join!(
                perform_and_verify(&driver, &widget, &target, &cfg),
                stall_after_converging
            );
            assert!(started.elapsed() < Duration::from_secs(1));
            let err = outcome.unwrap_err();
            let report = err.convergence_report().unwrap();
            assert_eq!(report.observed, WidgetState::Unknown);
            assert!(report.reverted);
        }

        #[tokio::test(start_paused = true)]
        async fn test_invalid_target() {
            let driver = MockDriver::new();
            let widget = Widget::radio("weekly", LocatorSet::css("#weekly"));
            let err = perform_and_verify(&driver, &widget, &TargetState::option("x"), &config())
                .await
                .unwrap_err();
            assert!(matches!(err, SteadfastError::InvalidTarget { .. }));
        }
    }
}
