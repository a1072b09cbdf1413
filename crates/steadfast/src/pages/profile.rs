//! Profile page: the "Enable Tenant Ledger Report" section.
//!
//! The slider and both radio groups are custom widgets that routinely
//! swallow clicks, so every change goes through the verified-action engine.
//! Choosing a frequency or report type switches the slider on first, since
//! the radios are inert while it is off.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info};

use super::PageObject;
use crate::driver::PageDriver;
use crate::interactor::Interactor;
use crate::locator::{LocatorSet, Selector};
use crate::result::{SteadfastError, SteadfastResult};
use crate::verified::Verified;
use crate::wait::UrlPattern;
use crate::widget::{TargetState, Widget, WidgetState};

const SECTION_TITLE: &str = "Enable Tenant Ledger Report";

/// Budget for reading one radio
const RADIO_LOOKUP: Duration = Duration::from_secs(2);

fn radio(value: &str) -> LocatorSet {
    LocatorSet::css(format!(r#"input[value="{value}"][type="radio"]"#))
        .or_css(format!(r#"input[name*="{value}"][type="radio"]"#))
}

/// How often the ledger report is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Every day
    Daily,
    /// Every week
    Weekly,
    /// First day of each month
    Monthly,
}

impl Frequency {
    /// All options in page order
    pub const ALL: [Self; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    /// `value` attribute of the radio
    #[must_use]
    pub const fn value(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Label shown on the page
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "First of month",
        }
    }

    /// The radio for this option
    #[must_use]
    pub fn widget(self) -> Widget {
        Widget::radio(format!("frequency {}", self.value()), radio(self.value()))
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

impl FromStr for Frequency {
    type Err = SteadfastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" | "first of month" => Ok(Self::Monthly),
            other => Err(SteadfastError::config(format!("unknown frequency '{other}'"))),
        }
    }
}

/// Ledger report contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    /// Full report
    Full,
    /// Changes since the previous report
    Delta,
}

impl ReportType {
    /// All options in page order
    pub const ALL: [Self; 2] = [Self::Full, Self::Delta];

    /// `value` attribute of the radio
    #[must_use]
    pub const fn value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Delta => "delta",
        }
    }

    /// The radio for this option
    #[must_use]
    pub fn widget(self) -> Widget {
        Widget::radio(format!("report type {}", self.value()), radio(self.value()))
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

impl FromStr for ReportType {
    type Err = SteadfastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.strip_suffix(" report").unwrap_or(&lower) {
            "full" => Ok(Self::Full),
            "delta" => Ok(Self::Delta),
            other => Err(SteadfastError::config(format!("unknown report type '{other}'"))),
        }
    }
}

/// Outcome of [`ProfilePage::validate_ledger_section`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerValidation {
    /// Slider ended up on
    pub slider_enabled: bool,
    /// A frequency is selected
    pub frequency_selected: bool,
    /// A report type is selected
    pub report_type_selected: bool,
    /// Email input is visible
    pub email_field_present: bool,
    /// All of the above
    pub overall: bool,
}

/// Locators for the profile page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSelectors {
    /// Section heading, tried in order
    pub heading: LocatorSet,
    /// "Enable Tenant Ledger Report" switch
    pub slider: LocatorSet,
    /// Report email input
    pub email: LocatorSet,
}

impl Default for ProfileSelectors {
    fn default() -> Self {
        let heading = ["h5", "h4", "h3", "h2", "h1", ".subtitle-1", ".title", "label", "span"]
            .iter()
            .fold(
                LocatorSet::single(Selector::css_with_text("h5.subtitle-1", SECTION_TITLE)),
                |set, css| set.or(Selector::css_with_text(*css, SECTION_TITLE)),
            );
        Self {
            heading,
            slider: LocatorSet::css(r#"input[role="switch"][type="checkbox"]"#),
            email: LocatorSet::css(r#"input[type="email"]"#)
                .or(Selector::label("Enter Your Email Address")),
        }
    }
}

/// Profile page object
#[derive(Debug, Clone)]
pub struct ProfilePage<'a, D: PageDriver + ?Sized> {
    ui: Interactor<'a, D>,
    selectors: ProfileSelectors,
}

impl<'a, D: PageDriver + ?Sized> PageObject for ProfilePage<'a, D> {
    fn url_pattern(&self) -> UrlPattern {
        UrlPattern::glob("**/profile**")
    }
}

impl<'a, D: PageDriver + ?Sized> ProfilePage<'a, D> {
    /// Profile page with the default locators
    #[must_use]
    pub fn new(ui: Interactor<'a, D>) -> Self {
        Self::with_selectors(ui, ProfileSelectors::default())
    }

    /// Profile page with custom locators
    #[must_use]
    pub const fn with_selectors(ui: Interactor<'a, D>, selectors: ProfileSelectors) -> Self {
        Self { ui, selectors }
    }

    /// The ledger report slider
    #[must_use]
    pub fn slider(&self) -> Widget {
        Widget::toggle("tenant ledger report", self.selectors.slider.clone())
    }

    /// Wait for the ledger section heading, or the slider if no heading shows
    ///
    /// # Errors
    ///
    /// [`SteadfastError::NotFound`] if neither appears within `timeout`.
    pub async fn wait_for_page(&self, timeout: Duration) -> SteadfastResult<()> {
        let section = self.selectors.heading.clone().or(self.selectors.slider.primary().clone());
        let handle = self.ui.resolve_within(&section, timeout).await?;
        if handle.index() + 1 == section.len() {
            info!("ledger section heading not found, continuing with the slider");
        }
        info!("profile page loaded");
        Ok(())
    }

    async fn is_checked(&self, widget: &Widget, timeout: Duration) -> SteadfastResult<bool> {
        if !self.ui.wait_visible(&widget.locators, timeout).await? {
            return Ok(false);
        }
        Ok(self.ui.state(widget).await? == WidgetState::Checked(true))
    }

    /// Whether the slider is on
    ///
    /// # Errors
    ///
    /// Session faults only.
    pub async fn slider_state(&self) -> SteadfastResult<bool> {
        let timeout = self.ui.config().resolve.timeout;
        self.is_checked(&self.slider(), timeout).await
    }

    /// Drive the slider to `enabled`
    ///
    /// # Errors
    ///
    /// [`SteadfastError::NotFound`] or [`SteadfastError::ConvergenceFailure`].
    pub async fn set_slider_state(&self, enabled: bool) -> SteadfastResult<Verified> {
        let target = if enabled { TargetState::on() } else { TargetState::off() };
        let verified = self.ui.ensure(&self.slider(), target).await?;
        info!(enabled, "ledger report slider set");
        Ok(verified)
    }

    /// Flip the slider
    ///
    /// # Errors
    ///
    /// As [`Self::set_slider_state`].
    pub async fn toggle_slider(&self) -> SteadfastResult<Verified> {
        let current = self.slider_state().await?;
        self.set_slider_state(!current).await
    }

    /// Enable the report and choose `frequency`
    ///
    /// # Errors
    ///
    /// [`SteadfastError::NotFound`] or [`SteadfastError::ConvergenceFailure`].
    pub async fn select_frequency(&self, frequency: Frequency) -> SteadfastResult<Verified> {
        self.set_slider_state(true).await?;
        let verified = self.ui.ensure(&frequency.widget(), TargetState::on()).await?;
        info!(%frequency, "frequency selected");
        Ok(verified)
    }

    /// Enable the report and choose `report_type`
    ///
    /// # Errors
    ///
    /// [`SteadfastError::NotFound`] or [`SteadfastError::ConvergenceFailure`].
    pub async fn select_report_type(&self, report_type: ReportType) -> SteadfastResult<Verified> {
        self.set_slider_state(true).await?;
        let verified = self.ui.ensure(&report_type.widget(), TargetState::on()).await?;
        info!(%report_type, "report type selected");
        Ok(verified)
    }

    /// Checked frequency, if any
    ///
    /// # Errors
    ///
    /// Session faults only.
    pub async fn selected_frequency(&self) -> SteadfastResult<Option<Frequency>> {
        for frequency in Frequency::ALL {
            if self.is_checked(&frequency.widget(), RADIO_LOOKUP).await? {
                return Ok(Some(frequency));
            }
        }
        Ok(None)
    }

    /// Checked report type, if any
    ///
    /// # Errors
    ///
    /// Session faults only.
    pub async fn selected_report_type(&self) -> SteadfastResult<Option<ReportType>> {
        for report_type in ReportType::ALL {
            if self.is_checked(&report_type.widget(), RADIO_LOOKUP).await? {
                return Ok(Some(report_type));
            }
        }
        Ok(None)
    }

    /// Re-read the frequency until it is `expected`, within the retry policy
    ///
    /// # Errors
    ///
    /// [`SteadfastError::AssertionFailed`] naming what was seen instead.
    pub async fn expect_frequency(&self, expected: Frequency) -> SteadfastResult<()> {
        let policy = &self.ui.config().retry;
        let mut seen = None;
        for attempt in 1..=policy.max_attempts.max(1) {
            if attempt > 1 {
                tokio::time::sleep(policy.inter_attempt_delay).await;
            }
            seen = self.selected_frequency().await?;
            if seen == Some(expected) {
                return Ok(());
            }
        }
        Err(SteadfastError::assertion(format!(
            "expected frequency {expected}, found {}",
            seen.map_or_else(|| "none".to_string(), |f| f.to_string())
        )))
    }

    /// Re-read the report type until it is `expected`, within the retry policy
    ///
    /// # Errors
    ///
    /// [`SteadfastError::AssertionFailed`] naming what was seen instead.
    pub async fn expect_report_type(&self, expected: ReportType) -> SteadfastResult<()> {
        let policy = &self.ui.config().retry;
        let mut seen = None;
        for attempt in 1..=policy.max_attempts.max(1) {
            if attempt > 1 {
                tokio::time::sleep(policy.inter_attempt_delay).await;
            }
            seen = self.selected_report_type().await?;
            if seen == Some(expected) {
                return Ok(());
            }
        }
        Err(SteadfastError::assertion(format!(
            "expected report type {expected}, found {}",
            seen.map_or_else(|| "none".to_string(), |r| r.to_string())
        )))
    }

    /// Type the report email
    ///
    /// # Errors
    ///
    /// Resolution or fill errors.
    pub async fn enter_email(&self, email: &str) -> SteadfastResult<()> {
        self.ui.fill(&self.selectors.email, email).await?;
        info!(email, "report email entered");
        Ok(())
    }

    /// Current report email
    ///
    /// # Errors
    ///
    /// Resolution errors.
    pub async fn email(&self) -> SteadfastResult<Option<String>> {
        self.ui.value(&self.selectors.email).await
    }

    /// Switch the report on and make sure both radio groups have a choice,
    /// defaulting to daily / full. Every check is reported separately; only
    /// a session fault aborts.
    ///
    /// # Errors
    ///
    /// Session faults only.
    pub async fn validate_ledger_section(&self) -> SteadfastResult<LedgerValidation> {
        let mut result = LedgerValidation::default();

        result.slider_enabled = match self.set_slider_state(true).await {
            Ok(_) => self.slider_state().await?,
            Err(e) if e.is_session_fault() => return Err(e),
            Err(e) => {
                error!(error = %e, "could not enable the ledger report slider");
                false
            }
        };

        result.frequency_selected = match self.selected_frequency().await? {
            Some(frequency) => {
                info!(%frequency, "frequency already selected");
                true
            }
            None => match self.select_frequency(Frequency::Daily).await {
                Ok(_) => true,
                Err(e) if e.is_session_fault() => return Err(e),
                Err(e) => {
                    error!(error = %e, "could not select a default frequency");
                    false
                }
            },
        };

        result.report_type_selected = match self.selected_report_type().await? {
            Some(report_type) => {
                info!(%report_type, "report type already selected");
                true
            }
            None => match self.select_report_type(ReportType::Full).await {
                Ok(_) => true,
                Err(e) if e.is_session_fault() => return Err(e),
                Err(e) => {
                    error!(error = %e, "could not select a default report type");
                    false
                }
            },
        };

        result.email_field_present = self
            .ui
            .wait_visible(&self.selectors.email, Duration::from_secs(3))
            .await?;

        result.overall = result.slider_enabled
            && result.frequency_selected
            && result.report_type_selected
            && result.email_field_present;
        info!(
            slider = result.slider_enabled,
            frequency = result.frequency_selected,
            report_type = result.report_type_selected,
            email = result.email_field_present,
            overall = result.overall,
            "ledger section validated"
        );
        Ok(result)
    }
}
