//! Built-in end-to-end scenarios.
//!
//! Each scenario drives one fresh session through the page objects and
//! returns a [`ScenarioReport`]. On failure the page is photographed before
//! the session is torn down, so the PNG shows the state that broke the run.

use chrono::Local;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use steadfast::pages::{
    ids, DeviceForm, DevicesPage, LaunchPad, LoginPage, ProfilePage, DEFAULT_ORGANIZATION,
};
use steadfast::{Config, Interactor, PageDriver, SteadfastError, SteadfastResult};
use tracing::{error, info, warn};

use crate::error::{CliError, CliResult};

const FORM_TIMEOUT: Duration = Duration::from_secs(5);
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(10);
const RESULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A built-in scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Sign in and land on the devices list
    Login,
    /// Sign in and add a device with generated identifiers
    AddDevice,
    /// Sign in, reset the launch-pad filters and pick an organization
    LaunchFilter,
    /// Sign in, open the profile and enable the tenant ledger report
    LedgerReport,
}

impl Scenario {
    /// Every scenario, in listing order
    pub const ALL: [Self; 4] = [
        Self::Login,
        Self::AddDevice,
        Self::LaunchFilter,
        Self::LedgerReport,
    ];

    /// Command-line name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::AddDevice => "add-device",
            Self::LaunchFilter => "launch-filter",
            Self::LedgerReport => "ledger-report",
        }
    }

    /// One-line description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Login => "Sign in and land on the devices list",
            Self::AddDevice => "Add a device with generated external and short IDs",
            Self::LaunchFilter => "Reset launch-pad filters and select an organization",
            Self::LedgerReport => "Enable the tenant ledger report with a frequency and type",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|known| known.name()).collect();
                CliError::invalid_argument(format!(
                    "unknown scenario '{s}' (available: {})",
                    known.join(", ")
                ))
            })
    }
}

/// Login credentials
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything a scenario needs besides the driver
#[derive(Debug, Clone)]
pub struct ScenarioInputs {
    /// Effective configuration
    pub config: Config,
    /// Login credentials
    pub credentials: Credentials,
    /// Add-device field values; IDs left empty are generated
    pub device: DeviceForm,
    /// Organization for the launch-pad search
    pub organization: String,
    /// Where failure screenshots go
    pub output_dir: PathBuf,
}

impl ScenarioInputs {
    /// Inputs with the given configuration and credentials
    #[must_use]
    pub fn new(config: Config, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
            device: DeviceForm::default(),
            organization: DEFAULT_ORGANIZATION.to_string(),
            output_dir: PathBuf::from("target/steadfast"),
        }
    }

    /// Set the add-device form
    #[must_use]
    pub fn with_device(mut self, device: DeviceForm) -> Self {
        self.device = device;
        self
    }

    /// Set the organization
    #[must_use]
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = organization.into();
        self
    }

    /// Set the screenshot directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

/// What a passing scenario did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub scenario: String,
    /// URL at the end of the run
    pub final_url: String,
    /// Widgets that only converged through the scripted-event fallback
    pub fallback_widgets: Vec<String>,
    /// Notable facts worth printing
    pub notes: Vec<String>,
}

impl ScenarioReport {
    fn new(scenario: Scenario) -> Self {
        Self {
            scenario: scenario.name().to_string(),
            ..Self::default()
        }
    }
}

/// Run `scenario` on an open session, screenshotting on failure.
///
/// # Errors
///
/// [`CliError::Scenario`] with the screenshot path when the scenario fails.
pub async fn execute<D>(
    driver: &D,
    scenario: Scenario,
    inputs: &ScenarioInputs,
) -> CliResult<ScenarioReport>
where
    D: PageDriver + ?Sized,
{
    info!(%scenario, "scenario started");
    match run(driver, scenario, inputs).await {
        Ok(report) => {
            info!(%scenario, fallbacks = report.fallback_widgets.len(), "scenario passed");
            Ok(report)
        }
        Err(source) => {
            error!(%scenario, error = %source, "scenario failed");
            let screenshot = if source.is_session_fault() {
                None
            } else {
                capture_failure(driver, scenario, &inputs.output_dir).await
            };
            Err(CliError::Scenario {
                scenario: scenario.name().to_string(),
                source,
                screenshot,
            })
        }
    }
}

/// Run `scenario` without failure handling
///
/// # Errors
///
/// The first step that fails.
pub async fn run<D>(
    driver: &D,
    scenario: Scenario,
    inputs: &ScenarioInputs,
) -> SteadfastResult<ScenarioReport>
where
    D: PageDriver + ?Sized,
{
    let ui = Interactor::new(driver, inputs.config.engine.clone());
    let mut report = ScenarioReport::new(scenario);

    sign_in(ui.clone(), inputs).await?;

    match scenario {
        Scenario::Login => {
            report.notes.push("signed in".to_string());
        }
        Scenario::AddDevice => add_device(ui.clone(), inputs, &mut report).await?,
        Scenario::LaunchFilter => launch_filter(ui.clone(), inputs, &mut report).await?,
        Scenario::LedgerReport => ledger_report(ui.clone(), &mut report).await?,
    }

    report.final_url = ui.current_url().await?;
    Ok(report)
}

async fn sign_in<D>(ui: Interactor<'_, D>, inputs: &ScenarioInputs) -> SteadfastResult<()>
where
    D: PageDriver + ?Sized,
{
    let session = &inputs.config.session;
    let page = LoginPage::new(ui);
    page.open(&session.base_url, session.navigation_timeout).await?;
    if !page.wait_for_form(FORM_TIMEOUT).await? {
        warn!("login form not detected, trying to sign in anyway");
    }
    page.login(&inputs.credentials.username, &inputs.credentials.password)
        .await?;
    if page.wait_for_navigation(NAVIGATION_TIMEOUT).await? {
        return Ok(());
    }
    let reason = page
        .error_message()
        .await?
        .unwrap_or_else(|| "no navigation after submitting credentials".to_string());
    Err(SteadfastError::assertion(format!("login failed: {reason}")))
}

async fn add_device<D>(
    ui: Interactor<'_, D>,
    inputs: &ScenarioInputs,
    report: &mut ScenarioReport,
) -> SteadfastResult<()>
where
    D: PageDriver + ?Sized,
{
    let form = with_generated_ids(inputs.device.clone());
    let page = DevicesPage::new(ui);
    page.click_add().await?;
    page.wait_for_form(FORM_TIMEOUT).await?;
    page.fill_form(&form).await?;
    page.submit().await?;
    let message = page.verify_device_added(RESULT_TIMEOUT).await?;

    report.fallback_widgets = page.fallback_widgets();
    if let Some(id) = &form.external_id {
        report.notes.push(format!("external id {id}"));
    }
    if let Some(id) = &form.short_id {
        report.notes.push(format!("short id {id}"));
    }
    report.notes.push(message);
    Ok(())
}

/// Fill missing identifiers; the RNG never lives across an await
fn with_generated_ids(mut form: DeviceForm) -> DeviceForm {
    let mut rng = rand::thread_rng();
    if form.external_id.is_none() {
        form.external_id = Some(ids::external_device_id(&mut rng));
    }
    if form.short_id.is_none() {
        form.short_id = Some(ids::short_id(&mut rng));
    }
    form
}

async fn launch_filter<D>(
    ui: Interactor<'_, D>,
    inputs: &ScenarioInputs,
    report: &mut ScenarioReport,
) -> SteadfastResult<()>
where
    D: PageDriver + ?Sized,
{
    let pad = LaunchPad::new(ui);
    pad.reset_filters().await?;
    pad.search_organization(&inputs.organization, true).await?;
    report
        .notes
        .push(format!("selected organization {}", inputs.organization));
    Ok(())
}

async fn ledger_report<D>(ui: Interactor<'_, D>, report: &mut ScenarioReport) -> SteadfastResult<()>
where
    D: PageDriver + ?Sized,
{
    LaunchPad::new(ui.clone()).click_link("Profile").await?;
    let page = ProfilePage::new(ui);
    page.wait_for_page(NAVIGATION_TIMEOUT).await?;
    let validation = page.validate_ledger_section().await?;
    if !validation.overall {
        return Err(SteadfastError::assertion(format!(
            "tenant ledger section incomplete: {validation:?}"
        )));
    }
    if let Some(frequency) = page.selected_frequency().await? {
        report.notes.push(format!("frequency {frequency}"));
    }
    if let Some(report_type) = page.selected_report_type().await? {
        report.notes.push(format!("report type {report_type}"));
    }
    Ok(())
}

/// Write a PNG of the current page; problems are logged, not raised
async fn capture_failure<D>(driver: &D, scenario: Scenario, dir: &Path) -> Option<PathBuf>
where
    D: PageDriver + ?Sized,
{
    let png = match driver.screenshot().await {
        Ok(png) => png,
        Err(e) => {
            warn!(error = %e, "could not capture failure screenshot");
            return None;
        }
    };
    let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let path = dir.join(screenshot_name(scenario, &stamp));
    let written = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, png));
    match written {
        Ok(()) => {
            info!(path = %path.display(), "failure screenshot saved");
            Some(path)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not write failure screenshot");
            None
        }
    }
}

fn screenshot_name(scenario: Scenario, stamp: &str) -> String {
    format!("{}-failure-{stamp}.png", scenario.name())
}
