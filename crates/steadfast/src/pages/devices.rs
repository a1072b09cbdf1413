//! Devices list and the add-device form.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

use super::PageObject;
use crate::driver::PageDriver;
use crate::interactor::Interactor;
use crate::locator::{LocatorSet, Selector};
use crate::result::{SteadfastError, SteadfastResult};
use crate::verified::Verified;
use crate::wait::{poll_until, UrlPattern, WaitOptions};
use crate::widget::{TargetState, Widget};

/// Path of the add-device form
pub const ADD_DEVICE_PATH: &str = "/devices/new";

/// Option items of an open Vuetify menu
const MENU_OPTIONS_CSS: &str = ".v-menu__content .v-list-item";

/// The `v-select` whose label reads `label`
fn v_select(label: &str) -> LocatorSet {
    LocatorSet::single(Selector::css_with_child_text("div.v-select", "label", label))
        .or(Selector::label(label))
}

/// Locators for the devices pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicesSelectors {
    /// "Devices" entry of the navigation drawer
    pub menu_item: LocatorSet,
    /// "Add" link on the devices list
    pub add_button: LocatorSet,
    /// The add-device form
    pub form: LocatorSet,
    /// External device ID input (autofocused)
    pub external_id: LocatorSet,
    /// Short ID input
    pub short_id: LocatorSet,
    /// Type dropdown
    pub device_type: LocatorSet,
    /// Subtype dropdown
    pub subtype: LocatorSet,
    /// Status dropdown
    pub status: LocatorSet,
    /// Disposition dropdown
    pub disposition: LocatorSet,
    /// Assigned organization dropdown
    pub organization: LocatorSet,
    /// Option items of an open dropdown
    pub menu_options_css: String,
    /// Submit button
    pub submit: LocatorSet,
    /// Success notifications, tried in order
    pub success_message: LocatorSet,
    /// Validation messages
    pub error_message: LocatorSet,
}

impl Default for DevicesSelectors {
    fn default() -> Self {
        Self {
            menu_item: LocatorSet::single(Selector::css_with_text(
                "div.v-list-item__content",
                "Devices",
            )),
            add_button: LocatorSet::css(r#"a[href="/devices/new"]"#),
            form: LocatorSet::css("form"),
            external_id: LocatorSet::css(r#"input[type="text"][autofocus]"#)
                .or(Selector::label("External Device ID")),
            short_id: LocatorSet::single(Selector::label("Short ID")),
            device_type: v_select("Type"),
            subtype: v_select("Subtype"),
            status: v_select("Status"),
            disposition: v_select("Disposition"),
            organization: v_select("Assigned Organization"),
            menu_options_css: MENU_OPTIONS_CSS.to_string(),
            submit: LocatorSet::single(Selector::css_with_text(
                r#"button[type="submit"]"#,
                "Add Device",
            )),
            success_message: LocatorSet::css(".v-snack__content")
                .or_css(".v-alert--success")
                .or_css(".success-message")
                .or_css(".alert-success")
                .or(Selector::test_id("success-message"))
                .or_css(".notification-success"),
            error_message: LocatorSet::css(".v-messages__wrapper"),
        }
    }
}

/// Values for the add-device form; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceForm {
    /// External device ID
    pub external_id: Option<String>,
    /// Short ID
    pub short_id: Option<String>,
    /// Type option label
    pub device_type: Option<String>,
    /// Subtype option label
    pub subtype: Option<String>,
    /// Status option label
    pub status: Option<String>,
    /// Disposition option label
    pub disposition: Option<String>,
    /// Assigned organization option label
    pub organization: Option<String>,
}

impl DeviceForm {
    /// Set the external device ID
    #[must_use]
    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    /// Set the short ID
    #[must_use]
    pub fn with_short_id(mut self, id: impl Into<String>) -> Self {
        self.short_id = Some(id.into());
        self
    }

    /// Set the type
    #[must_use]
    pub fn with_type(mut self, label: impl Into<String>) -> Self {
        self.device_type = Some(label.into());
        self
    }

    /// Set the subtype
    #[must_use]
    pub fn with_subtype(mut self, label: impl Into<String>) -> Self {
        self.subtype = Some(label.into());
        self
    }

    /// Set the status
    #[must_use]
    pub fn with_status(mut self, label: impl Into<String>) -> Self {
        self.status = Some(label.into());
        self
    }

    /// Set the disposition
    #[must_use]
    pub fn with_disposition(mut self, label: impl Into<String>) -> Self {
        self.disposition = Some(label.into());
        self
    }

    /// Set the assigned organization
    #[must_use]
    pub fn with_organization(mut self, label: impl Into<String>) -> Self {
        self.organization = Some(label.into());
        self
    }
}

/// Devices page object
#[derive(Debug)]
pub struct DevicesPage<'a, D: PageDriver + ?Sized> {
    ui: Interactor<'a, D>,
    selectors: DevicesSelectors,
    fallbacks: Mutex<Vec<String>>,
}

impl<'a, D: PageDriver + ?Sized> PageObject for DevicesPage<'a, D> {
    fn url_pattern(&self) -> UrlPattern {
        UrlPattern::glob("**/devices**")
    }
}

impl<'a, D: PageDriver + ?Sized> DevicesPage<'a, D> {
    /// Devices page with the default locators
    #[must_use]
    pub fn new(ui: Interactor<'a, D>) -> Self {
        Self::with_selectors(ui, DevicesSelectors::default())
    }

    /// Devices page with custom locators
    #[must_use]
    pub fn with_selectors(ui: Interactor<'a, D>, selectors: DevicesSelectors) -> Self {
        Self {
            ui,
            selectors,
            fallbacks: Mutex::new(Vec::new()),
        }
    }

    /// Locators in use
    #[must_use]
    pub const fn selectors(&self) -> &DevicesSelectors {
        &self.selectors
    }

    /// Dropdowns that only took their value through the scripted-event fallback
    #[must_use]
    pub fn fallback_widgets(&self) -> Vec<String> {
        self.fallbacks
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }

    /// Open `<base>/devices`
    ///
    /// # Errors
    ///
    /// Navigation failures.
    pub async fn open(&self, base_url: &str, timeout: Duration) -> SteadfastResult<()> {
        let url = format!("{}/devices", base_url.trim_end_matches('/'));
        info!(%url, "opening devices page");
        self.ui.goto(&url, timeout).await
    }

    /// Click "Devices" in the navigation drawer
    ///
    /// # Errors
    ///
    /// Resolution or click errors.
    pub async fn click_menu_item(&self) -> SteadfastResult<()> {
        self.ui.click(&self.selectors.menu_item).await
    }

    /// Click "Add"; a URL other than the add form is logged, not fatal
    ///
    /// # Errors
    ///
    /// Resolution or click errors.
    pub async fn click_add(&self) -> SteadfastResult<()> {
        self.ui
            .resolve_within(&self.selectors.add_button, Duration::from_secs(2))
            .await?;
        self.ui.click(&self.selectors.add_button).await?;
        let url = self.ui.current_url().await?;
        if url.contains(ADD_DEVICE_PATH) {
            info!(%url, "on add-device form");
        } else {
            warn!(%url, "not on the add-device form after clicking Add, continuing");
        }
        Ok(())
    }

    /// Wait for the form and its autofocused first input
    ///
    /// # Errors
    ///
    /// [`SteadfastError::NotFound`] if the form does not show.
    pub async fn wait_for_form(&self, timeout: Duration) -> SteadfastResult<()> {
        self.ui.resolve_within(&self.selectors.form, timeout).await?;
        self.ui
            .resolve_within(&self.selectors.external_id, timeout)
            .await?;
        info!("add-device form is ready");
        Ok(())
    }

    /// Replace the external device ID
    ///
    /// # Errors
    ///
    /// Resolution or fill errors.
    pub async fn enter_external_id(&self, id: &str) -> SteadfastResult<()> {
        self.ui.fill(&self.selectors.external_id, "").await?;
        self.ui.fill(&self.selectors.external_id, id).await?;
        info!(external_id = id, "external device ID entered");
        Ok(())
    }

    /// Empty the external device ID
    ///
    /// # Errors
    ///
    /// Resolution or fill errors.
    pub async fn clear_external_id(&self) -> SteadfastResult<()> {
        self.ui.fill(&self.selectors.external_id, "").await
    }

    /// Replace the short ID
    ///
    /// # Errors
    ///
    /// Resolution or fill errors.
    pub async fn enter_short_id(&self, id: &str) -> SteadfastResult<()> {
        self.ui.fill(&self.selectors.short_id, "").await?;
        self.ui.fill(&self.selectors.short_id, id).await?;
        info!(short_id = id, "short ID entered");
        Ok(())
    }

    async fn choose(&self, name: &str, locators: &LocatorSet, label: &str) -> SteadfastResult<Verified> {
        let widget = Widget::select(name, locators.clone(), self.selectors.menu_options_css.clone());
        let verified = self.ui.ensure(&widget, TargetState::option(label)).await?;
        if verified.needed_fallback() {
            if let Ok(mut fallbacks) = self.fallbacks.lock() {
                fallbacks.push(name.to_string());
            }
        }
        info!(widget = name, option = label, "selected");
        Ok(verified)
    }

    /// Select the device type
    ///
    /// # Errors
    ///
    /// [`SteadfastError::NotFound`] or [`SteadfastError::ConvergenceFailure`].
    pub async fn select_type(&self, label: &str) -> SteadfastResult<Verified> {
        self.choose("type", &self.selectors.device_type, label).await
    }

    /// Select the subtype
    ///
    /// # Errors
    ///
    /// [`SteadfastError::NotFound`] or [`SteadfastError::ConvergenceFailure`].
    pub async fn select_subtype(&self, label: &str) -> SteadfastResult<Verified> {
        self.choose("subtype", &self.selectors.subtype, label).await
    }

    /// Select the status
    ///
    /// # Errors
    ///
    /// [`SteadfastError::NotFound`] or [`SteadfastError::ConvergenceFailure`].
    pub async fn select_status(&self, label: &str) -> SteadfastResult<Verified> {
        self.choose("status", &self.selectors.status, label).await
    }

    /// Select the disposition
    ///
    /// # Errors
    ///
    /// [`SteadfastError::NotFound`] or [`SteadfastError::ConvergenceFailure`].
    pub async fn select_disposition(&self, label: &str) -> SteadfastResult<Verified> {
        self.choose("disposition", &self.selectors.disposition, label).await
    }

    /// Select the assigned organization
    ///
    /// # Errors
    ///
    /// [`SteadfastError::NotFound`] or [`SteadfastError::ConvergenceFailure`].
    pub async fn select_organization(&self, label: &str) -> SteadfastResult<Verified> {
        self.choose("assigned organization", &self.selectors.organization, label)
            .await
    }

    /// Fill every field set in `form`
    ///
    /// # Errors
    ///
    /// The first field that fails.
    pub async fn fill_form(&self, form: &DeviceForm) -> SteadfastResult<()> {
        if let Some(id) = &form.external_id {
            self.enter_external_id(id).await?;
        }
        if let Some(label) = &form.device_type {
            self.select_type(label).await?;
        }
        if let Some(label) = &form.subtype {
            self.select_subtype(label).await?;
        }
        if let Some(id) = &form.short_id {
            self.enter_short_id(id).await?;
        }
        if let Some(label) = &form.status {
            self.select_status(label).await?;
        }
        if let Some(label) = &form.disposition {
            self.select_disposition(label).await?;
        }
        if let Some(label) = &form.organization {
            self.select_organization(label).await?;
        }
        Ok(())
    }

    /// Click "Add Device"
    ///
    /// # Errors
    ///
    /// Resolution or click errors.
    pub async fn submit(&self) -> SteadfastResult<()> {
        self.ui.click(&self.selectors.submit).await?;
        info!("add device submitted");
        Ok(())
    }

    /// First non-empty success notification within `timeout`
    ///
    /// # Errors
    ///
    /// Session faults only.
    pub async fn success_message(&self, timeout: Duration) -> SteadfastResult<Option<String>> {
        let found: Mutex<Option<String>> = Mutex::new(None);
        let options = WaitOptions::default()
            .with_timeout(timeout)
            .with_poll_interval(self.ui.config().resolve.poll_interval);
        let driver = self.ui.driver();
        let candidates = self.selectors.success_message.candidates();
        let slot = &found;
        let waited = poll_until(&options, "success message", move || async move {
            for selector in candidates {
                if let Some(text) = driver.text_content(selector).await? {
                    let text = text.trim();
                    if !text.is_empty() {
                        info!(locator = %selector, message = text, "success message found");
                        if let Ok(mut slot) = slot.lock() {
                            *slot = Some(text.to_string());
                        }
                        return Ok(true);
                    }
                }
            }
            Ok::<_, SteadfastError>(false)
        })
        .await;
        match waited {
            Ok(_) => Ok(found.into_inner().unwrap_or_default()),
            Err(SteadfastError::Timeout { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether a validation message shows within `timeout`
    ///
    /// # Errors
    ///
    /// Session faults only.
    pub async fn is_error_visible(&self, timeout: Duration) -> SteadfastResult<bool> {
        self.ui.wait_visible(&self.selectors.error_message, timeout).await
    }

    /// Text of the validation message, if any
    ///
    /// # Errors
    ///
    /// Session faults only.
    pub async fn error_message(&self, timeout: Duration) -> SteadfastResult<Option<String>> {
        if self.is_error_visible(timeout).await? {
            self.ui.text_within(&self.selectors.error_message, timeout).await
        } else {
            Ok(None)
        }
    }

    /// Whether the add-device form is the current page
    ///
    /// # Errors
    ///
    /// Session errors.
    pub async fn is_on_add_device_page(&self) -> SteadfastResult<bool> {
        Ok(self.ui.current_url().await?.contains(ADD_DEVICE_PATH))
    }

    /// Confirm the submission went through.
    ///
    /// Returns the success message when one shows. Still being on the form
    /// with a validation message is a failure carrying that message.
    ///
    /// # Errors
    ///
    /// [`SteadfastError::AssertionFailed`] for a validation error or when no
    /// success message appears.
    pub async fn verify_device_added(&self, timeout: Duration) -> SteadfastResult<String> {
        if let Some(message) = self.success_message(timeout).await? {
            return Ok(message);
        }
        let url = self.ui.current_url().await?;
        info!(%url, "no success message after submission");
        if url.contains(ADD_DEVICE_PATH) {
            if let Some(error) = self.error_message(Duration::from_secs(2)).await? {
                return Err(SteadfastError::assertion(format!(
                    "form validation error: {error}"
                )));
            }
        }
        Err(SteadfastError::assertion(format!(
            "no success message within {}ms (at {url})",
            timeout.as_millis()
        )))
    }
}
