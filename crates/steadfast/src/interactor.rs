//! Interactor: one driver plus one engine configuration.
//!
//! Page objects hold an `Interactor` instead of a driver so every step goes
//! through the resolver (fallback locators, bounded waits) and every widget
//! change goes through [`perform_and_verify`]. The driver is borrowed, never
//! stored globally.

use std::time::Duration;
use tracing::debug;

use crate::config::{as_millis, EngineConfig};
use crate::driver::PageDriver;
use crate::locator::{ClickOptions, LocatorSet};
use crate::resolver::{resolve, resolve_optional, ResolveOptions};
use crate::result::SteadfastResult;
use crate::verified::{perform_and_verify, Verified};
use crate::wait::{wait_for_url, UrlPattern, WaitOptions};
use crate::widget::{TargetState, Widget, WidgetHandle, WidgetState};

/// Engine facade bound to one page
#[derive(Debug)]
pub struct Interactor<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
    config: EngineConfig,
}

impl<'a, D: PageDriver + ?Sized> Clone for Interactor<'a, D> {
    fn clone(&self) -> Self {
        Self {
            driver: self.driver,
            config: self.config.clone(),
        }
    }
}

impl<'a, D: PageDriver + ?Sized> Interactor<'a, D> {
    /// Bind `driver` with `config`
    #[must_use]
    pub const fn new(driver: &'a D, config: EngineConfig) -> Self {
        Self { driver, config }
    }

    /// Underlying driver
    #[must_use]
    pub const fn driver(&self) -> &'a D {
        self.driver
    }

    /// Engine configuration
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn within(&self, timeout: Duration) -> ResolveOptions {
        self.config.resolve.clone().with_timeout(timeout)
    }

    /// Navigate and wait for DOM content
    ///
    /// # Errors
    ///
    /// Navigation or session errors from the driver.
    pub async fn goto(&self, url: &str, timeout: Duration) -> SteadfastResult<()> {
        debug!(url, "navigating");
        self.driver.navigate(url, timeout).await
    }

    /// Current page URL
    ///
    /// # Errors
    ///
    /// Session errors from the driver.
    pub async fn current_url(&self) -> SteadfastResult<String> {
        self.driver.current_url().await
    }

    /// Resolve with the configured timeout
    ///
    /// # Errors
    ///
    /// [`crate::SteadfastError::NotFound`] or a session fault.
    pub async fn resolve(&self, locators: &LocatorSet) -> SteadfastResult<WidgetHandle> {
        resolve(self.driver, locators, &self.config.resolve).await
    }

    /// Resolve with an explicit timeout
    ///
    /// # Errors
    ///
    /// [`crate::SteadfastError::NotFound`] or a session fault.
    pub async fn resolve_within(
        &self,
        locators: &LocatorSet,
        timeout: Duration,
    ) -> SteadfastResult<WidgetHandle> {
        resolve(self.driver, locators, &self.within(timeout)).await
    }

    /// Wait up to `timeout` for any candidate to show; absence is `Ok(false)`
    ///
    /// # Errors
    ///
    /// Session faults only.
    pub async fn wait_visible(&self, locators: &LocatorSet, timeout: Duration) -> SteadfastResult<bool> {
        Ok(resolve_optional(self.driver, locators, &self.within(timeout))
            .await?
            .is_some())
    }

    /// Whether any candidate is visible right now
    ///
    /// # Errors
    ///
    /// Session faults only.
    pub async fn is_visible(&self, locators: &LocatorSet) -> SteadfastResult<bool> {
        for selector in locators.candidates() {
            match self.driver.probe(selector).await {
                Ok(probe) if probe.is_usable() => return Ok(true),
                Ok(_) => {}
                Err(e) if e.is_session_fault() => return Err(e),
                Err(e) => debug!(locator = %selector, error = %e, "probe failed"),
            }
        }
        Ok(false)
    }

    /// Number of elements matching the first candidate that matches anything
    ///
    /// # Errors
    ///
    /// Probe errors from the driver.
    pub async fn count(&self, locators: &LocatorSet) -> SteadfastResult<usize> {
        for selector in locators.candidates() {
            let probe = self.driver.probe(selector).await?;
            if probe.is_present() {
                return Ok(probe.count);
            }
        }
        Ok(0)
    }

    /// Resolve, then click once
    ///
    /// # Errors
    ///
    /// Resolution errors, or [`crate::SteadfastError::InteractionBlocked`]
    /// if the click is refused.
    pub async fn click(&self, locators: &LocatorSet) -> SteadfastResult<()> {
        let handle = self.resolve(locators).await?;
        let options =
            ClickOptions::default().with_timeout(as_millis(self.config.retry.per_attempt_timeout));
        debug!(locator = %handle.selector(), "click");
        self.driver.click(handle.selector(), &options).await
    }

    /// Resolve, then replace the text of an input
    ///
    /// # Errors
    ///
    /// Resolution or fill errors.
    pub async fn fill(&self, locators: &LocatorSet, text: &str) -> SteadfastResult<()> {
        let handle = self.resolve(locators).await?;
        self.driver.fill(handle.selector(), text).await
    }

    /// Text of the element, `None` if it does not show up
    ///
    /// # Errors
    ///
    /// Session faults and driver errors other than absence.
    pub async fn text(&self, locators: &LocatorSet) -> SteadfastResult<Option<String>> {
        match resolve_optional(self.driver, locators, &self.config.resolve).await? {
            Some(handle) => self.driver.text_content(handle.selector()).await,
            None => Ok(None),
        }
    }

    /// Text of the element, waiting at most `timeout`
    ///
    /// # Errors
    ///
    /// Session faults and driver errors other than absence.
    pub async fn text_within(
        &self,
        locators: &LocatorSet,
        timeout: Duration,
    ) -> SteadfastResult<Option<String>> {
        match resolve_optional(self.driver, locators, &self.within(timeout)).await? {
            Some(handle) => self.driver.text_content(handle.selector()).await,
            None => Ok(None),
        }
    }

    /// Value of an input
    ///
    /// # Errors
    ///
    /// Resolution errors.
    pub async fn value(&self, locators: &LocatorSet) -> SteadfastResult<Option<String>> {
        let handle = self.resolve(locators).await?;
        self.driver.input_value(handle.selector()).await
    }

    /// Current state of a widget
    ///
    /// # Errors
    ///
    /// Resolution errors.
    pub async fn state(&self, widget: &Widget) -> SteadfastResult<WidgetState> {
        let handle = self.resolve(&widget.locators).await?;
        self.driver.read_state(handle.selector(), &widget.kind).await
    }

    /// Drive a widget to `target` and verify it holds
    ///
    /// # Errors
    ///
    /// See [`perform_and_verify`].
    pub async fn ensure(&self, widget: &Widget, target: TargetState) -> SteadfastResult<Verified> {
        perform_and_verify(self.driver, widget, &target, &self.config).await
    }

    /// Wait for the URL to match
    ///
    /// # Errors
    ///
    /// [`crate::SteadfastError::Timeout`] or a session fault.
    pub async fn wait_for_url(&self, pattern: &UrlPattern, timeout: Duration) -> SteadfastResult<String> {
        let options = WaitOptions::default()
            .with_timeout(timeout)
            .with_poll_interval(self.config.resolve.poll_interval);
        wait_for_url(self.driver, pattern, &options).await
    }

    /// Let the page settle for the configured delay
    pub async fn settle(&self) {
        tokio::time::sleep(self.config.settle_delay).await;
    }

    /// PNG screenshot
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub async fn screenshot(&self) -> SteadfastResult<Vec<u8>> {
        self.driver.screenshot().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::locator::Selector;
    use crate::mock::{MockDriver, MockElement};
    use crate::result::SteadfastError;

    fn interactor(driver: &MockDriver) -> Interactor<'_, MockDriver> {
        let config = EngineConfig::default().with_resolve(
            ResolveOptions::default().with_timeout(Duration::from_millis(500)),
        );
        Interactor::new(driver, config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_through_fallback() {
        let driver = MockDriver::new();
        let id = driver.add(Selector::css("input[type=\"email\"]"), MockElement::input(""));
        let ui = interactor(&driver);
        let email = LocatorSet::css("#email").or_css("input[type=\"email\"]");
        ui.fill(&email, "ops@example.com").await.unwrap();
        assert_eq!(driver.value(id), Some("ops@example.com".to_string()));
        assert_eq!(ui.value(&email).await.unwrap(), Some("ops@example.com".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_absent_is_none() {
        let driver = MockDriver::new();
        let ui = interactor(&driver);
        assert_eq!(ui.text(&LocatorSet::css(".v-toolbar__title")).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_visibility_and_count() {
        let driver = MockDriver::new();
        driver.add(Selector::css(".err"), MockElement::text("Required").hidden());
        let ui = interactor(&driver);
        let errors = LocatorSet::css(".err");
        assert!(!ui.is_visible(&errors).await.unwrap());
        assert_eq!(ui.count(&errors).await.unwrap(), 1);
        assert!(!ui.wait_visible(&errors, Duration::from_millis(200)).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_refused_by_overlay() {
        let driver = MockDriver::new();
        driver.add(Selector::css("#go"), MockElement::button().with_overlay());
        let err = interactor(&driver)
            .click(&LocatorSet::css("#go"))
            .await
            .unwrap_err();
        assert!(matches!(err, SteadfastError::InteractionBlocked { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_toggle() {
        let driver = MockDriver::new();
        let id = driver.add(Selector::css("#s"), MockElement::toggle(false));
        let ui = interactor(&driver);
        let widget = Widget::toggle("slider", LocatorSet::css("#s"));
        let verified = ui.ensure(&widget, TargetState::on()).await.unwrap();
        assert_eq!(verified.rounds, 1);
        assert_eq!(driver.checked(id), Some(true));
        assert_eq!(ui.state(&widget).await.unwrap(), WidgetState::Checked(true));
    }
}
