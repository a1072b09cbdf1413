//! Login page.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use super::PageObject;
use crate::driver::PageDriver;
use crate::interactor::Interactor;
use crate::locator::{LocatorSet, Selector};
use crate::result::SteadfastResult;
use crate::wait::UrlPattern;

/// Default budget for optional login-page lookups (2 seconds)
const QUICK_LOOKUP: Duration = Duration::from_secs(2);

/// Locators for the login form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSelectors {
    /// Username input
    pub username: LocatorSet,
    /// Password input
    pub password: LocatorSet,
    /// Submit button
    pub login_button: LocatorSet,
    /// Cancel button
    pub cancel_button: LocatorSet,
    /// "Forgot Password?" link
    pub forgot_password: LocatorSet,
    /// Toolbar title
    pub title: LocatorSet,
    /// The form itself
    pub form: LocatorSet,
    /// Validation message wrappers
    pub error_message: LocatorSet,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            username: LocatorSet::css(r#"input[type="text"]"#).or(Selector::label("Username")),
            password: LocatorSet::css(r#"input[type="password"]"#).or(Selector::label("Password")),
            login_button: LocatorSet::css(r#"button[type="submit"]"#),
            cancel_button: LocatorSet::single(Selector::css_with_text("button", "Cancel")),
            forgot_password: LocatorSet::single(Selector::css_with_text("a", "Forgot Password?")),
            title: LocatorSet::css(".v-toolbar__title"),
            form: LocatorSet::css("form"),
            error_message: LocatorSet::css(".v-messages__wrapper"),
        }
    }
}

/// Visibility of each login form element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormElementStates {
    /// Username input visible
    pub username_field: bool,
    /// Password input visible
    pub password_field: bool,
    /// Login button visible
    pub login_button: bool,
    /// Cancel button visible
    pub cancel_button: bool,
    /// Forgot-password link visible
    pub forgot_password_link: bool,
    /// Form visible
    pub form: bool,
}

/// Login page object
#[derive(Debug, Clone)]
pub struct LoginPage<'a, D: PageDriver + ?Sized> {
    ui: Interactor<'a, D>,
    selectors: LoginSelectors,
}

impl<'a, D: PageDriver + ?Sized> PageObject for LoginPage<'a, D> {
    fn url_pattern(&self) -> UrlPattern {
        UrlPattern::Any
    }
}

impl<'a, D: PageDriver + ?Sized> LoginPage<'a, D> {
    /// Login page with the default locators
    #[must_use]
    pub fn new(ui: Interactor<'a, D>) -> Self {
        Self::with_selectors(ui, LoginSelectors::default())
    }

    /// Login page with custom locators
    #[must_use]
    pub const fn with_selectors(ui: Interactor<'a, D>, selectors: LoginSelectors) -> Self {
        Self { ui, selectors }
    }

    /// Locators in use
    #[must_use]
    pub const fn selectors(&self) -> &LoginSelectors {
        &self.selectors
    }

    /// Open the application root
    ///
    /// # Errors
    ///
    /// Navigation failures.
    pub async fn open(&self, base_url: &str, timeout: Duration) -> SteadfastResult<()> {
        info!(url = base_url, "opening login page");
        self.ui.goto(base_url, timeout).await
    }

    /// Wait for the form; a missing form is logged and tolerated
    ///
    /// # Errors
    ///
    /// Session faults only.
    pub async fn wait_for_form(&self, timeout: Duration) -> SteadfastResult<bool> {
        let found = self.ui.wait_visible(&self.selectors.form, timeout).await?;
        if !found {
            warn!("login form not found, continuing");
        }
        Ok(found)
    }

    /// Whether the form is visible
    ///
    /// # Errors
    ///
    /// Session faults only.
    pub async fn is_form_visible(&self) -> SteadfastResult<bool> {
        self.ui.is_visible(&self.selectors.form).await
    }

    /// Toolbar title, `None` if it does not show within two seconds
    ///
    /// # Errors
    ///
    /// Session faults only.
    pub async fn title(&self) -> SteadfastResult<Option<String>> {
        self.ui.text_within(&self.selectors.title, QUICK_LOOKUP).await
    }

    /// Type the username
    ///
    /// # Errors
    ///
    /// Resolution or fill errors.
    pub async fn enter_username(&self, username: &str) -> SteadfastResult<()> {
        self.ui.fill(&self.selectors.username, username).await
    }

    /// Type the password
    ///
    /// # Errors
    ///
    /// Resolution or fill errors.
    pub async fn enter_password(&self, password: &str) -> SteadfastResult<()> {
        self.ui.fill(&self.selectors.password, password).await
    }

    /// Empty the username field
    ///
    /// # Errors
    ///
    /// Resolution or fill errors.
    pub async fn clear_username(&self) -> SteadfastResult<()> {
        self.enter_username("").await
    }

    /// Empty the password field
    ///
    /// # Errors
    ///
    /// Resolution or fill errors.
    pub async fn clear_password(&self) -> SteadfastResult<()> {
        self.enter_password("").await
    }

    /// Current username value
    ///
    /// # Errors
    ///
    /// Resolution errors.
    pub async fn username_value(&self) -> SteadfastResult<String> {
        Ok(self.ui.value(&self.selectors.username).await?.unwrap_or_default())
    }

    /// Current password value
    ///
    /// # Errors
    ///
    /// Resolution errors.
    pub async fn password_value(&self) -> SteadfastResult<String> {
        Ok(self.ui.value(&self.selectors.password).await?.unwrap_or_default())
    }

    /// Username field is empty
    ///
    /// # Errors
    ///
    /// Resolution errors.
    pub async fn is_username_empty(&self) -> SteadfastResult<bool> {
        Ok(self.username_value().await?.is_empty())
    }

    /// Password field is empty
    ///
    /// # Errors
    ///
    /// Resolution errors.
    pub async fn is_password_empty(&self) -> SteadfastResult<bool> {
        Ok(self.password_value().await?.is_empty())
    }

    /// Click "login"
    ///
    /// # Errors
    ///
    /// Resolution or click errors.
    pub async fn click_login(&self) -> SteadfastResult<()> {
        self.ui.click(&self.selectors.login_button).await
    }

    /// Click "Cancel"
    ///
    /// # Errors
    ///
    /// Resolution or click errors.
    pub async fn click_cancel(&self) -> SteadfastResult<()> {
        self.ui.click(&self.selectors.cancel_button).await
    }

    /// Click "Forgot Password?"
    ///
    /// # Errors
    ///
    /// Resolution or click errors.
    pub async fn click_forgot_password(&self) -> SteadfastResult<()> {
        self.ui.click(&self.selectors.forgot_password).await
    }

    /// Fill both fields and submit
    ///
    /// # Errors
    ///
    /// Any step failing.
    pub async fn login(&self, username: &str, password: &str) -> SteadfastResult<()> {
        self.enter_username(username).await?;
        self.enter_password(password).await?;
        self.click_login().await?;
        info!(username, "credentials submitted");
        Ok(())
    }

    /// Whether a validation message shows within `timeout`
    ///
    /// # Errors
    ///
    /// Session faults only.
    pub async fn is_error_visible(&self, timeout: Duration) -> SteadfastResult<bool> {
        self.ui.wait_visible(&self.selectors.error_message, timeout).await
    }

    /// Text of the first validation message
    ///
    /// # Errors
    ///
    /// Session faults only.
    pub async fn error_message(&self) -> SteadfastResult<Option<String>> {
        if self.is_error_visible(QUICK_LOOKUP).await? {
            self.ui.text_within(&self.selectors.error_message, QUICK_LOOKUP).await
        } else {
            Ok(None)
        }
    }

    /// Number of validation message wrappers on the page
    ///
    /// # Errors
    ///
    /// Probe errors.
    pub async fn error_count(&self) -> SteadfastResult<usize> {
        self.ui.count(&self.selectors.error_message).await
    }

    /// Whether the app moved on to the devices list within `timeout`
    ///
    /// # Errors
    ///
    /// Session faults only.
    pub async fn wait_for_navigation(&self, timeout: Duration) -> SteadfastResult<bool> {
        match self
            .ui
            .wait_for_url(&UrlPattern::glob("**/devices**"), timeout)
            .await
        {
            Ok(url) => {
                info!(%url, "navigated after login");
                Ok(true)
            }
            Err(e) if e.is_session_fault() => Err(e),
            Err(_) => Ok(false),
        }
    }

    /// Current URL
    ///
    /// # Errors
    ///
    /// Session errors.
    pub async fn current_url(&self) -> SteadfastResult<String> {
        self.ui.current_url().await
    }

    /// Visibility of every form element
    ///
    /// # Errors
    ///
    /// Session faults only.
    pub async fn form_element_states(&self) -> SteadfastResult<FormElementStates> {
        let s = &self.selectors;
        Ok(FormElementStates {
            username_field: self.ui.is_visible(&s.username).await?,
            password_field: self.ui.is_visible(&s.password).await?,
            login_button: self.ui.is_visible(&s.login_button).await?,
            cancel_button: self.ui.is_visible(&s.cancel_button).await?,
            forgot_password_link: self.ui.is_visible(&s.forgot_password).await?,
            form: self.ui.is_visible(&s.form).await?,
        })
    }

    /// Username, password, login button and forgot link are all visible
    ///
    /// # Errors
    ///
    /// Session faults only.
    pub async fn form_elements_present(&self) -> SteadfastResult<bool> {
        let states = self.form_element_states().await?;
        Ok(states.username_field
            && states.password_field
            && states.login_button
            && states.forgot_password_link)
    }
}
