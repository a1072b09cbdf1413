//! Launch pad: filter panel, organization search, toolbar links.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use super::PageObject;
use crate::driver::PageDriver;
use crate::interactor::Interactor;
use crate::locator::{LocatorSet, Selector};
use crate::result::SteadfastResult;
use crate::wait::UrlPattern;

/// Organization searched for when none is given
pub const DEFAULT_ORGANIZATION: &str = "The Jenkins Organization";

/// Toolbar router links (Profile, Dashboard, ...)
const NAV_LINK_CSS: &str = "a.v-btn--outlined.v-btn--router.v-btn--text.v-size--small";

/// Locators for the launch pad
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchPadSelectors {
    /// "Filter" button
    pub filter_button: LocatorSet,
    /// "Clear" button of the filter panel
    pub clear_button: LocatorSet,
    /// "Done" button of the filter panel
    pub done_button: LocatorSet,
    /// Organization search input
    pub organization_search: LocatorSet,
    /// Open dropdown menu
    pub dropdown: LocatorSet,
    /// Items inside the open dropdown
    pub dropdown_item_css: String,
    /// Toolbar router links
    pub nav_link_css: String,
}

impl Default for LaunchPadSelectors {
    fn default() -> Self {
        Self {
            filter_button: LocatorSet::single(Selector::css_with_text(
                "button.v-btn--outlined",
                "Filter",
            ))
            .or_css("button.v-btn--outlined:has(i.mdi-filter)"),
            clear_button: LocatorSet::single(Selector::css_with_text(
                "button.v-btn--outlined",
                "Clear",
            )),
            done_button: LocatorSet::single(Selector::css_with_text(
                "button.v-btn--has-bg.primary",
                "Done",
            )),
            organization_search: LocatorSet::css(
                r#"input[autofocus="autofocus"][type="text"][autocomplete="off"]"#,
            )
            .or(Selector::label("Search StorageDefender organizations")),
            dropdown: LocatorSet::css(".v-menu__content"),
            dropdown_item_css: ".v-menu__content .v-list-item".to_string(),
            nav_link_css: NAV_LINK_CSS.to_string(),
        }
    }
}

/// Launch pad page object
#[derive(Debug, Clone)]
pub struct LaunchPad<'a, D: PageDriver + ?Sized> {
    ui: Interactor<'a, D>,
    selectors: LaunchPadSelectors,
}

impl<'a, D: PageDriver + ?Sized> PageObject for LaunchPad<'a, D> {
    fn url_pattern(&self) -> UrlPattern {
        UrlPattern::Any
    }
}

impl<'a, D: PageDriver + ?Sized> LaunchPad<'a, D> {
    /// Launch pad with the default locators
    #[must_use]
    pub fn new(ui: Interactor<'a, D>) -> Self {
        Self::with_selectors(ui, LaunchPadSelectors::default())
    }

    /// Launch pad with custom locators
    #[must_use]
    pub const fn with_selectors(ui: Interactor<'a, D>, selectors: LaunchPadSelectors) -> Self {
        Self { ui, selectors }
    }

    /// Click "Filter"
    ///
    /// # Errors
    ///
    /// Resolution or click errors.
    pub async fn click_filter(&self) -> SteadfastResult<()> {
        self.ui.click(&self.selectors.filter_button).await
    }

    /// Click "Clear"
    ///
    /// # Errors
    ///
    /// Resolution or click errors.
    pub async fn click_clear(&self) -> SteadfastResult<()> {
        self.ui.click(&self.selectors.clear_button).await
    }

    /// Click "Done"
    ///
    /// # Errors
    ///
    /// Resolution or click errors.
    pub async fn click_done(&self) -> SteadfastResult<()> {
        self.ui.click(&self.selectors.done_button).await
    }

    /// Filter, Clear, Done
    ///
    /// # Errors
    ///
    /// The first step that fails.
    pub async fn reset_filters(&self) -> SteadfastResult<()> {
        self.click_filter().await?;
        self.click_clear().await?;
        self.click_done().await?;
        info!("filter panel cleared");
        Ok(())
    }

    /// Type into the organization search, then let the page settle
    ///
    /// # Errors
    ///
    /// Resolution or fill errors.
    pub async fn enter_organization(&self, name: &str) -> SteadfastResult<()> {
        self.ui.fill(&self.selectors.organization_search, "").await?;
        self.ui.fill(&self.selectors.organization_search, name).await?;
        self.ui.settle().await;
        info!(organization = name, "organization name entered");
        Ok(())
    }

    /// Whether the dropdown opens within `timeout`; absence is logged
    ///
    /// # Errors
    ///
    /// Session faults only.
    pub async fn wait_for_dropdown(&self, timeout: Duration) -> SteadfastResult<bool> {
        let open = self.ui.wait_visible(&self.selectors.dropdown, timeout).await?;
        if !open {
            warn!("organization dropdown did not open");
        }
        Ok(open)
    }

    /// Click `name` in the open dropdown
    ///
    /// # Errors
    ///
    /// [`crate::SteadfastError::NotFound`] if the option never shows.
    pub async fn select_from_dropdown(&self, name: &str) -> SteadfastResult<()> {
        self.wait_for_dropdown(Duration::from_secs(5)).await?;
        let option = LocatorSet::single(Selector::css_with_text(
            self.selectors.dropdown_item_css.clone(),
            name,
        ));
        self.ui.click(&option).await?;
        info!(organization = name, "organization selected");
        Ok(())
    }

    /// Enter `name` and optionally pick it from the dropdown
    ///
    /// # Errors
    ///
    /// The first step that fails.
    pub async fn search_organization(&self, name: &str, select: bool) -> SteadfastResult<()> {
        self.enter_organization(name).await?;
        if select {
            self.select_from_dropdown(name).await?;
        }
        Ok(())
    }

    /// Click a toolbar link such as "Profile" or "Dashboard"
    ///
    /// # Errors
    ///
    /// Resolution or click errors.
    pub async fn click_link(&self, text: &str) -> SteadfastResult<()> {
        let link = LocatorSet::single(Selector::css_with_text(
            self.selectors.nav_link_css.clone(),
            text,
        ))
        .or(Selector::css_with_text("a.v-btn--router", text));
        self.ui.click(&link).await?;
        info!(link = text, "navigation link clicked");
        Ok(())
    }
}
