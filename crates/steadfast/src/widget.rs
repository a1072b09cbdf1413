//! Widgets, their observable state, and the states callers ask for.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::locator::{LocatorSet, Selector};
use crate::result::{SteadfastError, SteadfastResult};

/// Kind of interactive control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WidgetKind {
    /// Checkbox or switch with an on/off state
    Toggle,
    /// One member of a mutually exclusive group
    Radio,
    /// Dropdown whose options render in a popup menu once opened
    Select {
        /// CSS selector matching option items inside the open menu
        options_css: String,
    },
}

impl WidgetKind {
    /// Select whose options are list items inside the visible menu
    #[must_use]
    pub fn select(options_css: impl Into<String>) -> Self {
        Self::Select {
            options_css: options_css.into(),
        }
    }

    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Toggle => "toggle",
            Self::Radio => "radio",
            Self::Select { .. } => "select",
        }
    }

    /// Selector for the option labelled `label` inside an open menu
    #[must_use]
    pub fn option_selector(&self, label: &str) -> Option<Selector> {
        match self {
            Self::Select { options_css } => Some(Selector::css_with_exact_text(options_css, label)),
            _ => None,
        }
    }
}

/// Desired widget state, supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    /// Checked flag for toggles and radio members
    Checked(bool),
    /// Option label for selects
    Option(String),
}

impl TargetState {
    /// Target "checked"
    #[must_use]
    pub const fn on() -> Self {
        Self::Checked(true)
    }

    /// Target "unchecked"
    #[must_use]
    pub const fn off() -> Self {
        Self::Checked(false)
    }

    /// Target option label
    #[must_use]
    pub fn option(label: impl Into<String>) -> Self {
        Self::Option(label.into())
    }

    /// Whether `observed` already satisfies this target.
    ///
    /// Option labels compare with [`same_label`].
    #[must_use]
    pub fn is_satisfied_by(&self, observed: &WidgetState) -> bool {
        match (self, observed) {
            (Self::Checked(want), WidgetState::Checked(have)) => want == have,
            (Self::Option(want), WidgetState::Selected(Some(have))) => same_label(want, have),
            _ => false,
        }
    }

    /// Check that this target makes sense for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`SteadfastError::InvalidTarget`] for option targets on
    /// toggles/radios and checked targets on selects.
    pub fn validate_for(&self, widget: &str, kind: &WidgetKind) -> SteadfastResult<()> {
        let ok = matches!(
            (self, kind),
            (Self::Checked(_), WidgetKind::Toggle | WidgetKind::Radio)
                | (Self::Option(_), WidgetKind::Select { .. })
        );
        if ok {
            Ok(())
        } else {
            Err(SteadfastError::InvalidTarget {
                widget: widget.to_string(),
                message: format!("{self} cannot be applied to a {}", kind.name()),
            })
        }
    }
}

/// Option label equality: surrounding whitespace and case are ignored.
///
/// The option query and the scripted select use the same rule in the page,
/// so whatever the engine clicks is what verification accepts.
#[must_use]
pub fn same_label(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checked(true) => write!(f, "checked"),
            Self::Checked(false) => write!(f, "unchecked"),
            Self::Option(label) => write!(f, "option {label:?}"),
        }
    }
}

/// State read back from the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetState {
    /// Checked flag
    Checked(bool),
    /// Selected option label, if any
    Selected(Option<String>),
    /// Element vanished or its state could not be read
    Unknown,
}

impl fmt::Display for WidgetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checked(true) => write!(f, "checked"),
            Self::Checked(false) => write!(f, "unchecked"),
            Self::Selected(Some(label)) => write!(f, "selected {label:?}"),
            Self::Selected(None) => write!(f, "nothing selected"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Result of a presence/visibility probe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementProbe {
    /// Number of matching elements
    pub count: usize,
    /// Whether at least one match is visible
    pub visible: bool,
}

impl ElementProbe {
    /// Nothing matched
    #[must_use]
    pub const fn absent() -> Self {
        Self {
            count: 0,
            visible: false,
        }
    }

    /// Present in the DOM
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.count > 0
    }

    /// Present and visible, i.e. a usable match
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        self.count > 0 && self.visible
    }
}

/// A named logical control on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widget {
    /// Name used in logs and diagnostics
    pub name: String,
    /// Candidate locators
    pub locators: LocatorSet,
    /// Control kind
    pub kind: WidgetKind,
}

impl Widget {
    /// Create a widget
    #[must_use]
    pub fn new(name: impl Into<String>, locators: impl Into<LocatorSet>, kind: WidgetKind) -> Self {
        Self {
            name: name.into(),
            locators: locators.into(),
            kind,
        }
    }

    /// Toggle widget
    #[must_use]
    pub fn toggle(name: impl Into<String>, locators: impl Into<LocatorSet>) -> Self {
        Self::new(name, locators, WidgetKind::Toggle)
    }

    /// Radio-group member
    #[must_use]
    pub fn radio(name: impl Into<String>, locators: impl Into<LocatorSet>) -> Self {
        Self::new(name, locators, WidgetKind::Radio)
    }

    /// Select widget with options matched by `options_css`
    #[must_use]
    pub fn select(
        name: impl Into<String>,
        locators: impl Into<LocatorSet>,
        options_css: impl Into<String>,
    ) -> Self {
        Self::new(name, locators, WidgetKind::select(options_css))
    }
}

/// A resolved element: the selector that matched, plus the set it came from
/// so it can be re-resolved after the page re-renders.
///
/// Handles are scoped to one interaction call and are not cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetHandle {
    locators: LocatorSet,
    matched: Selector,
    index: usize,
}

impl WidgetHandle {
    pub(crate) fn new(locators: LocatorSet, index: usize) -> Self {
        let matched = locators.candidates()[index].clone();
        Self {
            locators,
            matched,
            index,
        }
    }

    /// Selector that matched
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.matched
    }

    /// Position of the matched selector in the set
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// The full candidate set, for re-resolution
    #[must_use]
    pub const fn locators(&self) -> &LocatorSet {
        &self.locators
    }

    /// Whether a lower-preference fallback was needed
    #[must_use]
    pub const fn used_fallback(&self) -> bool {
        self.index > 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod target_state_tests {
        use super::*;

        #[test]
        fn test_checked_matching() {
            assert!(TargetState::on().is_satisfied_by(&WidgetState::Checked(true)));
            assert!(!TargetState::on().is_satisfied_by(&WidgetState::Checked(false)));
            assert!(!TargetState::off().is_satisfied_by(&WidgetState::Unknown));
        }

        #[test]
        fn test_option_matching_ignores_case_and_padding() {
            let target = TargetState::option("Weekly");
            assert!(target.is_satisfied_by(&WidgetState::Selected(Some(" weekly ".into()))));
            assert!(!target.is_satisfied_by(&WidgetState::Selected(None)));
            assert!(!target.is_satisfied_by(&WidgetState::Checked(true)));
        }

        #[test]
        fn test_validate_for_kind() {
            assert!(TargetState::on().validate_for("w", &WidgetKind::Toggle).is_ok());
            assert!(TargetState::on().validate_for("w", &WidgetKind::Radio).is_ok());
            let err = TargetState::option("x")
                .validate_for("slider", &WidgetKind::Toggle)
                .unwrap_err();
            assert!(matches!(err, SteadfastError::InvalidTarget { .. }));
            assert!(TargetState::on()
                .validate_for("status", &WidgetKind::select(".item"))
                .is_err());
        }
    }

    mod handle_tests {
        use super::*;

        #[test]
        fn test_handle_tracks_fallback() {
            let set = LocatorSet::css("#a").or_css("#b");
            let handle = WidgetHandle::new(set.clone(), 1);
            assert_eq!(handle.selector(), &Selector::css("#b"));
            assert!(handle.used_fallback());
            assert_eq!(handle.locators(), &set);
        }

        #[test]
        fn test_probe_usable() {
            assert!(!ElementProbe::absent().is_present());
            let hidden = ElementProbe {
                count: 1,
                visible: false,
            };
            assert!(hidden.is_present());
            assert!(!hidden.is_usable());
        }
    }

    mod kind_tests {
        use super::*;

        #[test]
        fn test_option_selector_only_for_select() {
            let kind = WidgetKind::select(".v-menu__content .v-list-item");
            assert_eq!(
                kind.option_selector("Active"),
                Some(Selector::css_with_exact_text(".v-menu__content .v-list-item", "Active"))
            );
            assert!(WidgetKind::Toggle.option_selector("Active").is_none());
        }
    }
}
