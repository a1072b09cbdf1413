//! Locators: selectors, ordered fallback sets, and click options.
//!
//! A [`LocatorSet`] lists the candidate selectors for one logical element,
//! most specific first. Order is preference; the resolver stops at the first
//! candidate that is present and visible.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::result::{SteadfastError, SteadfastResult};

/// Default per-operation timeout for clicks (5 seconds)
pub const DEFAULT_CLICK_TIMEOUT_MS: u64 = 5000;

/// Quote a Rust string as a JavaScript string literal.
pub(crate) fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Selector {
    /// CSS selector (e.g., `input[type="email"]`)
    Css {
        /// CSS selector
        css: String,
    },
    /// XPath selector
    XPath {
        /// XPath expression
        xpath: String,
    },
    /// Any element whose text content contains the given text
    Text {
        /// Text to match
        text: String,
    },
    /// Test ID selector (data-testid attribute)
    TestId {
        /// Test ID value
        id: String,
    },
    /// CSS selector filtered by text content
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
    /// CSS selector whose whole text, trimmed, equals the given text
    /// ignoring case (menu options, where "Active" must not pick
    /// "Active (pending)")
    CssWithExactText {
        /// Base CSS selector
        css: String,
        /// Text the element must read
        text: String,
    },
    /// CSS selector filtered by a descendant's text content
    /// (e.g. the `v-select` whose `label` reads "Status")
    CssWithChildText {
        /// Base CSS selector
        css: String,
        /// Descendant CSS selector
        child: String,
        /// Text the descendant must contain
        text: String,
    },
    /// Form control associated with a `<label>` containing the text
    Label {
        /// Label text
        text: String,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(css: impl Into<String>) -> Self {
        Self::Css { css: css.into() }
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(xpath: impl Into<String>) -> Self {
        Self::XPath {
            xpath: xpath.into(),
        }
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId { id: id.into() }
    }

    /// Create a CSS selector with a text filter
    #[must_use]
    pub fn css_with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self::CssWithText {
            css: css.into(),
            text: text.into(),
        }
    }

    /// Create a CSS selector matching trimmed text exactly, ignoring case
    #[must_use]
    pub fn css_with_exact_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self::CssWithExactText {
            css: css.into(),
            text: text.into(),
        }
    }

    /// Create a CSS selector filtered by descendant text
    #[must_use]
    pub fn css_with_child_text(
        css: impl Into<String>,
        child: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::CssWithChildText {
            css: css.into(),
            child: child.into(),
            text: text.into(),
        }
    }

    /// Create a label selector
    #[must_use]
    pub fn label(text: impl Into<String>) -> Self {
        Self::Label { text: text.into() }
    }

    /// JavaScript expression evaluating to an array of every matching element
    #[must_use]
    pub fn to_all_query(&self) -> String {
        match self {
            Self::Css { css } => format!("Array.from(document.querySelectorAll({}))", js_str(css)),
            Self::XPath { xpath } => format!(
                "(() => {{ const r = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 return Array.from({{ length: r.snapshotLength }}, (_, i) => r.snapshotItem(i)); }})()",
                js_str(xpath)
            ),
            Self::Text { text } => format!(
                "Array.from(document.querySelectorAll('body *')).filter(el => el.children.length === 0 && el.textContent.includes({}))",
                js_str(text)
            ),
            Self::TestId { id } => format!(
                "Array.from(document.querySelectorAll({}))",
                js_str(&format!("[data-testid=\"{id}\"]"))
            ),
            Self::CssWithText { css, text } => format!(
                "Array.from(document.querySelectorAll({})).filter(el => el.textContent.includes({}))",
                js_str(css),
                js_str(text)
            ),
            Self::CssWithExactText { css, text } => format!(
                "Array.from(document.querySelectorAll({})).filter(el => el.textContent.trim().toLowerCase() === {}.trim().toLowerCase())",
                js_str(css),
                js_str(text)
            ),
            Self::CssWithChildText { css, child, text } => format!(
                "Array.from(document.querySelectorAll({})).filter(el => Array.from(el.querySelectorAll({})).some(c => c.textContent.includes({})))",
                js_str(css),
                js_str(child),
                js_str(text)
            ),
            Self::Label { text } => format!(
                "Array.from(document.querySelectorAll('label')).filter(l => l.textContent.includes({})).map(l => \
                 (l.htmlFor && document.getElementById(l.htmlFor)) || l.querySelector('input,select,textarea') || \
                 (l.parentElement && l.parentElement.querySelector('input,select,textarea'))).filter(Boolean)",
                js_str(text)
            ),
        }
    }

    /// JavaScript expression counting matching elements
    #[must_use]
    pub fn to_count_query(&self) -> String {
        format!("{}.length", self.to_all_query())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css { css } => write!(f, "{css}"),
            Self::XPath { xpath } => write!(f, "xpath={xpath}"),
            Self::Text { text } => write!(f, "text={text:?}"),
            Self::TestId { id } => write!(f, "[data-testid={id:?}]"),
            Self::CssWithText { css, text } => write!(f, "{css}:has-text({text:?})"),
            Self::CssWithExactText { css, text } => write!(f, "{css}:text-is({text:?})"),
            Self::CssWithChildText { css, child, text } => {
                write!(f, "{css}:has({child}:has-text({text:?}))")
            }
            Self::Label { text } => write!(f, "label={text:?}"),
        }
    }
}

/// Ordered, non-empty list of candidate selectors for one logical element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Selector>", into = "Vec<Selector>")]
pub struct LocatorSet {
    candidates: Vec<Selector>,
}

impl LocatorSet {
    /// Build a set from candidates in preference order.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `candidates` is empty.
    pub fn new(candidates: impl IntoIterator<Item = Selector>) -> SteadfastResult<Self> {
        let candidates: Vec<Selector> = candidates.into_iter().collect();
        if candidates.is_empty() {
            return Err(SteadfastError::config(
                "a locator set needs at least one candidate",
            ));
        }
        Ok(Self { candidates })
    }

    /// A set with exactly one candidate
    #[must_use]
    pub fn single(selector: Selector) -> Self {
        Self {
            candidates: vec![selector],
        }
    }

    /// Shorthand for a single CSS candidate
    #[must_use]
    pub fn css(css: impl Into<String>) -> Self {
        Self::single(Selector::css(css))
    }

    /// Append a lower-preference fallback
    #[must_use]
    pub fn or(mut self, fallback: Selector) -> Self {
        self.candidates.push(fallback);
        self
    }

    /// Append a lower-preference CSS fallback
    #[must_use]
    pub fn or_css(self, css: impl Into<String>) -> Self {
        self.or(Selector::css(css))
    }

    /// Candidates in preference order
    #[must_use]
    pub fn candidates(&self) -> &[Selector] {
        &self.candidates
    }

    /// Most preferred candidate
    #[must_use]
    pub fn primary(&self) -> &Selector {
        &self.candidates[0]
    }

    /// Number of candidates (always at least one)
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Always false; kept for API symmetry with collections
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Human-readable form of every candidate
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.candidates.iter().map(ToString::to_string).collect()
    }
}

impl From<Selector> for LocatorSet {
    fn from(selector: Selector) -> Self {
        Self::single(selector)
    }
}

impl TryFrom<Vec<Selector>> for LocatorSet {
    type Error = SteadfastError;

    fn try_from(candidates: Vec<Selector>) -> SteadfastResult<Self> {
        Self::new(candidates)
    }
}

impl From<LocatorSet> for Vec<Selector> {
    fn from(set: LocatorSet) -> Self {
        set.candidates
    }
}

impl fmt::Display for LocatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.describe().join(", "))
    }
}

/// Click position relative to the element's top-left corner, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    /// Horizontal offset
    pub x: f64,
    /// Vertical offset
    pub y: f64,
}

impl Offset {
    /// Create a new offset
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Default for Offset {
    fn default() -> Self {
        Self::new(5.0, 5.0)
    }
}

/// How a click is delivered.
///
/// `forced` skips the actionability checks (visibility, overlay hit-test)
/// and dispatches the pointer events at `offset`, or at the element centre
/// when no offset is given.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClickOptions {
    /// Bypass actionability checks
    pub forced: bool,
    /// Click position; `None` means the element centre
    pub offset: Option<Offset>,
    /// Timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ClickOptions {
    fn default() -> Self {
        Self {
            forced: false,
            offset: None,
            timeout_ms: DEFAULT_CLICK_TIMEOUT_MS,
        }
    }
}

impl ClickOptions {
    /// Standard click at the element centre
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forced click at the given offset
    #[must_use]
    pub const fn forced_at(offset: Offset) -> Self {
        Self {
            forced: true,
            offset: Some(offset),
            timeout_ms: DEFAULT_CLICK_TIMEOUT_MS,
        }
    }

    /// Set the timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the click offset
    #[must_use]
    pub const fn with_offset(mut self, offset: Offset) -> Self {
        self.offset = Some(offset);
        self
    }
}
