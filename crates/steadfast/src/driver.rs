//! PageDriver - the DOM surface the engine drives.
//!
//! A binding only has to provide navigation, script evaluation, pointer
//! clicks, and screenshots. Everything else (probing, reading widget state,
//! filling inputs, the scripted-event fallback) has a default body built on
//! [`PageDriver::evaluate`] and the snippets in [`crate::script`]. The mock
//! driver overrides those defaults with an in-memory model.
//!
//! Drivers are passed explicitly to every operation; there is no ambient
//! "current page".

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::locator::{ClickOptions, Selector};
use crate::result::{SteadfastError, SteadfastResult};
use crate::script;
use crate::widget::{ElementProbe, TargetState, WidgetKind, WidgetState};

/// Raw state shape returned by [`script::read_state`]
#[derive(Debug, Deserialize)]
struct RawState {
    checked: Option<bool>,
    #[serde(default)]
    selected: Option<String>,
}

/// DOM query/interaction surface for one page
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait for DOM content to be ready
    async fn navigate(&self, url: &str, timeout: Duration) -> SteadfastResult<()>;

    /// Current page URL
    async fn current_url(&self) -> SteadfastResult<String>;

    /// Evaluate a script expression in the page and return its JSON value.
    /// Promises are awaited.
    async fn evaluate(&self, script: &str) -> SteadfastResult<Value>;

    /// Click the first visible match of `selector`.
    ///
    /// A non-forced click fails with [`SteadfastError::InteractionBlocked`]
    /// when the element is hidden, disabled, or covered by another element.
    async fn click(&self, selector: &Selector, options: &ClickOptions) -> SteadfastResult<()>;

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> SteadfastResult<Vec<u8>>;

    /// Document title
    async fn title(&self) -> SteadfastResult<String> {
        let value = self.evaluate("document.title").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Count matches and check visibility without waiting
    async fn probe(&self, selector: &Selector) -> SteadfastResult<ElementProbe> {
        let value = self.evaluate(&script::probe(selector)).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Read a widget's current state
    async fn read_state(
        &self,
        selector: &Selector,
        kind: &WidgetKind,
    ) -> SteadfastResult<WidgetState> {
        let value = self.evaluate(&script::read_state(selector, kind)).await?;
        if value.is_null() {
            return Ok(WidgetState::Unknown);
        }
        let raw: RawState = serde_json::from_value(value)?;
        Ok(match kind {
            WidgetKind::Toggle | WidgetKind::Radio => {
                raw.checked.map_or(WidgetState::Unknown, WidgetState::Checked)
            }
            WidgetKind::Select { .. } => WidgetState::Selected(raw.selected),
        })
    }

    /// Set the underlying value and dispatch `change`/`input` (and `click`
    /// for toggles) so the page's framework updates its model.
    async fn dispatch_state(
        &self,
        selector: &Selector,
        kind: &WidgetKind,
        target: &TargetState,
    ) -> SteadfastResult<()> {
        let applied = self
            .evaluate(&script::dispatch_state(selector, kind, target))
            .await?;
        if applied.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(SteadfastError::script(format!(
                "could not apply {target} to {selector}"
            )))
        }
    }

    /// Replace an input's text
    async fn fill(&self, selector: &Selector, text: &str) -> SteadfastResult<()> {
        let filled = self.evaluate(&script::fill(selector, text)).await?;
        if filled.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(SteadfastError::blocked(selector.to_string(), "no element to fill"))
        }
    }

    /// Value of an input, `None` when missing
    async fn input_value(&self, selector: &Selector) -> SteadfastResult<Option<String>> {
        let value = self.evaluate(&script::input_value(selector)).await?;
        Ok(value.as_str().map(ToString::to_string))
    }

    /// Trimmed rendered text, `None` when missing
    async fn text_content(&self, selector: &Selector) -> SteadfastResult<Option<String>> {
        let value = self.evaluate(&script::text_content(selector)).await?;
        Ok(value.as_str().map(ToString::to_string))
    }

    /// Trimmed rendered text of every match
    async fn all_text_contents(&self, selector: &Selector) -> SteadfastResult<Vec<String>> {
        let value = self.evaluate(&script::all_text_contents(selector)).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Driver answering every script with a canned value.
    #[derive(Debug, Default)]
    struct CannedDriver {
        answer: Mutex<Value>,
        scripts: Mutex<Vec<String>>,
    }

    impl CannedDriver {
        fn answering(value: Value) -> Self {
            Self {
                answer: Mutex::new(value),
                scripts: Mutex::default(),
            }
        }
    }

    #[async_trait]
    impl PageDriver for CannedDriver {
        async fn navigate(&self, _url: &str, _timeout: Duration) -> SteadfastResult<()> {
            Ok(())
        }

        async fn current_url(&self) -> SteadfastResult<String> {
            Ok("about:blank".to_string())
        }

        async fn evaluate(&self, script: &str) -> SteadfastResult<Value> {
            self.scripts.lock().unwrap().push(script.to_string());
            Ok(self.answer.lock().unwrap().clone())
        }

        async fn click(&self, _selector: &Selector, _options: &ClickOptions) -> SteadfastResult<()> {
            Ok(())
        }

        async fn screenshot(&self) -> SteadfastResult<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    mod default_method_tests {
        use super::*;
        use serde_json::json;

        #[tokio::test]
        async fn test_probe_parses_script_result() {
            let driver = CannedDriver::answering(json!({"count": 2, "visible": true}));
            let probe = driver.probe(&Selector::css("li")).await.unwrap();
            assert_eq!(probe.count, 2);
            assert!(probe.is_usable());
        }

        #[tokio::test]
        async fn test_read_state_toggle() {
            let driver = CannedDriver::answering(json!({"checked": true}));
            let state = driver
                .read_state(&Selector::css("#s"), &WidgetKind::Toggle)
                .await
                .unwrap();
            assert_eq!(state, WidgetState::Checked(true));
        }

        #[tokio::test]
        async fn test_read_state_detached_is_unknown() {
            let driver = CannedDriver::answering(Value::Null);
            let state = driver
                .read_state(&Selector::css("#s"), &WidgetKind::Radio)
                .await
                .unwrap();
            assert_eq!(state, WidgetState::Unknown);
        }

        #[tokio::test]
        async fn test_read_state_select() {
            let driver = CannedDriver::answering(json!({"selected": "Active"}));
            let state = driver
                .read_state(&Selector::css("#s"), &WidgetKind::select(".item"))
                .await
                .unwrap();
            assert_eq!(state, WidgetState::Selected(Some("Active".into())));
        }

        #[tokio::test]
        async fn test_dispatch_state_reports_failure() {
            let driver = CannedDriver::answering(json!(false));
            let err = driver
                .dispatch_state(&Selector::css("#s"), &WidgetKind::Toggle, &TargetState::on())
                .await
                .unwrap_err();
            assert!(matches!(err, SteadfastError::Script { .. }));
        }

        #[tokio::test]
        async fn test_fill_missing_element_is_blocked() {
            let driver = CannedDriver::answering(json!(false));
            let err = driver.fill(&Selector::css("#u"), "admin").await.unwrap_err();
            assert!(matches!(err, SteadfastError::InteractionBlocked { .. }));
        }

        #[tokio::test]
        async fn test_title_uses_document_title() {
            let driver = CannedDriver::answering(json!("Login"));
            assert_eq!(driver.title().await.unwrap(), "Login");
            assert_eq!(driver.scripts.lock().unwrap()[0], "document.title");
        }
    }
}
