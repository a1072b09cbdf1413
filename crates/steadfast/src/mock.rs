//! Mock driver for engine and page-object tests.
//!
//! [`MockDriver`] is an in-memory page: selectors map to simulated elements
//! whose state changes the way a reactive single-page app would react to
//! clicks and scripted events. Elements can be made awkward on purpose:
//! covered by an overlay, deaf to pointer events, frozen, late to appear,
//! or dropping the first few clicks. Every driver call is recorded so tests
//! can assert on what the engine actually did.
//!
//! [`MockSessions`] is a matching [`SessionProvider`] that counts opens and
//! closes and can simulate a teardown that never finishes.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::SessionConfig;
use crate::driver::PageDriver;
use crate::locator::{ClickOptions, Selector};
use crate::result::{SteadfastError, SteadfastResult};
use crate::session::SessionProvider;
use crate::widget::{same_label, ElementProbe, TargetState, WidgetKind, WidgetState};

/// PNG magic bytes returned by [`MockDriver::screenshot`]
pub const MOCK_PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// What stands between a click and its element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Obstruction {
    /// Nothing
    #[default]
    None,
    /// Another element covers it: normal clicks are refused, forced clicks land
    Overlay,
    /// `pointer-events: none`: normal clicks are refused, forced clicks are
    /// ignored, scripted events work
    PointerEventsDisabled,
    /// The app never lets the state change
    Frozen,
}

/// Side effect of clicking a button-like element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickEffect {
    /// Change the page URL
    Navigate(String),
    /// Make another element visible
    Reveal(Selector),
    /// Hide another element
    Hide(Selector),
    /// Kill the session
    Crash,
}

/// Simulated element behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockKind {
    /// Checkbox/switch
    Toggle {
        /// Current value
        checked: bool,
    },
    /// Radio-group member
    Radio {
        /// Group name; checking one member unchecks the rest
        group: String,
        /// Current value
        checked: bool,
    },
    /// Dropdown with a popup option list
    Select {
        /// CSS selector of option items once open
        options_css: String,
        /// Option labels
        options: Vec<String>,
        /// Selected label
        selected: Option<String>,
        /// Whether the popup is open
        open: bool,
    },
    /// Text input
    Input {
        /// Current value
        value: String,
    },
    /// Static text
    Text {
        /// Rendered text
        text: String,
    },
    /// Clickable element with no state
    Button,
}

/// A simulated element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    /// Behaviour
    pub kind: MockKind,
    /// Visibility
    pub visible: bool,
    /// Click obstruction
    pub obstruction: Obstruction,
    /// Delay before the element is attached
    pub appears_after: Option<Duration>,
    /// Clicks silently dropped before the element starts reacting
    pub missed_clicks: u32,
    /// Effects applied when clicked
    pub on_click: Vec<ClickEffect>,
    /// State changes the app will undo
    pub reverts: u32,
    /// How long after a change the app undoes it
    pub revert_after: Duration,
}

impl MockElement {
    fn of(kind: MockKind) -> Self {
        Self {
            kind,
            visible: true,
            obstruction: Obstruction::None,
            appears_after: None,
            missed_clicks: 0,
            on_click: Vec::new(),
            reverts: 0,
            revert_after: Duration::ZERO,
        }
    }

    /// Toggle switch
    #[must_use]
    pub fn toggle(checked: bool) -> Self {
        Self::of(MockKind::Toggle { checked })
    }

    /// Radio-group member
    #[must_use]
    pub fn radio(group: impl Into<String>, checked: bool) -> Self {
        Self::of(MockKind::Radio {
            group: group.into(),
            checked,
        })
    }

    /// Dropdown
    #[must_use]
    pub fn select(options_css: impl Into<String>, options: &[&str], selected: Option<&str>) -> Self {
        Self::of(MockKind::Select {
            options_css: options_css.into(),
            options: options.iter().map(ToString::to_string).collect(),
            selected: selected.map(ToString::to_string),
            open: false,
        })
    }

    /// Text input
    #[must_use]
    pub fn input(value: impl Into<String>) -> Self {
        Self::of(MockKind::Input {
            value: value.into(),
        })
    }

    /// Static text
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::of(MockKind::Text { text: text.into() })
    }

    /// Plain button or link
    #[must_use]
    pub fn button() -> Self {
        Self::of(MockKind::Button)
    }

    /// Start hidden
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Cover with an overlay
    #[must_use]
    pub fn with_overlay(mut self) -> Self {
        self.obstruction = Obstruction::Overlay;
        self
    }

    /// Disable pointer events
    #[must_use]
    pub fn with_pointer_events_disabled(mut self) -> Self {
        self.obstruction = Obstruction::PointerEventsDisabled;
        self
    }

    /// Never change state
    #[must_use]
    pub fn frozen(mut self) -> Self {
        self.obstruction = Obstruction::Frozen;
        self
    }

    /// Attach only after `delay`
    #[must_use]
    pub fn appearing_after(mut self, delay: Duration) -> Self {
        self.appears_after = Some(delay);
        self
    }

    /// Drop the first `n` clicks
    #[must_use]
    pub fn missing_clicks(mut self, n: u32) -> Self {
        self.missed_clicks = n;
        self
    }

    /// Undo the next `times` state changes `after` they happen
    #[must_use]
    pub fn reverting(mut self, times: u32, after: Duration) -> Self {
        self.reverts = times;
        self.revert_after = after;
        self
    }

    /// Add a click side effect
    #[must_use]
    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click.push(effect);
        self
    }
}

/// Handle to an element registered with [`MockDriver::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(usize);

#[derive(Debug)]
struct Slot {
    element: MockElement,
    attached_at: Instant,
    detached: bool,
    pending_revert: Option<(Instant, MockKind)>,
}

impl Slot {
    fn attached(&self, now: Instant) -> bool {
        !self.detached && now >= self.attached_at
    }

    fn usable(&self, now: Instant) -> bool {
        self.attached(now) && self.element.visible
    }
}

#[derive(Debug)]
struct MockPage {
    url: String,
    title: String,
    slots: Vec<Slot>,
    aliases: HashMap<Selector, ElementId>,
    calls: Vec<String>,
    eval_results: Vec<Value>,
    crashed: bool,
    read_latency: Duration,
    action_latency: Duration,
}

/// In-memory page driver
#[derive(Debug)]
pub struct MockDriver {
    page: Mutex<MockPage>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Create an empty page at `about:blank`
    #[must_use]
    pub fn new() -> Self {
        Self {
            page: Mutex::new(MockPage {
                url: "about:blank".to_string(),
                title: String::new(),
                slots: Vec::new(),
                aliases: HashMap::new(),
                calls: Vec::new(),
                eval_results: Vec::new(),
                crashed: false,
                read_latency: Duration::ZERO,
                action_latency: Duration::ZERO,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockPage> {
        self.page.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an element under `selector`
    pub fn add(&self, selector: Selector, element: MockElement) -> ElementId {
        let mut page = self.lock();
        let attached_at = Instant::now() + element.appears_after.unwrap_or_default();
        let id = ElementId(page.slots.len());
        page.slots.push(Slot {
            element,
            attached_at,
            detached: false,
            pending_revert: None,
        });
        page.aliases.insert(selector, id);
        id
    }

    /// Make another selector match an existing element
    pub fn alias(&self, selector: Selector, id: ElementId) {
        self.lock().aliases.insert(selector, id);
    }

    /// Remove an element from the DOM
    pub fn detach(&self, id: ElementId) {
        if let Some(slot) = self.lock().slots.get_mut(id.0) {
            slot.detached = true;
        }
    }

    /// Change an element's visibility
    pub fn set_visible(&self, id: ElementId, visible: bool) {
        if let Some(slot) = self.lock().slots.get_mut(id.0) {
            slot.element.visible = visible;
        }
    }

    /// Set the page title
    pub fn set_title(&self, title: impl Into<String>) {
        self.lock().title = title.into();
    }

    /// Set the page URL without recording a navigation
    pub fn set_url(&self, url: impl Into<String>) {
        self.lock().url = url.into();
    }

    /// Queue a result for the next [`PageDriver::evaluate`] call
    pub fn push_eval_result(&self, value: Value) {
        self.lock().eval_results.push(value);
    }

    /// Simulate the browser dying
    pub fn crash(&self) {
        self.lock().crashed = true;
    }

    /// Snapshot of an element
    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<MockElement> {
        self.lock().slots.get(id.0).map(|s| s.element.clone())
    }

    /// Checked flag of a toggle or radio
    #[must_use]
    pub fn checked(&self, id: ElementId) -> Option<bool> {
        match self.element(id)?.kind {
            MockKind::Toggle { checked } | MockKind::Radio { checked, .. } => Some(checked),
            _ => None,
        }
    }

    /// Selected label of a dropdown
    #[must_use]
    pub fn selected(&self, id: ElementId) -> Option<String> {
        match self.element(id)?.kind {
            MockKind::Select { selected, .. } => selected,
            _ => None,
        }
    }

    /// Value of an input
    #[must_use]
    pub fn value(&self, id: ElementId) -> Option<String> {
        match self.element(id)?.kind {
            MockKind::Input { value } => Some(value),
            _ => None,
        }
    }

    /// Every recorded call, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Check if a call with this prefix was made
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.lock().calls.iter().any(|c| c.starts_with(prefix))
    }

    /// Make probes and state reads take `latency` before answering,
    /// like a renderer busy with a long task
    pub fn set_read_latency(&self, latency: Duration) {
        self.lock().read_latency = latency;
    }

    /// Make clicks and scripted events take `latency` before acting
    pub fn set_action_latency(&self, latency: Duration) {
        self.lock().action_latency = latency;
    }

    async fn stall(&self, pick: fn(&MockPage) -> Duration) {
        let latency = pick(&self.lock());
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    /// Calls that can change page state (clicks, scripted events, fills)
    #[must_use]
    pub fn mutating_calls(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter(|c| {
                c.starts_with("click:")
                    || c.starts_with("click_forced:")
                    || c.starts_with("dispatch:")
                    || c.starts_with("fill:")
            })
            .cloned()
            .collect()
    }

    /// Number of clicks of either kind
    #[must_use]
    pub fn click_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.starts_with("click"))
            .count()
    }

    /// Forget recorded calls
    pub fn clear_history(&self) {
        self.lock().calls.clear();
    }
}

/// Where a selector points inside the mock page
enum Target {
    Element(usize),
    /// Option `label` of the dropdown in slot `usize`
    Option(usize, String),
}

impl MockPage {
    fn record(&mut self, call: String) {
        self.calls.push(call);
    }

    /// Fail if crashed, apply due reverts, and return the current instant
    fn enter(&mut self) -> SteadfastResult<Instant> {
        if self.crashed {
            return Err(SteadfastError::session("page crashed (mock)"));
        }
        let now = Instant::now();
        for slot in &mut self.slots {
            if let Some((due, _)) = &slot.pending_revert {
                if now >= *due {
                    if let Some((_, previous)) = slot.pending_revert.take() {
                        slot.element.kind = previous;
                    }
                }
            }
        }
        Ok(now)
    }

    fn schedule_revert(&mut self, index: usize, previous: MockKind, now: Instant) {
        let slot = &mut self.slots[index];
        if slot.element.reverts > 0 && slot.element.kind != previous {
            slot.element.reverts -= 1;
            slot.pending_revert = Some((now + slot.element.revert_after, previous));
        }
    }

    fn locate(&self, selector: &Selector, now: Instant) -> Option<Target> {
        if let Some(id) = self.aliases.get(selector) {
            return Some(Target::Element(id.0));
        }
        let (css, text, exact) = match selector {
            Selector::CssWithText { css, text } => (css, text, false),
            Selector::CssWithExactText { css, text } => (css, text, true),
            _ => return None,
        };
        self.slots.iter().enumerate().find_map(|(i, slot)| match &slot.element.kind {
            MockKind::Select {
                options_css,
                options,
                open: true,
                ..
            } if options_css == css && slot.usable(now) => options
                .iter()
                .find(|o| {
                    if exact {
                        same_label(o, text)
                    } else {
                        o.contains(text.as_str())
                    }
                })
                .map(|o| Target::Option(i, o.clone())),
            _ => None,
        })
    }

    fn slot(&self, selector: &Selector, now: Instant) -> Option<&Slot> {
        match self.locate(selector, now)? {
            Target::Element(i) => self.slots.get(i).filter(|s| s.attached(now)),
            Target::Option(..) => None,
        }
    }

    fn set_checked(&mut self, index: usize, want: bool) {
        let group = match &mut self.slots[index].element.kind {
            MockKind::Toggle { checked } => {
                *checked = want;
                None
            }
            MockKind::Radio { group, checked } => {
                *checked = want;
                want.then(|| group.clone())
            }
            _ => None,
        };
        if let Some(group) = group {
            for (i, slot) in self.slots.iter_mut().enumerate() {
                if i == index {
                    continue;
                }
                if let MockKind::Radio { group: g, checked } = &mut slot.element.kind {
                    if *g == group {
                        *checked = false;
                    }
                }
            }
        }
    }

    fn set_visibility(&mut self, selector: &Selector, visible: bool) {
        if let Some(id) = self.aliases.get(selector).copied() {
            if let Some(slot) = self.slots.get_mut(id.0) {
                slot.element.visible = visible;
            }
        }
    }

    fn apply_effects(&mut self, effects: Vec<ClickEffect>) {
        for effect in effects {
            match effect {
                ClickEffect::Navigate(url) => self.url = url,
                ClickEffect::Reveal(selector) => self.set_visibility(&selector, true),
                ClickEffect::Hide(selector) => self.set_visibility(&selector, false),
                ClickEffect::Crash => self.crashed = true,
            }
        }
    }

    fn click(&mut self, selector: &Selector, options: &ClickOptions) -> SteadfastResult<()> {
        let now = Instant::now();
        let target = self
            .locate(selector, now)
            .ok_or_else(|| SteadfastError::blocked(selector.to_string(), "no element matches"))?;
        let index = match target {
            Target::Option(index, label) => {
                let previous = self.slots[index].element.kind.clone();
                if let MockKind::Select { selected, open, .. } = &mut self.slots[index].element.kind {
                    *selected = Some(label);
                    *open = false;
                }
                self.schedule_revert(index, previous, now);
                return Ok(());
            }
            Target::Element(index) => index,
        };

        let slot = &mut self.slots[index];
        if !slot.attached(now) {
            return Err(SteadfastError::blocked(selector.to_string(), "element is not attached"));
        }
        if !options.forced {
            if !slot.element.visible {
                return Err(SteadfastError::blocked(selector.to_string(), "element is not visible"));
            }
            match slot.element.obstruction {
                Obstruction::Overlay => {
                    return Err(SteadfastError::blocked(
                        selector.to_string(),
                        "click intercepted by overlay",
                    ))
                }
                Obstruction::PointerEventsDisabled => {
                    return Err(SteadfastError::blocked(
                        selector.to_string(),
                        "element has pointer-events: none",
                    ))
                }
                Obstruction::None | Obstruction::Frozen => {}
            }
        }
        if matches!(
            slot.element.obstruction,
            Obstruction::Frozen | Obstruction::PointerEventsDisabled
        ) {
            return Ok(());
        }
        if slot.element.missed_clicks > 0 {
            slot.element.missed_clicks -= 1;
            return Ok(());
        }

        let effects = slot.element.on_click.clone();
        let previous = slot.element.kind.clone();
        let checked_to = match &mut slot.element.kind {
            MockKind::Toggle { checked } => Some(!*checked),
            MockKind::Radio { .. } => Some(true),
            MockKind::Select { open, .. } => {
                *open = !*open;
                None
            }
            MockKind::Input { .. } | MockKind::Text { .. } | MockKind::Button => None,
        };
        if let Some(want) = checked_to {
            self.set_checked(index, want);
            self.schedule_revert(index, previous, now);
        }
        self.apply_effects(effects);
        Ok(())
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn navigate(&self, url: &str, _timeout: Duration) -> SteadfastResult<()> {
        let mut page = self.lock();
        page.enter()?;
        page.record(format!("navigate:{url}"));
        page.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> SteadfastResult<String> {
        let mut page = self.lock();
        page.enter()?;
        Ok(page.url.clone())
    }

    async fn evaluate(&self, _script: &str) -> SteadfastResult<Value> {
        let mut page = self.lock();
        page.enter()?;
        page.record("evaluate".to_string());
        if page.eval_results.is_empty() {
            Ok(Value::Null)
        } else {
            Ok(page.eval_results.remove(0))
        }
    }

    async fn click(&self, selector: &Selector, options: &ClickOptions) -> SteadfastResult<()> {
        self.stall(|p| p.action_latency).await;
        let mut page = self.lock();
        page.enter()?;
        let kind = if options.forced { "click_forced" } else { "click" };
        page.record(format!("{kind}:{selector}"));
        page.click(selector, options)
    }

    async fn screenshot(&self) -> SteadfastResult<Vec<u8>> {
        let mut page = self.lock();
        page.enter()?;
        page.record("screenshot".to_string());
        Ok(MOCK_PNG.to_vec())
    }

    async fn title(&self) -> SteadfastResult<String> {
        let mut page = self.lock();
        page.enter()?;
        Ok(page.title.clone())
    }

    async fn probe(&self, selector: &Selector) -> SteadfastResult<ElementProbe> {
        self.stall(|p| p.read_latency).await;
        let mut page = self.lock();
        let now = page.enter()?;
        page.record(format!("probe:{selector}"));
        Ok(match page.locate(selector, now) {
            Some(Target::Option(..)) => ElementProbe {
                count: 1,
                visible: true,
            },
            Some(Target::Element(i)) if page.slots[i].attached(now) => ElementProbe {
                count: 1,
                visible: page.slots[i].element.visible,
            },
            _ => ElementProbe::absent(),
        })
    }

    async fn read_state(
        &self,
        selector: &Selector,
        _kind: &WidgetKind,
    ) -> SteadfastResult<WidgetState> {
        self.stall(|p| p.read_latency).await;
        let mut page = self.lock();
        let now = page.enter()?;
        page.record(format!("read:{selector}"));
        Ok(match page.slot(selector, now).map(|s| &s.element.kind) {
            Some(MockKind::Toggle { checked } | MockKind::Radio { checked, .. }) => {
                WidgetState::Checked(*checked)
            }
            Some(MockKind::Select { selected, .. }) => WidgetState::Selected(selected.clone()),
            _ => WidgetState::Unknown,
        })
    }

    async fn dispatch_state(
        &self,
        selector: &Selector,
        _kind: &WidgetKind,
        target: &TargetState,
    ) -> SteadfastResult<()> {
        self.stall(|p| p.action_latency).await;
        let mut guard = self.lock();
        let page = &mut *guard;
        let now = page.enter()?;
        page.record(format!("dispatch:{selector}"));
        let Some(Target::Element(index)) = page.locate(selector, now) else {
            return Err(SteadfastError::script(format!("no element for {selector}")));
        };
        if !page.slots[index].attached(now) {
            return Err(SteadfastError::script(format!("{selector} is detached")));
        }
        if page.slots[index].element.obstruction == Obstruction::Frozen {
            return Ok(());
        }
        let previous = page.slots[index].element.kind.clone();
        let applied = match target {
            TargetState::Checked(want) => {
                if matches!(previous, MockKind::Toggle { .. } | MockKind::Radio { .. }) {
                    page.set_checked(index, *want);
                    Ok(())
                } else {
                    Err(SteadfastError::script(format!("cannot apply {target} to {selector}")))
                }
            }
            TargetState::Option(label) => match &mut page.slots[index].element.kind {
                MockKind::Select { options, selected, .. } => {
                    match options.iter().find(|o| same_label(o, label)) {
                        Some(found) => {
                            *selected = Some(found.clone());
                            Ok(())
                        }
                        None => Err(SteadfastError::script(format!("no option {label:?}"))),
                    }
                }
                _ => Err(SteadfastError::script(format!("cannot apply {target} to {selector}"))),
            },
        };
        if applied.is_ok() {
            page.schedule_revert(index, previous, now);
        }
        applied
    }

    async fn fill(&self, selector: &Selector, text: &str) -> SteadfastResult<()> {
        let mut page = self.lock();
        let now = page.enter()?;
        page.record(format!("fill:{selector}={text}"));
        let Some(Target::Element(index)) = page.locate(selector, now) else {
            return Err(SteadfastError::blocked(selector.to_string(), "no element to fill"));
        };
        let slot = &mut page.slots[index];
        if !slot.attached(now) {
            return Err(SteadfastError::blocked(selector.to_string(), "element is not attached"));
        }
        match &mut slot.element.kind {
            MockKind::Input { value } => {
                *value = text.to_string();
                Ok(())
            }
            _ => Err(SteadfastError::blocked(selector.to_string(), "element is not an input")),
        }
    }

    async fn input_value(&self, selector: &Selector) -> SteadfastResult<Option<String>> {
        let mut page = self.lock();
        let now = page.enter()?;
        page.record(format!("value:{selector}"));
        Ok(match page.slot(selector, now).map(|s| &s.element.kind) {
            Some(MockKind::Input { value }) => Some(value.clone()),
            _ => None,
        })
    }

    async fn text_content(&self, selector: &Selector) -> SteadfastResult<Option<String>> {
        let mut page = self.lock();
        let now = page.enter()?;
        page.record(format!("text:{selector}"));
        Ok(match page.slot(selector, now).map(|s| &s.element.kind) {
            Some(MockKind::Text { text }) => Some(text.trim().to_string()),
            Some(MockKind::Input { value }) => Some(value.clone()),
            Some(MockKind::Select { selected, .. }) => selected.clone(),
            Some(_) => Some(String::new()),
            None => None,
        })
    }

    async fn all_text_contents(&self, selector: &Selector) -> SteadfastResult<Vec<String>> {
        Ok(self.text_content(selector).await?.into_iter().collect())
    }
}

/// Session provider handing out fresh [`MockDriver`]s
pub struct MockSessions {
    setup: Box<dyn Fn(&MockDriver) + Send + Sync>,
    close_stalls: bool,
    open_fails: bool,
    opened: AtomicUsize,
    closed: AtomicUsize,
    forced: AtomicUsize,
}

impl std::fmt::Debug for MockSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSessions")
            .field("close_stalls", &self.close_stalls)
            .field("open_fails", &self.open_fails)
            .field("opened", &self.opened)
            .field("closed", &self.closed)
            .field("forced", &self.forced)
            .finish()
    }
}

impl Default for MockSessions {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSessions {
    /// Provider producing empty pages
    #[must_use]
    pub fn new() -> Self {
        Self::with_setup(|_| {})
    }

    /// Provider running `setup` on every new page
    #[must_use]
    pub fn with_setup(setup: impl Fn(&MockDriver) + Send + Sync + 'static) -> Self {
        Self {
            setup: Box::new(setup),
            close_stalls: false,
            open_fails: false,
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            forced: AtomicUsize::new(0),
        }
    }

    /// Make graceful close hang forever
    #[must_use]
    pub fn with_stalling_close(mut self) -> Self {
        self.close_stalls = true;
        self
    }

    /// Make opening fail
    #[must_use]
    pub fn with_failing_open(mut self) -> Self {
        self.open_fails = true;
        self
    }

    /// Sessions opened
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Sessions closed gracefully
    #[must_use]
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Sessions force-closed
    #[must_use]
    pub fn forced(&self) -> usize {
        self.forced.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for MockSessions {
    type Driver = MockDriver;

    async fn open(&self, config: &SessionConfig) -> SteadfastResult<MockDriver> {
        if self.open_fails {
            return Err(SteadfastError::BrowserLaunch {
                message: "mock launch failure".to_string(),
            });
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        let driver = MockDriver::new();
        driver.set_url(config.base_url.clone());
        (self.setup)(&driver);
        Ok(driver)
    }

    async fn close(&self, _driver: &MockDriver) -> SteadfastResult<()> {
        if self.close_stalls {
            futures::future::pending::<()>().await;
        }
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn force_close(&self, _driver: MockDriver) {
        self.forced.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn direct() -> ClickOptions {
        ClickOptions::default()
    }

    fn forced() -> ClickOptions {
        ClickOptions::forced_at(crate::locator::Offset::default())
    }

    mod click_tests {
        use super::*;

        #[tokio::test]
        async fn test_toggle_flips_on_click() {
            let driver = MockDriver::new();
            let id = driver.add(Selector::css("#s"), MockElement::toggle(false));
            driver.click(&Selector::css("#s"), &direct()).await.unwrap();
            assert_eq!(driver.checked(id), Some(true));
            assert_eq!(driver.click_count(), 1);
        }

        #[tokio::test]
        async fn test_overlay_blocks_direct_but_not_forced() {
            let driver = MockDriver::new();
            let id = driver.add(Selector::css("#s"), MockElement::toggle(false).with_overlay());
            let err = driver.click(&Selector::css("#s"), &direct()).await.unwrap_err();
            assert!(matches!(err, SteadfastError::InteractionBlocked { .. }));
            driver.click(&Selector::css("#s"), &forced()).await.unwrap();
            assert_eq!(driver.checked(id), Some(true));
            assert!(driver.was_called("click_forced:#s"));
        }

        #[tokio::test]
        async fn test_pointer_events_disabled_ignores_forced_click() {
            let driver = MockDriver::new();
            let id = driver.add(
                Selector::css("#r"),
                MockElement::radio("freq", false).with_pointer_events_disabled(),
            );
            driver.click(&Selector::css("#r"), &forced()).await.unwrap();
            assert_eq!(driver.checked(id), Some(false));
        }

        #[tokio::test]
        async fn test_radio_group_exclusivity() {
            let driver = MockDriver::new();
            let daily = driver.add(Selector::css("#daily"), MockElement::radio("freq", true));
            let weekly = driver.add(Selector::css("#weekly"), MockElement::radio("freq", false));
            driver.click(&Selector::css("#weekly"), &direct()).await.unwrap();
            assert_eq!(driver.checked(weekly), Some(true));
            assert_eq!(driver.checked(daily), Some(false));
        }

        #[tokio::test]
        async fn test_missed_clicks_are_dropped() {
            let driver = MockDriver::new();
            let id = driver.add(Selector::css("#s"), MockElement::toggle(false).missing_clicks(1));
            driver.click(&Selector::css("#s"), &direct()).await.unwrap();
            assert_eq!(driver.checked(id), Some(false));
            driver.click(&Selector::css("#s"), &direct()).await.unwrap();
            assert_eq!(driver.checked(id), Some(true));
        }

        #[tokio::test]
        async fn test_select_menu_options_appear_when_open() {
            let driver = MockDriver::new();
            let id = driver.add(
                Selector::css("#status"),
                MockElement::select(".v-list-item", &["Active", "Retired"], None),
            );
            let option = Selector::css_with_text(".v-list-item", "Retired");
            assert!(!driver.probe(&option).await.unwrap().is_present());
            driver.click(&Selector::css("#status"), &direct()).await.unwrap();
            assert!(driver.probe(&option).await.unwrap().is_usable());
            driver.click(&option, &direct()).await.unwrap();
            assert_eq!(driver.selected(id), Some("Retired".to_string()));
        }

        #[tokio::test]
        async fn test_exact_option_skips_longer_labels() {
            let driver = MockDriver::new();
            let id = driver.add(
                Selector::css("#status"),
                MockElement::select(".v-list-item", &["Active (pending)", "Active"], None),
            );
            driver.click(&Selector::css("#status"), &direct()).await.unwrap();
            let option = Selector::css_with_exact_text(".v-list-item", " active ");
            driver.click(&option, &direct()).await.unwrap();
            assert_eq!(driver.selected(id), Some("Active".to_string()));
        }

        #[tokio::test]
        async fn test_click_effects() {
            let driver = MockDriver::new();
            let form = driver.add(Selector::css("form"), MockElement::button().hidden());
            driver.add(
                Selector::css("#add"),
                MockElement::button()
                    .on_click(ClickEffect::Navigate("https://app.test/devices/new".into()))
                    .on_click(ClickEffect::Reveal(Selector::css("form"))),
            );
            driver.click(&Selector::css("#add"), &direct()).await.unwrap();
            assert_eq!(driver.current_url().await.unwrap(), "https://app.test/devices/new");
            assert!(driver.element(form).unwrap().visible);
        }
    }

    mod state_tests {
        use super::*;

        #[tokio::test]
        async fn test_dispatch_state_bypasses_pointer_checks() {
            let driver = MockDriver::new();
            let id = driver.add(
                Selector::css("#r"),
                MockElement::radio("freq", false).with_pointer_events_disabled(),
            );
            driver
                .dispatch_state(&Selector::css("#r"), &WidgetKind::Radio, &TargetState::on())
                .await
                .unwrap();
            assert_eq!(driver.checked(id), Some(true));
        }

        #[tokio::test]
        async fn test_frozen_never_changes() {
            let driver = MockDriver::new();
            let id = driver.add(Selector::css("#s"), MockElement::toggle(false).frozen());
            driver.click(&Selector::css("#s"), &direct()).await.unwrap();
            driver
                .dispatch_state(&Selector::css("#s"), &WidgetKind::Toggle, &TargetState::on())
                .await
                .unwrap();
            assert_eq!(driver.checked(id), Some(false));
        }

        #[tokio::test]
        async fn test_detached_reads_unknown() {
            let driver = MockDriver::new();
            let id = driver.add(Selector::css("#s"), MockElement::toggle(true));
            driver.detach(id);
            let state = driver
                .read_state(&Selector::css("#s"), &WidgetKind::Toggle)
                .await
                .unwrap();
            assert_eq!(state, WidgetState::Unknown);
        }

        #[tokio::test]
        async fn test_fill_and_read_value() {
            let driver = MockDriver::new();
            let id = driver.add(Selector::css("#u"), MockElement::input(""));
            driver.fill(&Selector::css("#u"), "admin").await.unwrap();
            assert_eq!(driver.value(id), Some("admin".to_string()));
            assert_eq!(
                driver.input_value(&Selector::css("#u")).await.unwrap(),
                Some("admin".to_string())
            );
            assert_eq!(driver.mutating_calls(), vec!["fill:#u=admin".to_string()]);
        }

        #[tokio::test(start_paused = true)]
        async fn test_reverting_element_restores_previous_state() {
            let driver = MockDriver::new();
            let id = driver.add(
                Selector::css("#s"),
                MockElement::toggle(false).reverting(1, Duration::from_millis(80)),
            );
            driver.click(&Selector::css("#s"), &direct()).await.unwrap();
            assert_eq!(driver.checked(id), Some(true));
            tokio::time::sleep(Duration::from_millis(100)).await;
            let state = driver
                .read_state(&Selector::css("#s"), &WidgetKind::Toggle)
                .await
                .unwrap();
            assert_eq!(state, WidgetState::Checked(false));
            driver.click(&Selector::css("#s"), &direct()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            let state = driver
                .read_state(&Selector::css("#s"), &WidgetKind::Toggle)
                .await
                .unwrap();
            assert_eq!(state, WidgetState::Checked(true));
        }

        #[tokio::test]
        async fn test_crash_is_session_fault() {
            let driver = MockDriver::new();
            driver.crash();
            let err = driver.current_url().await.unwrap_err();
            assert!(err.is_session_fault());
        }
    }
}
