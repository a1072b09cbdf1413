//! Steadfast: resilient widget interaction for browser end-to-end tests
//!
//! Modern component libraries render a checkbox as three stacked elements,
//! animate menus in and out, and re-render after every model change. A
//! plain "find, click, assert" test flakes on all of it. Steadfast wraps
//! each interaction in a small engine that keeps going until the page
//! actually reflects what the test asked for, and reports exactly what it
//! tried when it cannot.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  STEADFAST Interaction Engine                    │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌──────────────────┐      │
//! │   │ Resolver   │    │ Actuator   │    │ Verified action  │      │
//! │   │ ordered    │───►│ click ►    │───►│ settle, re-read, │      │
//! │   │ locators   │    │ force ►    │    │ confirm N rounds │      │
//! │   │            │    │ script     │    │                  │      │
//! │   └────────────┘    └────────────┘    └──────────────────┘      │
//! │          ▲                 ▲                    ▲               │
//! │          └──────── PageDriver (explicit) ───────┘               │
//! │                     Chromium (CDP) │ Mock                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use steadfast::{EngineConfig, Interactor, LocatorSet, PageDriver, TargetState, Widget};
//!
//! async fn enable_reports<D: PageDriver>(driver: &D) -> steadfast::SteadfastResult<()> {
//!     let ui = Interactor::new(driver, EngineConfig::default());
//!     let slider = Widget::toggle(
//!         "ledger slider",
//!         LocatorSet::css(r#"input[role="switch"]"#).or_css(".v-input--switch input"),
//!     );
//!     let verified = ui.ensure(&slider, TargetState::on()).await?;
//!     if verified.needed_fallback() {
//!         eprintln!("slider only responded to scripted events");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

/// Fallback-selector resolution under a time budget
pub mod resolver;

/// Escalating interaction strategies with retry
pub mod actuator;

/// Post-condition verification for state-changing actions
pub mod verified;

#[allow(clippy::missing_errors_doc, clippy::doc_markdown)]
pub mod config;
pub mod driver;
pub mod interactor;
pub mod locator;
pub mod pages;
pub mod result;
pub mod script;
pub mod session;
pub mod wait;
pub mod widget;

/// In-memory page model for tests without a browser
#[allow(clippy::missing_panics_doc)]
pub mod mock;

/// Chromium session provider over CDP
#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc, clippy::cast_possible_truncation)]
pub mod chromium;

pub use actuator::{
    converge, AttemptRecord, ConvergenceResult, Strategy, StrategyTrial, TrialOutcome,
};
#[cfg(feature = "browser")]
pub use chromium::{ChromiumDriver, ChromiumProvider};
pub use config::{Config, EngineConfig, RetryPolicy, SessionConfig};
pub use driver::PageDriver;
pub use interactor::Interactor;
pub use locator::{ClickOptions, LocatorSet, Offset, Selector};
pub use result::{SteadfastError, SteadfastResult};
pub use resolver::{resolve, resolve_optional, BudgetSplit, ResolveOptions};
pub use session::{with_session, SessionProvider};
pub use verified::{perform_and_verify, ConvergenceReport, Verified};
pub use wait::{poll_until, wait_for_url, UrlPattern, WaitOptions};
pub use widget::{ElementProbe, TargetState, Widget, WidgetHandle, WidgetKind, WidgetState};

/// Prelude for scenario code
pub mod prelude {
    pub use crate::interactor::Interactor;
    pub use crate::locator::{LocatorSet, Selector};
    pub use crate::pages::{DevicesPage, LaunchPad, LoginPage, PageObject, ProfilePage};
    pub use crate::result::{SteadfastError, SteadfastResult};
    pub use crate::widget::{TargetState, Widget, WidgetState};
    pub use crate::{Config, EngineConfig, PageDriver, SessionConfig};
}
