//! Chromium binding over the DevTools protocol.
//!
//! Each [`ChromiumProvider::open`] launches its own browser process with a
//! single blank page, so scenarios never share cookies or storage. Pointer
//! clicks are real `Input.dispatchMouseEvent` presses at coordinates taken
//! from [`script::actionability`]; everything else goes through
//! `Runtime.evaluate`.

use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::{as_millis, SessionConfig};
use crate::driver::PageDriver;
use crate::locator::{ClickOptions, Selector};
use crate::result::{SteadfastError, SteadfastResult};
use crate::script;
use crate::session::SessionProvider;

/// Map a CDP error; transport failures mean the session is gone.
fn cdp_error(e: CdpError) -> SteadfastError {
    match e {
        CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
            SteadfastError::session(e.to_string())
        }
        CdpError::JavascriptException(details) => SteadfastError::script(details.text),
        other => SteadfastError::script(other.to_string()),
    }
}

/// Result of [`script::actionability`]
#[derive(Debug, Deserialize)]
struct Actionability {
    status: String,
    #[serde(default)]
    by: Option<String>,
    #[serde(default)]
    left: f64,
    #[serde(default)]
    top: f64,
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
}

/// Launches one Chromium process per session
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumProvider;

impl ChromiumProvider {
    /// Create a provider
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn browser_config(config: &SessionConfig) -> SteadfastResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                ..Viewport::default()
            });

        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        if config.ignore_https_errors {
            builder = builder.arg("--ignore-certificate-errors");
        }
        builder = builder.args(config.launch_args.iter().map(String::as_str));

        builder
            .build()
            .map_err(|message| SteadfastError::BrowserLaunch { message })
    }
}

#[async_trait]
impl SessionProvider for ChromiumProvider {
    type Driver = ChromiumDriver;

    async fn open(&self, config: &SessionConfig) -> SteadfastResult<ChromiumDriver> {
        let (browser, mut handler) = Browser::launch(Self::browser_config(config)?)
            .await
            .map_err(|e| SteadfastError::BrowserLaunch {
                message: e.to_string(),
            })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(SteadfastError::BrowserLaunch {
                    message: e.to_string(),
                });
            }
        };

        Ok(ChromiumDriver {
            browser: Arc::new(Mutex::new(browser)),
            page,
            handler,
        })
    }

    async fn close(&self, driver: &ChromiumDriver) -> SteadfastResult<()> {
        let mut browser = driver.browser.lock().await;
        browser.close().await.map_err(cdp_error)?;
        if let Err(e) = browser.wait().await {
            debug!(error = %e, "browser process did not report exit");
        }
        Ok(())
    }

    async fn force_close(&self, driver: ChromiumDriver) {
        let kill = async {
            let mut browser = driver.browser.lock().await;
            browser.kill().await
        };
        if !bounded_kill(KILL_TIMEOUT, kill).await {
            debug!("dropping browser handle without a confirmed exit");
        }
        driver.handler.abort();
    }
}

/// How long a forced teardown waits for the browser process to die
const KILL_TIMEOUT: Duration = Duration::from_secs(3);

/// Await `kill` for at most `limit`; true when the process is known gone
async fn bounded_kill<F>(limit: Duration, kill: F) -> bool
where
    F: Future<Output = Option<std::io::Result<()>>>,
{
    match tokio::time::timeout(limit, kill).await {
        Ok(Some(Ok(())) | None) => {
            debug!("browser process killed");
            true
        }
        Ok(Some(Err(e))) => {
            warn!(error = %e, "failed to kill browser process");
            false
        }
        Err(_) => {
            warn!(limit_ms = as_millis(limit), "browser process did not die in time");
            false
        }
    }
}

/// [`PageDriver`] for one Chromium page
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: Arc<Mutex<Browser>>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumDriver {
    /// Underlying CDP page, for calls the engine does not cover
    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    async fn mouse(&self, kind: DispatchMouseEventType, x: f64, y: f64) -> SteadfastResult<()> {
        let params = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(x)
            .y(y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .map_err(SteadfastError::script)?;
        self.page.execute(params).await.map_err(cdp_error)?;
        Ok(())
    }

    async fn press_at(&self, selector: &Selector, options: &ClickOptions) -> SteadfastResult<()> {
        let report = self
            .evaluate(&script::actionability(selector, options.forced))
            .await?;
        let report: Actionability = serde_json::from_value(report)?;

        match report.status.as_str() {
            "ok" => {}
            "missing" => return Err(SteadfastError::blocked(selector.to_string(), "not attached")),
            "obscured" => {
                let by = report.by.as_deref().unwrap_or("another element");
                return Err(SteadfastError::blocked(
                    selector.to_string(),
                    format!("covered by {by}"),
                ));
            }
            other => return Err(SteadfastError::blocked(selector.to_string(), other)),
        }

        let (x, y) = options.offset.map_or(
            (report.left + report.width / 2.0, report.top + report.height / 2.0),
            |o| (report.left + o.x, report.top + o.y),
        );
        debug!(%selector, x, y, forced = options.forced, "dispatching click");

        self.mouse(DispatchMouseEventType::MouseMoved, x, y).await?;
        self.mouse(DispatchMouseEventType::MousePressed, x, y).await?;
        self.mouse(DispatchMouseEventType::MouseReleased, x, y).await
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn navigate(&self, url: &str, timeout: Duration) -> SteadfastResult<()> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => match cdp_error(e) {
                fault @ SteadfastError::SessionFault { .. } => Err(fault),
                other => Err(SteadfastError::Navigation {
                    url: url.to_string(),
                    message: other.to_string(),
                }),
            },
            Err(_) => Err(SteadfastError::timeout(
                format!("navigation to {url}"),
                as_millis(timeout),
            )),
        }
    }

    async fn current_url(&self) -> SteadfastResult<String> {
        Ok(self.page.url().await.map_err(cdp_error)?.unwrap_or_default())
    }

    async fn evaluate(&self, script: &str) -> SteadfastResult<Value> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(SteadfastError::script)?;
        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(cdp_error)?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn click(&self, selector: &Selector, options: &ClickOptions) -> SteadfastResult<()> {
        let budget = Duration::from_millis(options.timeout_ms);
        tokio::time::timeout(budget, self.press_at(selector, options))
            .await
            .map_err(|_| SteadfastError::timeout(format!("click on {selector}"), options.timeout_ms))?
    }

    async fn screenshot(&self) -> SteadfastResult<Vec<u8>> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let shot = self.page.execute(params).await.map_err(cdp_error)?;
        base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(|e| SteadfastError::script(format!("screenshot payload: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_actionability_report_parses_obscured() {
        let report: Actionability = serde_json::from_value(serde_json::json!({
            "status": "obscured",
            "by": "v-overlay__scrim",
            "left": 10.0,
            "top": 20.0,
            "width": 40.0,
            "height": 16.0,
        }))
        .unwrap();
        assert_eq!(report.status, "obscured");
        assert_eq!(report.by.as_deref(), Some("v-overlay__scrim"));
    }

    #[test]
    fn test_actionability_missing_has_no_geometry() {
        let report: Actionability =
            serde_json::from_value(serde_json::json!({"status": "missing"})).unwrap();
        assert_eq!(report.width, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_kill_gives_up_after_limit() {
        let started = tokio::time::Instant::now();
        let killed = bounded_kill(Duration::from_secs(3), std::future::pending()).await;
        assert!(!killed);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_exited_process_counts_as_killed() {
        assert!(bounded_kill(Duration::from_secs(3), async { None }).await);
        let refused = async { Some(Err(std::io::Error::other("EPERM"))) };
        assert!(!bounded_kill(Duration::from_secs(3), refused).await);
    }

    #[test]
    fn test_transport_errors_are_session_faults() {
        assert!(cdp_error(CdpError::NoResponse).is_session_fault());
    }
}
