//! Session lifecycle: one isolated browser per scenario, always torn down.
//!
//! [`with_session`] opens a session, hands the driver to the scenario body,
//! and closes the session whatever the body did: returned `Ok`, returned an
//! error, or panicked. A graceful close gets [`SessionConfig::teardown_grace`];
//! if it has not finished by then the session is force-closed. Scenarios
//! never share a session.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{error, info, warn};

use crate::config::{as_millis, SessionConfig};
use crate::driver::PageDriver;
use crate::result::SteadfastResult;

/// Opens and closes browser sessions
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Driver for one open session
    type Driver: PageDriver;

    /// Launch a fresh, isolated session
    async fn open(&self, config: &SessionConfig) -> SteadfastResult<Self::Driver>;

    /// Close the session gracefully
    async fn close(&self, driver: &Self::Driver) -> SteadfastResult<()>;

    /// Tear the session down without waiting for it to cooperate
    async fn force_close(&self, driver: Self::Driver);
}

/// Run `body` against a fresh session and always tear it down.
///
/// In headed mode the browser lingers for [`SessionConfig::headed_linger`]
/// before closing so the run can be watched. A panic in `body` is re-raised
/// after teardown.
///
/// # Errors
///
/// Returns the launch error if the session cannot be opened, otherwise the
/// body's own result. Teardown problems are logged, never returned.
pub async fn with_session<P, T, F>(provider: &P, config: &SessionConfig, body: F) -> SteadfastResult<T>
where
    P: SessionProvider + ?Sized,
    F: for<'d> FnOnce(&'d P::Driver) -> BoxFuture<'d, SteadfastResult<T>>,
{
    let driver = provider.open(config).await?;
    info!(base_url = %config.base_url, headless = config.headless, "session opened");

    let outcome = AssertUnwindSafe(body(&driver)).catch_unwind().await;

    if !config.headless && !config.headed_linger.is_zero() {
        info!(linger_ms = as_millis(config.headed_linger), "keeping headed browser open");
        tokio::time::sleep(config.headed_linger).await;
    }
    teardown(provider, driver, config).await;

    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

async fn teardown<P>(provider: &P, driver: P::Driver, config: &SessionConfig)
where
    P: SessionProvider + ?Sized,
{
    let closed = tokio::time::timeout(config.teardown_grace, provider.close(&driver)).await;
    match closed {
        Ok(Ok(())) => info!("session closed"),
        Ok(Err(e)) => {
            error!(error = %e, "graceful close failed; forcing");
            provider.force_close(driver).await;
        }
        Err(_) => {
            warn!(
                grace_ms = as_millis(config.teardown_grace),
                "graceful close timed out; forcing"
            );
            provider.force_close(driver).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::locator::Selector;
    use crate::mock::{MockDriver, MockElement, MockSessions};
    use crate::result::SteadfastError;
    use std::time::Duration;

    fn headless() -> SessionConfig {
        SessionConfig::default().with_base_url("https://app.test/")
    }

    #[tokio::test(start_paused = true)]
    async fn test_body_sees_fresh_page_and_session_closes() {
        let sessions = MockSessions::with_setup(|d: &MockDriver| {
            d.add(Selector::css("form"), MockElement::button());
        });
        let url = with_session(&sessions, &headless(), |driver| {
            Box::pin(async move { driver.current_url().await })
        })
        .await
        .unwrap();
        assert_eq!(url, "https://app.test/");
        assert_eq!(sessions.opened(), 1);
        assert_eq!(sessions.closed(), 1);
        assert_eq!(sessions.forced(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_body_error_still_closes() {
        let sessions = MockSessions::new();
        let err = with_session(&sessions, &headless(), |_driver| {
            Box::pin(async move { Err::<(), _>(SteadfastError::assertion("login failed")) })
        })
        .await
        .unwrap_err();
        assert!(matches!(err, SteadfastError::AssertionFailed { .. }));
        assert_eq!(sessions.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_close_is_forced_after_grace() {
        let sessions = MockSessions::new().with_stalling_close();
        let config = headless().with_teardown_grace(Duration::from_secs(15));
        let started = tokio::time::Instant::now();
        with_session(&sessions, &config, |_driver| Box::pin(async move { Ok(()) }))
            .await
            .unwrap();
        assert_eq!(sessions.closed(), 0);
        assert_eq!(sessions.forced(), 1);
        assert!(started.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_headed_session_lingers() {
        let sessions = MockSessions::new();
        let config = headless()
            .with_headless(false)
            .with_headed_linger(Duration::from_secs(3));
        let started = tokio::time::Instant::now();
        with_session(&sessions, &config, |_driver| Box::pin(async move { Ok(()) }))
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(sessions.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_failure_is_returned() {
        let sessions = MockSessions::new().with_failing_open();
        let err = with_session(&sessions, &headless(), |_driver| Box::pin(async move { Ok(()) }))
            .await
            .unwrap_err();
        assert!(matches!(err, SteadfastError::BrowserLaunch { .. }));
        assert_eq!(sessions.closed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_is_reraised_after_teardown() {
        let sessions = std::sync::Arc::new(MockSessions::new());
        let inner = sessions.clone();
        let joined = tokio::spawn(async move {
            with_session(inner.as_ref(), &headless(), |_driver| {
                Box::pin(async move {
                    if true {
                        panic!("scenario blew up");
                    }
                    Ok(())
                })
            })
            .await
        })
        .await;
        assert!(joined.unwrap_err().is_panic());
        assert_eq!(sessions.closed(), 1);
    }
}
