use ffws_common::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::error::DriverError;
use super::session::{BrowserSession, SessionLauncher};

const PROBE_URL: &str = "about:blank";

/// Hands out fresh sessions with bounded retries and takes them back.
///
/// Every session returned by [`acquire`](Self::acquire) must be passed to
/// [`release`](Self::release) exactly once.
#[derive(Clone)]
pub struct SessionManager {
    launcher: Arc<dyn SessionLauncher>,
    retry: RetryPolicy,
    page_load_timeout: Duration,
}

impl SessionManager {
    pub fn new(launcher: Arc<dyn SessionLauncher>) -> Self {
        Self {
            launcher,
            retry: RetryPolicy::default(),
            page_load_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_page_load_timeout(mut self, timeout: Duration) -> Self {
        self.page_load_timeout = timeout;
        self
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Launch a session, set its page-load timeout and confirm it responds.
    ///
    /// A launch or probe failure consumes one attempt; the error is only
    /// returned once the retry policy is exhausted.
    pub async fn acquire(&self) -> Result<Box<dyn BrowserSession>, DriverError> {
        let mut attempts = self.retry.start("session.acquire");
        loop {
            match self.open().await {
                Ok(session) => {
                    info!(
                        target: "browser.session",
                        attempt = attempts.attempt(),
                        "session.acquired"
                    );
                    return Ok(session);
                }
                Err(err) => {
                    attempts
                        .failed(err)
                        .await
                        .map_err(|exhausted| DriverError::AcquisitionFailed {
                            attempts: exhausted.attempts,
                            last: Box::new(exhausted.last),
                        })?;
                }
            }
        }
    }

    /// Terminate a session. Never fails: a session that is already gone is
    /// logged and forgotten.
    pub async fn release(&self, session: Box<dyn BrowserSession>) {
        match session.close().await {
            Ok(()) => debug!(target: "browser.session", "session.released"),
            Err(err) => warn!(
                target: "browser.session",
                error = %err,
                "session.release_failed"
            ),
        }
    }

    async fn open(&self) -> Result<Box<dyn BrowserSession>, DriverError> {
        let mut session = self.launcher.launch().await?;
        let probed = self.probe(session.as_mut()).await;
        match probed {
            Ok(()) => Ok(session),
            Err(err) => {
                self.release(session).await;
                Err(err)
            }
        }
    }

    async fn probe(&self, session: &mut dyn BrowserSession) -> Result<(), DriverError> {
        session.set_page_load_timeout(self.page_load_timeout).await?;
        session.goto(PROBE_URL).await
    }
}
