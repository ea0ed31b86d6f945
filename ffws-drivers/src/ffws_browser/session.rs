use async_trait::async_trait;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{error::CmdError, Client, Locator};
use std::time::Duration;
use tracing::debug;

use super::error::DriverError;
use super::stealth::StealthScripts;

/// One isolated rendering session.
///
/// A session is owned by exactly one extraction call. `close` consumes it,
/// so a released session cannot be driven again.
#[async_trait]
pub trait BrowserSession: Send {
    async fn set_page_load_timeout(&mut self, timeout: Duration) -> Result<(), DriverError>;

    async fn goto(&mut self, url: &str) -> Result<(), DriverError>;

    /// Wait up to `timeout` for an element matching the CSS `selector`.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Number of elements currently matching the CSS `selector`.
    async fn count(&mut self, selector: &str) -> Result<usize, DriverError>;

    /// Rendered page markup.
    async fn source(&mut self) -> Result<String, DriverError>;

    /// Terminate the session and anything it spawned.
    async fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// Starts fresh sessions. Implementations make a single attempt; retrying
/// is the [`SessionManager`](super::manager::SessionManager)'s job.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, DriverError>;
}

/// A process the session has to take down with it (e.g. a managed
/// chromedriver).
#[async_trait]
pub trait OwnedProcess: Send {
    async fn shutdown(self: Box<Self>);
}

/// [`BrowserSession`] over a `fantoccini` WebDriver client.
pub struct WebDriverSession {
    client: Client,
    process: Option<Box<dyn OwnedProcess>>,
}

impl WebDriverSession {
    pub fn new(client: Client, process: Option<Box<dyn OwnedProcess>>) -> Self {
        Self { client, process }
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn set_page_load_timeout(&mut self, timeout: Duration) -> Result<(), DriverError> {
        let timeouts =
            TimeoutConfiguration::new(Some(timeout), Some(timeout), Some(Duration::ZERO));
        self.client.update_timeouts(timeouts).await?;
        Ok(())
    }

    async fn goto(&mut self, url: &str) -> Result<(), DriverError> {
        self.client.goto(url).await?;
        if let Err(err) = self
            .client
            .execute(StealthScripts::core_evasions(), vec![])
            .await
        {
            debug!(target: "browser.stealth", %url, error = %err, "evasion script rejected");
        }
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(selector))
            .await
        {
            Ok(_) => Ok(()),
            Err(CmdError::WaitTimeout) => Err(DriverError::ReadyTimeout {
                selector: selector.to_string(),
                after: timeout,
            }),
            Err(err) => Err(err.into()),
        }
    }

    async fn count(&mut self, selector: &str) -> Result<usize, DriverError> {
        let found = self.client.find_all(Locator::Css(selector)).await?;
        Ok(found.len())
    }

    async fn source(&mut self) -> Result<String, DriverError> {
        Ok(self.client.source().await?)
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        let WebDriverSession { client, process } = *self;
        let closed = client.close().await;
        if let Some(process) = process {
            process.shutdown().await;
        }
        closed.map_err(DriverError::from)
    }
}
