use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::process::{Child, Command};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use webdriver::capabilities::Capabilities;

use super::error::DriverError;
use super::fingerprint::UserAgentProfile;
use super::session::{BrowserSession, OwnedProcess, SessionLauncher, WebDriverSession};
use super::stealth::chrome_options;

/// Known Chrome/Chromium install locations, probed in order.
pub const CHROME_BINARY_CANDIDATES: &[&str] = &[
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome",
    "/usr/bin/chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
];

/// Known chromedriver install locations, probed before `PATH`.
pub const CHROMEDRIVER_CANDIDATES: &[&str] = &[
    "/usr/bin/chromedriver",
    "/usr/local/bin/chromedriver",
    "/usr/lib/chromium/chromedriver",
    "/usr/lib/chromium-browser/chromedriver",
    "/snap/bin/chromium.chromedriver",
];

const SPAWN_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct LaunchSettings {
    /// WebDriver endpoint tried before spawning our own chromedriver.
    pub webdriver_url: String,
    pub chromedriver_path: Option<PathBuf>,
    pub chrome_binary: Option<PathBuf>,
    pub headless: bool,
    pub spawn_timeout: Duration,
    pub profile: UserAgentProfile,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            chromedriver_path: None,
            chrome_binary: None,
            headless: true,
            spawn_timeout: Duration::from_secs(10),
            profile: UserAgentProfile::default(),
        }
    }
}

/// First existing path in `candidates`.
pub fn first_existing<'a, I>(candidates: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

/// Resolve the Chrome binary: explicit setting, then known install paths.
/// `None` leaves the choice to chromedriver.
pub fn discover_chrome_binary(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if cfg!(windows) {
        return None;
    }
    first_existing(CHROME_BINARY_CANDIDATES.iter().copied())
}

/// Resolve chromedriver: explicit setting, known install paths, then `PATH`.
pub fn discover_chromedriver(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        warn!(path = %path.display(), "configured chromedriver does not exist");
    }
    first_existing(CHROMEDRIVER_CANDIDATES.iter().copied())
        .or_else(|| which::which("chromedriver").ok())
}

/// Launches headless Chrome sessions over WebDriver.
///
/// The configured endpoint is tried first; if nothing answers there a
/// chromedriver is spawned on a free local port and owned by the session.
pub struct ChromeLauncher {
    settings: LaunchSettings,
    chrome_binary: Option<PathBuf>,
}

impl ChromeLauncher {
    pub fn new(settings: LaunchSettings) -> Self {
        let chrome_binary = discover_chrome_binary(settings.chrome_binary.as_deref());
        match &chrome_binary {
            Some(path) => info!(target: "browser.launch", path = %path.display(), "using Chrome binary"),
            None => debug!(target: "browser.launch", "no Chrome binary found; deferring to chromedriver"),
        }
        Self {
            settings,
            chrome_binary,
        }
    }

    pub fn settings(&self) -> &LaunchSettings {
        &self.settings
    }

    fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            Value::Object(chrome_options(
                self.settings.headless,
                &self.settings.profile,
                self.chrome_binary.as_deref(),
            )),
        );
        caps
    }

    async fn connect(&self, url: &str) -> Result<Client, DriverError> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities());
        builder
            .connect(url)
            .await
            .map_err(|e| DriverError::Connect {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, DriverError> {
        let endpoint = &self.settings.webdriver_url;
        match self.connect(endpoint).await {
            Ok(client) => {
                debug!(target: "browser.launch", %endpoint, "connected to running WebDriver");
                return Ok(Box::new(WebDriverSession::new(client, None)));
            }
            Err(err) => {
                warn!(
                    target: "browser.launch",
                    %endpoint,
                    error = %err,
                    "WebDriver endpoint unavailable; starting managed chromedriver"
                );
            }
        }

        let driver = ManagedDriver::spawn(
            self.settings.chromedriver_path.as_deref(),
            self.settings.spawn_timeout,
        )
        .await?;
        let url = driver.url();
        match self.connect(&url).await {
            Ok(client) => Ok(Box::new(WebDriverSession::new(
                client,
                Some(Box::new(driver)),
            ))),
            Err(err) => {
                Box::new(driver).shutdown().await;
                Err(err)
            }
        }
    }
}

/// A chromedriver child process started by [`ChromeLauncher`].
pub struct ManagedDriver {
    child: Child,
    port: u16,
}

impl ManagedDriver {
    async fn spawn(explicit: Option<&Path>, startup: Duration) -> Result<Self, DriverError> {
        let binary = discover_chromedriver(explicit).ok_or(DriverError::DriverNotFound)?;
        let port = free_port().await?;

        let child = Command::new(&binary)
            .arg(format!("--port={port}"))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DriverError::Launch(format!("{}: {e}", binary.display())))?;

        info!(
            target: "browser.launch",
            binary = %binary.display(),
            port,
            "spawned chromedriver"
        );

        let mut driver = Self { child, port };
        if let Err(err) = driver.wait_until_listening(startup).await {
            Box::new(driver).shutdown().await;
            return Err(err);
        }
        Ok(driver)
    }

    fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    async fn wait_until_listening(&mut self, startup: Duration) -> Result<(), DriverError> {
        let deadline = Instant::now() + startup;
        loop {
            if TcpStream::connect(("127.0.0.1", self.port)).await.is_ok() {
                return Ok(());
            }
            if let Ok(Some(status)) = self.child.try_wait() {
                return Err(DriverError::Launch(format!(
                    "chromedriver exited early with {status}"
                )));
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Launch(format!(
                    "chromedriver did not listen on port {} within {startup:?}",
                    self.port
                )));
            }
            sleep(SPAWN_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl OwnedProcess for ManagedDriver {
    async fn shutdown(self: Box<Self>) {
        let mut driver = *self;
        if let Err(err) = driver.child.kill().await {
            debug!(target: "browser.launch", port = driver.port, error = %err, "chromedriver already gone");
        }
    }
}

async fn free_port() -> Result<u16, DriverError> {
    let listener = TcpListener::bind(("127.0.0.1", 0))
        .await
        .map_err(|e| DriverError::Launch(format!("no free local port: {e}")))?;
    let port = listener
        .local_addr()
        .map_err(|e| DriverError::Launch(format!("no free local port: {e}")))?
        .port();
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_chrome_binary_skips_discovery() {
        let path = discover_chrome_binary(Some(Path::new("/opt/custom/chrome")));
        assert_eq!(path, Some(PathBuf::from("/opt/custom/chrome")));
    }

    #[test]
    fn first_existing_skips_missing_paths() {
        let found = first_existing(["/definitely/not/here", "/"]);
        assert_eq!(found, Some(PathBuf::from("/")));
        assert_eq!(first_existing(["/definitely/not/here"]), None);
    }

    #[test]
    fn capabilities_carry_chrome_options() {
        let launcher = ChromeLauncher::new(LaunchSettings {
            chrome_binary: Some(PathBuf::from("/opt/custom/chrome")),
            ..LaunchSettings::default()
        });
        let caps = launcher.capabilities();
        let opts = &caps["goog:chromeOptions"];
        assert_eq!(opts["binary"], "/opt/custom/chrome");
        assert!(opts["args"]
            .as_array()
            .unwrap()
            .iter()
            .any(|a| a == "--headless=new"));
    }

    #[tokio::test]
    async fn free_port_is_nonzero() {
        assert_ne!(free_port().await.unwrap(), 0);
    }
}
