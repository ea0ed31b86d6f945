use std::time::Duration;

use thiserror::Error;

/// Failures raised while launching or driving a rendering session.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("could not connect to WebDriver at {url}: {message}")]
    Connect { url: String, message: String },

    #[error("failed to launch chromedriver: {0}")]
    Launch(String),

    #[error("no chromedriver binary found")]
    DriverNotFound,

    #[error("webdriver command failed: {0}")]
    WebDriver(String),

    #[error("`{selector}` did not appear within {after:?}")]
    ReadyTimeout { selector: String, after: Duration },

    #[error("session acquisition failed after {attempts} attempt(s): {last}")]
    AcquisitionFailed { attempts: u32, last: Box<DriverError> },

    #[error("navigation to {url} failed after {attempts} attempt(s): {last}")]
    NavigationFailed {
        url: String,
        attempts: u32,
        last: Box<DriverError>,
    },
}

impl From<fantoccini::error::CmdError> for DriverError {
    fn from(err: fantoccini::error::CmdError) -> Self {
        Self::WebDriver(err.to_string())
    }
}
