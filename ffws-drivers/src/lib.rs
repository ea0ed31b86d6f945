//! Driver layer for the rendering engine.
//!
//! This crate owns everything that touches a live browser: launching it,
//! keeping it alive for exactly one extraction call, driving it to a page
//! and waiting until the data table has rendered.
//!
//! - [`ffws_browser::session::BrowserSession`]: one isolated rendering session
//! - [`ffws_browser::manager::SessionManager`]: bounded acquisition + release
//! - [`ffws_browser::navigator::Navigator`]: load, wait for readiness, settle
//! - [`ffws_browser::launcher::ChromeLauncher`]: Chrome over WebDriver (`fantoccini`)
//! - [`ffws_browser::stealth`]: Chrome switches that hide automation signals
pub mod ffws_browser;

pub use ffws_browser::error::DriverError;
pub use ffws_browser::manager::SessionManager;
pub use ffws_browser::navigator::{Navigator, SettlePolicy};
pub use ffws_browser::session::{BrowserSession, SessionLauncher};
