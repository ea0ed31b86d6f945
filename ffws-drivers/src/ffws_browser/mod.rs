pub mod error;
pub mod fingerprint;
#[cfg(feature = "chromium")]
pub mod launcher;
pub mod manager;
pub mod navigator;
pub mod session;
pub mod stealth;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
