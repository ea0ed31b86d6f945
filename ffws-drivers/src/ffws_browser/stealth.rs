use serde_json::{json, Map, Value};
use std::path::Path;

use super::fingerprint::UserAgentProfile;

/// Chrome switches that strip automation tells and must be excluded from
/// the default launch line.
pub const EXCLUDED_SWITCHES: &[&str] = &["enable-automation", "enable-logging"];

/// Construct Chrome command-line arguments for a constrained, non-interactive
/// environment (containers without a GPU, a sandbox, or a large `/dev/shm`).
pub fn build_chrome_arguments(headless: bool, profile: &UserAgentProfile) -> Vec<String> {
    let mut args = Vec::with_capacity(24);
    if headless {
        args.push("--headless=new".to_string());
    }
    args.extend(
        [
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-blink-features=AutomationControlled",
            "--disable-extensions",
            "--disable-infobars",
            "--disable-notifications",
            "--disable-popup-blocking",
            "--disable-save-password-bubble",
            "--disable-translate",
            // FIXME(security): the dashboard serves mixed content and a shaky
            // certificate chain; drop these once the source fixes its TLS setup.
            "--disable-web-security",
            "--disable-features=IsolateOrigins,site-per-process",
            "--disable-site-isolation-trials",
            "--allow-running-insecure-content",
            "--ignore-certificate-errors",
            "--ignore-ssl-errors",
            "--start-maximized",
            "--force-color-profile=srgb",
            "--hide-scrollbars",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args.push(format!(
        "--window-size={},{}",
        profile.viewport.0, profile.viewport.1
    ));
    args.push(format!("--user-agent={}", profile.user_agent));
    args.push(format!("--lang={}", profile.languages.join(",")));
    args
}

/// The `goog:chromeOptions` capability object.
pub fn chrome_options(
    headless: bool,
    profile: &UserAgentProfile,
    binary: Option<&Path>,
) -> Map<String, Value> {
    let mut opts = Map::new();
    opts.insert(
        "args".to_string(),
        json!(build_chrome_arguments(headless, profile)),
    );
    opts.insert("excludeSwitches".to_string(), json!(EXCLUDED_SWITCHES));
    opts.insert("useAutomationExtension".to_string(), json!(false));
    if let Some(binary) = binary {
        opts.insert(
            "binary".to_string(),
            json!(binary.to_string_lossy().into_owned()),
        );
    }
    opts
}

/// JavaScript evasions applied after each page load.
pub struct StealthScripts;

impl StealthScripts {
    pub fn core_evasions() -> &'static str {
        r#"
            Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
            if (!window.chrome) window.chrome = { runtime: {} };
        "#
    }
}
