#![allow(dead_code)]

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use ffws_common::observability::{LogConfig, LogFormat};
use ffws_common::retry::RetryPolicy;
use ffws_drivers::ffws_browser::testing::{Script, ScriptedLauncher};
use ffws_drivers::{Navigator, SessionManager, SettlePolicy};
use ffws_web::Scraper;

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "ffws-tests",
            log_dir: Some(std::env::temp_dir().join("ffws-tests")),
            emit_stderr: true,
            format: if std::env::var("FFWS_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug".to_string(),
        };

        ffws_common::observability::init_logging(config).unwrap_or_default()
    });
}

pub const HEADER: &str = "<thead><tr><th>Station</th><th>Current</th><th>30min</th><th>1hr</th>\
    <th>2hr</th><th>Alert</th><th>Alarm</th><th>Critical</th></tr></thead>";

pub fn station_row(name: &str) -> String {
    format!(
        "<tr><th>{name}</th><td>12.43</td><td>12.40</td><td>12.38</td><td>12.31</td>\
         <td>15.00</td><td>16.00</td><td>18.00</td></tr>"
    )
}

pub fn table_page(rows: &[String]) -> String {
    format!(
        "<html><body><table class=\"table-type1\">{HEADER}<tbody>{}</tbody></table></body></html>",
        rows.concat()
    )
}

/// Scraper over a scripted browser with zero backoff and no settle delay.
pub fn scraper(launcher: &ScriptedLauncher) -> Scraper {
    let retry = RetryPolicy::new(3, Duration::ZERO);
    let sessions = SessionManager::new(Arc::new(launcher.clone())).with_retry(retry);
    Scraper::new(sessions, Navigator::new(retry, SettlePolicy::None))
}

pub fn launcher(script: Script) -> ScriptedLauncher {
    init_test_tracing();
    ScriptedLauncher::new(script)
}
