use anyhow::{Context, Result};
use ffws_common::observability::{LogConfig, LogFormat};
use ffws_common::retry::RetryPolicy;
use ffws_config::{FfwsConfig, LogFormatSetting, LoggingSettings, SettleMode, SettleSettings};
use ffws_drivers::ffws_browser::launcher::{ChromeLauncher, LaunchSettings};
use ffws_drivers::{Navigator, SessionLauncher, SessionManager, SettlePolicy};
use ffws_web::{Dataset, Scraper};
use std::sync::Arc;
use std::time::Duration;

pub fn log_config(settings: &LoggingSettings) -> LogConfig {
    LogConfig {
        log_dir: settings.dir.clone(),
        emit_stderr: settings.stderr,
        format: match settings.format {
            LogFormatSetting::Text => LogFormat::Text,
            LogFormatSetting::Json => LogFormat::Json,
        },
        default_filter: settings.filter.clone(),
        ..LogConfig::default()
    }
}

pub fn settle_policy(settings: &SettleSettings) -> SettlePolicy {
    match settings.mode {
        SettleMode::Fixed if settings.delay_ms == 0 => SettlePolicy::None,
        SettleMode::Fixed => SettlePolicy::Fixed(Duration::from_millis(settings.delay_ms)),
        SettleMode::StableRows => SettlePolicy::StableRows {
            interval: Duration::from_millis(settings.interval_ms),
            max_wait: Duration::from_millis(settings.max_wait_ms),
        },
    }
}

/// Chrome over WebDriver, as configured.
pub fn chrome_launcher(cfg: &FfwsConfig) -> ChromeLauncher {
    ChromeLauncher::new(LaunchSettings {
        webdriver_url: cfg.webdriver.url.clone(),
        chromedriver_path: cfg.webdriver.chromedriver_path.clone(),
        chrome_binary: cfg.webdriver.chrome_binary.clone(),
        headless: cfg.webdriver.headless,
        spawn_timeout: cfg.webdriver.spawn_timeout(),
        ..LaunchSettings::default()
    })
}

/// Wire retry policies, timeouts and dataset URLs around `launcher`.
pub fn build_scraper(cfg: &FfwsConfig, launcher: Arc<dyn SessionLauncher>) -> Result<Scraper> {
    let sessions = SessionManager::new(launcher)
        .with_retry(RetryPolicy::new(cfg.session.attempts, cfg.session.backoff()))
        .with_page_load_timeout(cfg.session.page_load_timeout());

    let navigation = &cfg.navigation;
    let navigator = Navigator::new(
        RetryPolicy::new(navigation.attempts, navigation.backoff()),
        settle_policy(&navigation.settle),
    );

    let mut scraper = Scraper::new(sessions, navigator).with_wait_timeout(navigation.wait_timeout());
    let overrides = [
        (Dataset::WaterLevel, &cfg.datasets.water_level_url),
        (Dataset::Rainfall, &cfg.datasets.rainfall_url),
    ];
    for (dataset, url) in overrides {
        if let Some(url) = url {
            scraper = scraper
                .with_url(dataset, url)
                .with_context(|| format!("invalid {dataset} url `{url}`"))?;
        }
    }
    Ok(scraper)
}
