//! Loader for FFWS configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are added; `FFWS__`-prefixed
//! environment variables (section separator `__`, e.g.
//! `FFWS__NAVIGATION__WAIT_TIMEOUT_MS=45000`) are applied on top. String
//! values may reference `${VAR}` placeholders, expanded after merging.
//! Every field has a default, so an empty document is a valid config.
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "FFWS";
const CONFIG_FILE_NAME: &str = "ffws.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FfwsConfig {
    pub webdriver: WebDriverSettings,
    pub session: SessionSettings,
    pub navigation: NavigationSettings,
    pub datasets: DatasetSettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

/// Where and how the rendering engine is reached.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebDriverSettings {
    /// WebDriver endpoint tried first.
    pub url: String,
    /// Explicit chromedriver binary for the managed fallback.
    pub chromedriver_path: Option<PathBuf>,
    /// Explicit Chrome binary; skips auto-discovery.
    pub chrome_binary: Option<PathBuf>,
    pub headless: bool,
    /// How long a spawned chromedriver gets to start accepting connections.
    pub spawn_timeout_ms: u64,
}

impl Default for WebDriverSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:9515".into(),
            chromedriver_path: None,
            chrome_binary: None,
            headless: true,
            spawn_timeout_ms: 10_000,
        }
    }
}

impl WebDriverSettings {
    pub fn spawn_timeout(&self) -> Duration {
        Duration::from_millis(self.spawn_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub attempts: u32,
    pub backoff_ms: u64,
    pub page_load_timeout_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_ms: 5_000,
            page_load_timeout_ms: 30_000,
        }
    }
}

impl SessionSettings {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_millis(self.page_load_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NavigationSettings {
    pub attempts: u32,
    pub backoff_ms: u64,
    pub wait_timeout_ms: u64,
    pub settle: SettleSettings,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_ms: 5_000,
            wait_timeout_ms: 30_000,
            settle: SettleSettings::default(),
        }
    }
}

impl NavigationSettings {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleMode {
    /// Sleep `delay_ms` once the table is present.
    Fixed,
    /// Poll the body row count until it stops changing.
    StableRows,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettleSettings {
    pub mode: SettleMode,
    pub delay_ms: u64,
    pub interval_ms: u64,
    pub max_wait_ms: u64,
}

impl Default for SettleSettings {
    fn default() -> Self {
        Self {
            mode: SettleMode::Fixed,
            delay_ms: 5_000,
            interval_ms: 500,
            max_wait_ms: 10_000,
        }
    }
}

/// Optional overrides of the built-in dataset URLs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatasetSettings {
    pub water_level_url: Option<String>,
    pub rainfall_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatSetting {
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: Option<PathBuf>,
    pub format: LogFormatSetting,
    pub stderr: bool,
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormatSetting::Text,
            stderr: true,
            filter: "info".into(),
        }
    }
}

/// Expand `$VAR`/`${VAR}` until the text stops changing. Unknown variables
/// stay verbatim; the depth bound stops self-referencing chains.
fn expand_placeholders(raw: &str) -> String {
    let mut text = raw.to_owned();
    for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
        let Ok(next) = shellexpand::env(&text) else {
            break;
        };
        if next == text {
            break;
        }
        text = next.into_owned();
    }
    text
}

fn expand_env_in_value(value: &mut Value) {
    match value {
        Value::String(text) if text.contains('$') => *text = expand_placeholders(text),
        Value::Array(items) => items.iter_mut().for_each(expand_env_in_value),
        Value::Object(fields) => fields.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct FfwsConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for FfwsConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl FfwsConfigLoader {
    /// Start from the built-in defaults.
    ///
    /// ```
    /// use ffws_config::FfwsConfigLoader;
    ///
    /// let config = FfwsConfigLoader::new().load().expect("defaults load");
    /// assert_eq!(config.session.attempts, 3);
    /// assert_eq!(config.webdriver.url, "http://localhost:9515");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred from the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is merged only if present.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge `ffws.yaml` from the user config dir and then the working
    /// directory, both optional.
    pub fn with_default_locations(mut self) -> Self {
        if let Some(dir) = dirs::config_dir() {
            self = self.with_optional_file(dir.join("ffws").join(CONFIG_FILE_NAME));
        }
        self.with_optional_file(CONFIG_FILE_NAME)
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use ffws_config::{FfwsConfigLoader, SettleMode};
    ///
    /// let cfg = FfwsConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// navigation:
    ///   wait_timeout_ms: 45000
    ///   settle:
    ///     mode: stable_rows
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.navigation.wait_timeout_ms, 45_000);
    /// assert_eq!(cfg.navigation.attempts, 3);
    /// assert_eq!(cfg.navigation.settle.mode, SettleMode::StableRows);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Merge all sources, apply `FFWS__` environment overrides, expand
    /// `${VAR}` placeholders and deserialize into [`FfwsConfig`].
    ///
    /// ```
    /// use ffws_config::FfwsConfigLoader;
    ///
    /// unsafe { std::env::set_var("FFWS_DOC_MIRROR", "http://mirror.local"); }
    ///
    /// let config = FfwsConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// datasets:
    ///   rainfall_url: "${FFWS_DOC_MIRROR}/rainfall/table.do"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(
    ///     config.datasets.rainfall_url.as_deref(),
    ///     Some("http://mirror.local/rainfall/table.do")
    /// );
    /// assert!(config.datasets.water_level_url.is_none());
    ///
    /// unsafe { std::env::remove_var("FFWS_DOC_MIRROR"); }
    /// ```
    pub fn load(self) -> Result<FfwsConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FFWS_TEST_HOST", Some("example.org"), || {
            let mut v = json!("https://${FFWS_TEST_HOST}/water/table.do");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("https://example.org/water/table.do"));
        });
    }

    #[test]
    fn expands_nested_values() {
        temp_env::with_vars(
            [("FFWS_TEST_A", Some("alpha")), ("FFWS_TEST_B", Some("beta"))],
            || {
                let mut v = json!({
                    "datasets": { "rainfall_url": "${FFWS_TEST_A}" },
                    "list": ["$FFWS_TEST_B", 3, false, null]
                });
                expand_env_in_value(&mut v);
                assert_eq!(
                    v,
                    json!({
                        "datasets": { "rainfall_url": "alpha" },
                        "list": ["beta", 3, false, null]
                    })
                );
            },
        );
    }

    #[test]
    fn cyclic_references_terminate() {
        temp_env::with_vars(
            [("FFWS_TEST_X", Some("${FFWS_TEST_Y}")), ("FFWS_TEST_Y", Some("${FFWS_TEST_X}"))],
            || {
                let mut v = json!("a-${FFWS_TEST_X}-b");
                expand_env_in_value(&mut v);
                let s = v.as_str().unwrap();
                assert!(s.starts_with("a-") && s.ends_with("-b"));
                assert!(s.contains("${"));
            },
        );
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("x-${FFWS_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("x-${FFWS_DOES_NOT_EXIST}"));
    }

    #[test]
    fn defaults_match_the_source_timings() {
        let cfg = FfwsConfig::default();
        assert_eq!(cfg.session.backoff(), Duration::from_secs(5));
        assert_eq!(cfg.session.page_load_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.navigation.attempts, 3);
        assert_eq!(cfg.navigation.wait_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.navigation.settle.mode, SettleMode::Fixed);
        assert_eq!(cfg.navigation.settle.delay_ms, 5_000);
        assert_eq!(cfg.server.bind, "0.0.0.0:5000");
        assert!(cfg.webdriver.headless);
    }
}
