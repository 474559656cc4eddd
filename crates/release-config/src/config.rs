use browser_debug::DebugConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use crate::selectors::ConsoleSelectors;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required (command-line flag, environment variable or config file)")]
    Missing(&'static str),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub browser: BrowserOptions,
    #[serde(default)]
    pub selectors: ConsoleSelectors,
    #[serde(default)]
    pub browser_debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub developer_id: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default = "default_login_url")]
    pub login_url: String,
    /// Must contain `{developer_id}` and `{app_id}`
    #[serde(default = "default_release_url_template")]
    pub release_url_template: String,
    /// URL fragments that identify a second-factor challenge page
    #[serde(default = "default_two_factor_markers")]
    pub two_factor_markers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// How long each individual locator may take to become actionable
    #[serde(default = "default_wait_time_secs")]
    pub wait_time_secs: u64,
    #[serde(default = "default_page_load_secs")]
    pub page_load_secs: u64,
    /// Pause after click-triggered navigations for animations to finish
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    #[serde(default = "default_login_delay_ms")]
    pub login_delay_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Chrome DevTools Protocol via chromiumoxide
    Chromium,
    /// W3C WebDriver (chromedriver) via fantoccini
    WebDriver,
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Chromium
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserOptions {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_page_load_secs")]
    pub page_load_secs: u64,
}

/// Developer account and app the release is promoted for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTarget {
    pub developer_id: String,
    pub app_id: String,
}

/// Immutable timing view handed to every automation component at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomationSettings {
    pub per_locator_timeout: Duration,
    pub page_load_timeout: Duration,
    pub settle_delay: Duration,
    pub step_delay: Duration,
    pub login_delay: Duration,
    pub poll_interval: Duration,
}

fn default_true() -> bool {
    true
}

fn default_login_url() -> String {
    "https://accounts.google.com".to_string()
}

fn default_release_url_template() -> String {
    "https://play.google.com/console/u/0/developers/{developer_id}/app/{app_id}/tracks/internal-testing?tab=releases".to_string()
}

fn default_two_factor_markers() -> Vec<String> {
    vec!["signin/v2/challenge".to_string(), "signin/challenge".to_string()]
}

fn default_wait_time_secs() -> u64 {
    30
}

fn default_page_load_secs() -> u64 {
    60
}

fn default_settle_delay_ms() -> u64 {
    2000
}

fn default_step_delay_ms() -> u64 {
    3000
}

fn default_login_delay_ms() -> u64 {
    5000
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36".to_string()
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            developer_id: None,
            app_id: None,
            login_url: default_login_url(),
            release_url_template: default_release_url_template(),
            two_factor_markers: default_two_factor_markers(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            wait_time_secs: default_wait_time_secs(),
            page_load_secs: default_page_load_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            step_delay_ms: default_step_delay_ms(),
            login_delay_ms: default_login_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            headless: default_true(),
            webdriver_url: default_webdriver_url(),
            chrome_executable: None,
            window_width: default_window_width(),
            window_height: default_window_height(),
            user_agent: default_user_agent(),
            page_load_secs: default_page_load_secs(),
        }
    }
}

impl ConsoleConfig {
    pub fn release_url(&self, target: &ReleaseTarget) -> String {
        self.release_url_template
            .replace("{developer_id}", &target.developer_id)
            .replace("{app_id}", &target.app_id)
    }

    pub fn is_two_factor_url(&self, url: &str) -> bool {
        self.two_factor_markers.iter().any(|marker| url.contains(marker.as_str()))
    }
}

impl TimeoutConfig {
    pub fn settings(&self) -> AutomationSettings {
        AutomationSettings {
            per_locator_timeout: Duration::from_secs(self.wait_time_secs),
            page_load_timeout: Duration::from_secs(self.page_load_secs),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            step_delay: Duration::from_millis(self.step_delay_ms),
            login_delay: Duration::from_millis(self.login_delay_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn settings(&self) -> AutomationSettings {
        self.timeouts.settings()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeouts.wait_time_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeouts.wait_time_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.timeouts.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "timeouts.poll_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }

        let template = &self.console.release_url_template;
        if !template.contains("{developer_id}") || !template.contains("{app_id}") {
            return Err(ConfigError::Invalid {
                field: "console.release_url_template",
                reason: "must contain {developer_id} and {app_id}".to_string(),
            });
        }
        if self.console.two_factor_markers.is_empty() {
            return Err(ConfigError::Invalid {
                field: "console.two_factor_markers",
                reason: "at least one marker is required".to_string(),
            });
        }

        if self.browser.backend == Backend::WebDriver
            && !(self.browser.webdriver_url.starts_with("http://")
                || self.browser.webdriver_url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid {
                field: "browser.webdriver_url",
                reason: format!("'{}' is not an http(s) URL", self.browser.webdriver_url),
            });
        }

        if let Some(name) = self.selectors.first_empty() {
            return Err(ConfigError::Invalid {
                field: "selectors",
                reason: format!("selector list '{}' is empty", name),
            });
        }

        Ok(())
    }

    /// The developer account and app to release; both ids must be numeric
    pub fn release_target(&self) -> Result<ReleaseTarget, ConfigError> {
        let developer_id = self
            .console
            .developer_id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("developer id"))?;
        let app_id = self
            .console
            .app_id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("app id"))?;

        for (field, value) in [("developer id", &developer_id), ("app id", &app_id)] {
            if !value.chars().all(|c| c.is_ascii_digit()) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("'{}' must be numeric", value),
                });
            }
        }

        Ok(ReleaseTarget { developer_id, app_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.console.developer_id = Some("4736601601401567973".to_string());
        config.browser.backend = Backend::WebDriver;
        config.timeouts.wait_time_secs = 12;

        let path = file.path().to_path_buf();
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.console.developer_id.as_deref(), Some("4736601601401567973"));
        assert_eq!(loaded.browser.backend, Backend::WebDriver);
        assert_eq!(loaded.timeouts.wait_time_secs, 12);
        assert_eq!(loaded.selectors, ConsoleSelectors::default());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.timeouts.wait_time_secs, 30);
        assert!(config.browser.headless);
        assert_eq!(config.browser.backend, Backend::Chromium);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_parses_lowercase() {
        let config: Config = toml::from_str(
            r#"
            [browser]
            backend = "webdriver"
            webdriver_url = "http://127.0.0.1:4444"
            "#,
        )
        .unwrap();
        assert_eq!(config.browser.backend, Backend::WebDriver);
        assert_eq!(config.browser.webdriver_url, "http://127.0.0.1:4444");
    }

    #[test]
    fn test_config_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.timeouts.wait_time_secs = 0;
        assert!(config.validate().is_err());
        config.timeouts.wait_time_secs = 30;

        config.console.release_url_template = "https://play.google.com/console/{app_id}".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("release_url_template"));
        config.console.release_url_template = default_release_url_template();

        config.browser.backend = Backend::WebDriver;
        config.browser.webdriver_url = "localhost:9515".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_release_url_substitution() {
        let console = ConsoleConfig::default();
        let target = ReleaseTarget {
            developer_id: "111".to_string(),
            app_id: "222".to_string(),
        };
        assert_eq!(
            console.release_url(&target),
            "https://play.google.com/console/u/0/developers/111/app/222/tracks/internal-testing?tab=releases"
        );
    }

    #[test]
    fn test_two_factor_markers() {
        let console = ConsoleConfig::default();
        assert!(console.is_two_factor_url("https://accounts.google.com/signin/v2/challenge/totp"));
        assert!(console.is_two_factor_url("https://accounts.google.com/v3/signin/challenge/pwd"));
        assert!(!console.is_two_factor_url("https://myaccount.google.com/"));
    }

    #[test]
    fn test_release_target_from_console_table() {
        let mut config = Config::default();
        config.console.developer_id = Some("10".to_string());
        config.console.app_id = Some("2".to_string());

        let target = config.release_target().unwrap();
        assert_eq!(target.developer_id, "10");
        assert_eq!(target.app_id, "2");
    }

    #[test]
    fn test_release_target_requires_numeric_ids() {
        let mut config = Config::default();
        config.console.app_id = Some("2".to_string());
        assert!(matches!(config.release_target(), Err(ConfigError::Missing("developer id"))));

        config.console.developer_id = Some("abc".to_string());
        assert!(matches!(config.release_target(), Err(ConfigError::Invalid { .. })));

        config.console.developer_id = Some("  ".to_string());
        assert!(matches!(config.release_target(), Err(ConfigError::Missing("developer id"))));
    }

    #[test]
    fn test_settings_durations() {
        let settings = TimeoutConfig::default().settings();
        assert_eq!(settings.per_locator_timeout, Duration::from_secs(30));
        assert_eq!(settings.settle_delay, Duration::from_millis(2000));
        assert_eq!(settings.poll_interval, Duration::from_millis(250));
    }
}
