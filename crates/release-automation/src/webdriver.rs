use anyhow::anyhow;
use async_trait::async_trait;
use browser_debug::SnapshotSource;
use fantoccini::elements::Element;
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder};
use release_config::BrowserOptions;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::driver::{actionability_verdict, poll_until, PageDriver, ACTIONABILITY_FN, STEALTH_SCRIPT};
use crate::error::{AutomationError, DriverError};
use crate::locator::Locator;
use crate::session::BrowserSession;

const ENTER_KEY: &str = "\u{e007}";

/// [`PageDriver`] over a W3C WebDriver session (chromedriver)
pub struct WebDriverPage {
    client: Client,
    poll_interval: Duration,
}

impl WebDriverPage {
    pub fn new(client: Client, poll_interval: Duration) -> Self {
        Self { client, poll_interval }
    }

    async fn find(&self, locator: &Locator) -> Result<Option<Element>, DriverError> {
        let found = match locator {
            Locator::Css(selector) => self.client.find(fantoccini::Locator::Css(selector)).await,
            Locator::XPath(path) => self.client.find(fantoccini::Locator::XPath(path)).await,
        };
        match found {
            Ok(element) => Ok(Some(element)),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(cmd_error(e)),
        }
    }

    async fn call_on(&self, element: &Element, function: &str) -> Result<serde_json::Value, DriverError> {
        let arg = serde_json::to_value(element).map_err(|e| DriverError::Other(e.to_string()))?;
        self.client
            .execute(&format!("return ({}).call(arguments[0]);", function), vec![arg])
            .await
            .map_err(cmd_error)
    }
}

fn cmd_error(e: CmdError) -> DriverError {
    match &e {
        CmdError::Standard(wd) => match wd.error {
            ErrorStatus::NoSuchElement => DriverError::NoSuchElement(e.to_string()),
            ErrorStatus::StaleElementReference => DriverError::StaleElement(e.to_string()),
            ErrorStatus::ElementNotInteractable
            | ErrorStatus::ElementClickIntercepted
            | ErrorStatus::InvalidElementState => DriverError::NotInteractable(e.to_string()),
            ErrorStatus::JavascriptError => DriverError::Script(e.to_string()),
            ErrorStatus::InvalidSessionId | ErrorStatus::NoSuchWindow => DriverError::Session(e.to_string()),
            _ => DriverError::Other(e.to_string()),
        },
        CmdError::Lost(_) => DriverError::Session(e.to_string()),
        _ => DriverError::Other(e.to_string()),
    }
}

#[async_trait]
impl SnapshotSource for WebDriverPage {
    async fn screenshot_png(&self, full_page: bool) -> anyhow::Result<Vec<u8>> {
        if full_page {
            debug!("WebDriver screenshots cover the viewport only");
        }
        self.client
            .screenshot()
            .await
            .map_err(|e| anyhow!("Failed to take screenshot: {}", e))
    }

    async fn page_source(&self) -> anyhow::Result<String> {
        self.client
            .source()
            .await
            .map_err(|e| anyhow!("Failed to read page source: {}", e))
    }
}

#[async_trait]
impl PageDriver for WebDriverPage {
    type Element = Element;

    async fn wait_for_actionable(&self, locator: &Locator, timeout: Duration) -> Result<Element, DriverError> {
        poll_until(timeout, self.poll_interval, || async {
            let Some(element) = self.find(locator).await? else {
                return Ok(None);
            };
            if !element.is_enabled().await.map_err(cmd_error)? {
                return Err(DriverError::NotInteractable(format!("{} is disabled", locator)));
            }
            let verdict = self.call_on(&element, ACTIONABILITY_FN).await?;
            actionability_verdict(locator, &verdict)?;
            Ok(Some(element))
        })
        .await
    }

    async fn wait_for_present(&self, locator: &Locator, timeout: Duration) -> Result<Element, DriverError> {
        poll_until(timeout, self.poll_interval, || self.find(locator)).await
    }

    async fn click(&self, element: &Element) -> Result<(), DriverError> {
        element.click().await.map_err(cmd_error)
    }

    async fn force_click(&self, element: &Element) -> Result<(), DriverError> {
        self.call_on(element, "function() { this.click(); }").await.map(|_| ())
    }

    // clear() and send_keys() focus the input without a hit-tested click
    async fn fill(&self, element: &Element, text: &str, submit: bool) -> Result<(), DriverError> {
        element.clear().await.map_err(cmd_error)?;
        element.send_keys(text).await.map_err(cmd_error)?;
        if submit {
            element.send_keys(ENTER_KEY).await.map_err(cmd_error)?;
        }
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.client
            .goto(url)
            .await
            .map_err(|e| DriverError::Navigation(e.to_string()))
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        self.client
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(cmd_error)
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError> {
        self.client
            .execute(&format!("return ({});", script), vec![])
            .await
            .map_err(cmd_error)
    }
}

/// A session on an already running chromedriver
pub struct WebDriverSession {
    page: WebDriverPage,
}

impl WebDriverSession {
    pub async fn connect(options: &BrowserOptions, poll_interval: Duration) -> Result<Self, AutomationError> {
        let client = ClientBuilder::native()
            .capabilities(chrome_capabilities(options))
            .connect(&options.webdriver_url)
            .await
            .map_err(|e| {
                AutomationError::Setup(format!("Failed to connect to WebDriver at {}: {}", options.webdriver_url, e))
            })?;

        let timeouts = TimeoutConfiguration::new(None, Some(Duration::from_secs(options.page_load_secs)), None);
        if let Err(e) = client.update_timeouts(timeouts).await {
            warn!("Failed to set page load timeout: {}", e);
        }
        if let Err(e) = client.execute(STEALTH_SCRIPT, vec![]).await {
            warn!("Failed to install navigator.webdriver override: {}", e);
        }

        info!("WebDriver session started at {}", options.webdriver_url);
        Ok(Self {
            page: WebDriverPage::new(client, poll_interval),
        })
    }
}

fn chrome_capabilities(options: &BrowserOptions) -> serde_json::Map<String, serde_json::Value> {
    let mut args = vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        format!("--window-size={},{}", options.window_width, options.window_height),
        format!("--user-agent={}", options.user_agent),
    ];
    if options.headless {
        args.push("--headless=new".to_string());
    }
    let mut chrome_opts = serde_json::Map::new();
    chrome_opts.insert("args".to_string(), json!(args));
    chrome_opts.insert("excludeSwitches".to_string(), json!(["enable-automation"]));
    chrome_opts.insert("useAutomationExtension".to_string(), json!(false));
    if let Some(binary) = &options.chrome_executable {
        chrome_opts.insert("binary".to_string(), json!(binary.display().to_string()));
    }

    let mut caps = serde_json::Map::new();
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));
    caps
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    type Page = WebDriverPage;

    fn page(&self) -> &WebDriverPage {
        &self.page
    }

    async fn close(self) {
        if let Err(e) = self.page.client.close().await {
            warn!("Failed to close WebDriver session: {}", e);
        } else {
            info!("WebDriver session closed");
        }
    }
}
