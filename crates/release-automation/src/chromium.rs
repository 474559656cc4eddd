use anyhow::anyhow;
use async_trait::async_trait;
use browser_debug::SnapshotSource;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use release_config::BrowserOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use which::which;

use crate::driver::{
    actionability_verdict, poll_until, PageDriver, ACTIONABILITY_FN, FOCUS_AND_CLEAR_FN, STEALTH_SCRIPT,
};
use crate::error::{AutomationError, DriverError};
use crate::locator::Locator;
use crate::session::BrowserSession;

/// [`PageDriver`] over a chromiumoxide CDP page
pub struct ChromiumPage {
    page: Page,
    poll_interval: Duration,
}

impl ChromiumPage {
    pub fn new(page: Page, poll_interval: Duration) -> Self {
        Self { page, poll_interval }
    }

    /// `Ok(None)` while nothing matches; a dead connection is a session error
    async fn find(&self, locator: &Locator) -> Result<Option<Element>, DriverError> {
        let found = match locator {
            Locator::Css(selector) => self.page.find_element(selector.as_str()).await,
            Locator::XPath(path) => self.page.find_xpath(path.as_str()).await,
        };
        match found {
            Ok(element) => Ok(Some(element)),
            Err(e) if is_connection_lost(&e) => Err(DriverError::Session(e.to_string())),
            Err(_) => Ok(None),
        }
    }
}

/// Errors after which no further command on this browser can succeed
fn is_connection_lost(e: &CdpError) -> bool {
    matches!(
        e,
        CdpError::Ws(_)
            | CdpError::Io(_)
            | CdpError::NoResponse
            | CdpError::UnexpectedWsMessage(_)
            | CdpError::ChannelSendError(_)
            | CdpError::LaunchExit(..)
            | CdpError::LaunchTimeout(_)
            | CdpError::LaunchIo(..)
    )
}

fn cdp_error(e: CdpError) -> DriverError {
    if is_connection_lost(&e) {
        DriverError::Session(e.to_string())
    } else {
        DriverError::Other(e.to_string())
    }
}

fn cdp_error_as(e: CdpError, recoverable: fn(String) -> DriverError) -> DriverError {
    if is_connection_lost(&e) {
        DriverError::Session(e.to_string())
    } else {
        recoverable(e.to_string())
    }
}

#[async_trait]
impl SnapshotSource for ChromiumPage {
    async fn screenshot_png(&self, full_page: bool) -> anyhow::Result<Vec<u8>> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(full_page).build())
            .await
            .map_err(|e| anyhow!("Failed to take screenshot: {}", e))
    }

    async fn page_source(&self) -> anyhow::Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| anyhow!("Failed to read page content: {}", e))
    }
}

#[async_trait]
impl PageDriver for ChromiumPage {
    type Element = Element;

    async fn wait_for_actionable(&self, locator: &Locator, timeout: Duration) -> Result<Element, DriverError> {
        poll_until(timeout, self.poll_interval, || async {
            let Some(element) = self.find(locator).await? else {
                return Ok(None);
            };
            let verdict = element
                .call_js_fn(ACTIONABILITY_FN, false)
                .await
                .map_err(|e| cdp_error_as(e, DriverError::StaleElement))?
                .result
                .value
                .unwrap_or_default();
            actionability_verdict(locator, &verdict)?;
            Ok(Some(element))
        })
        .await
    }

    async fn wait_for_present(&self, locator: &Locator, timeout: Duration) -> Result<Element, DriverError> {
        poll_until(timeout, self.poll_interval, || self.find(locator)).await
    }

    async fn click(&self, element: &Element) -> Result<(), DriverError> {
        element
            .click()
            .await
            .map(|_| ())
            .map_err(|e| cdp_error_as(e, DriverError::NotInteractable))
    }

    async fn force_click(&self, element: &Element) -> Result<(), DriverError> {
        element
            .call_js_fn("function() { this.click(); }", false)
            .await
            .map(|_| ())
            .map_err(|e| cdp_error_as(e, DriverError::Script))
    }

    async fn fill(&self, element: &Element, text: &str, submit: bool) -> Result<(), DriverError> {
        // type_str sends key events to whatever has focus
        element
            .call_js_fn(FOCUS_AND_CLEAR_FN, false)
            .await
            .map_err(|e| cdp_error_as(e, DriverError::NotInteractable))?;
        element.type_str(text).await.map_err(cdp_error)?;
        if submit {
            element.press_key("Enter").await.map_err(cdp_error)?;
        }
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| cdp_error_as(e, DriverError::Navigation))
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        self.page
            .url()
            .await
            .map_err(cdp_error)?
            .filter(|url| !url.is_empty())
            .ok_or_else(|| DriverError::Navigation("page reports no URL".to_string()))
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| cdp_error_as(e, DriverError::Script))?;
        Ok(result.value().cloned().unwrap_or_default())
    }
}

/// A launched Chromium process with one page
pub struct ChromiumSession {
    browser: Option<Browser>,
    handler_task: Option<JoinHandle<()>>,
    page: ChromiumPage,
    /// Throwaway Chrome profile, removed when the session is dropped
    _profile: TempDir,
}

impl ChromiumSession {
    pub async fn launch(options: &BrowserOptions, poll_interval: Duration) -> Result<Self, AutomationError> {
        let profile = create_profile_dir()?;
        let chrome_path = match options.chrome_executable.clone().or_else(find_system_chromium) {
            Some(path) => path,
            None => fetch_chromium().await?,
        };

        let config = build_browser_config(options, &chrome_path, profile.path())?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AutomationError::Setup(format!("Failed to launch browser: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            let mut error_count = 0;
            const MAX_ERRORS: usize = 10;

            while let Some(h) = handler.next().await {
                match h {
                    Ok(_) => error_count = 0,
                    Err(e) => {
                        error_count += 1;
                        warn!("Browser handler error (count: {}/{}): {:?}", error_count, MAX_ERRORS, e);
                        if error_count >= MAX_ERRORS {
                            error!("Browser handler received {} consecutive errors. Browser process may have crashed.", error_count);
                            break;
                        }
                    }
                }
            }
            debug!("Browser handler task ended");
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler_task.abort();
                return Err(AutomationError::Setup(format!("Failed to open page: {}", e)));
            }
        };

        if let Err(e) = page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await
        {
            warn!("Failed to install navigator.webdriver override: {}", e);
        }

        info!("Chromium session started");
        Ok(Self {
            browser: Some(browser),
            handler_task: Some(handler_task),
            page: ChromiumPage::new(page, poll_interval),
            _profile: profile,
        })
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    type Page = ChromiumPage;

    fn page(&self) -> &ChromiumPage {
        &self.page
    }

    async fn close(mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("Browser process wait failed: {}", e);
            }
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        info!("Chromium session closed");
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // Only reached without close(); dropping Browser kills the child process
        if self.browser.is_some() {
            warn!("Chromium session dropped without close");
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
    }
}

fn create_profile_dir() -> Result<TempDir, AutomationError> {
    tempfile::Builder::new()
        .prefix("playstore-release-profile-")
        .tempdir()
        .map_err(|e| AutomationError::Setup(format!("Failed to create profile directory: {}", e)))
}

fn is_docker() -> bool {
    Path::new("/.dockerenv").exists()
        || std::fs::read_to_string("/proc/self/cgroup")
            .map(|s| s.contains("docker") || s.contains("containerd"))
            .unwrap_or(false)
}

fn find_system_chromium() -> Option<PathBuf> {
    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/local/bin/chromium",
            "/opt/chromium/chromium",
        ]
    };

    for path in candidates {
        if Path::new(path).exists() {
            return Some(PathBuf::from(path));
        }
    }

    which("google-chrome")
        .or_else(|_| which("chromium"))
        .or_else(|_| which("chromium-browser"))
        .ok()
}

async fn fetch_chromium() -> Result<PathBuf, AutomationError> {
    let download_path = std::env::temp_dir().join("playstore-release-chromium");
    info!("No system Chromium found, downloading to {:?}", download_path);
    tokio::fs::create_dir_all(&download_path)
        .await
        .map_err(|e| AutomationError::Setup(format!("Failed to create download directory: {}", e)))?;

    let options = BrowserFetcherOptions::builder()
        .with_path(&download_path)
        .build()
        .map_err(|e| AutomationError::Setup(format!("Failed to create BrowserFetcherOptions: {}", e)))?;
    let info = BrowserFetcher::new(options)
        .fetch()
        .await
        .map_err(|e| AutomationError::Setup(format!("Failed to fetch Chromium: {}", e)))?;
    Ok(info.executable_path)
}

fn build_browser_config(
    options: &BrowserOptions,
    chrome_path: &Path,
    user_data_dir: &Path,
) -> Result<BrowserConfig, AutomationError> {
    let mut builder = BrowserConfig::builder()
        .chrome_executable(chrome_path)
        .window_size(options.window_width, options.window_height)
        .request_timeout(Duration::from_secs(options.page_load_secs));

    if !options.headless {
        builder = builder.with_head();
    }

    if is_docker() || !cfg!(target_os = "macos") {
        builder = builder.arg("--no-sandbox").arg("--disable-dev-shm-usage");
    }
    if is_docker() {
        builder = builder.arg("--disable-gpu").arg("--disable-crash-reporter");
    }

    builder
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-notifications")
        .arg("--disable-extensions")
        .arg("--disable-features=WebAuthentication")
        .arg("--log-level=3")
        .arg(format!("--user-data-dir={}", user_data_dir.display()))
        .arg(format!("--user-agent={}", options.user_agent))
        .build()
        .map_err(|e| AutomationError::Setup(format!("Failed to build browser config: {}", e)))
}
